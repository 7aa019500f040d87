//! CMSSW toolchain discovery.
//!
//! Jobs run inside a CMSSW release; the submission wrapper needs the
//! release area, version, and scram architecture of the shell that
//! submits. All three come from the environment set up by `cmsenv`.

use std::env;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// The CMSSW release this shell is set up for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolchain {
    /// Release area (`CMSSW_BASE`).
    pub base: String,

    /// Release version (`CMSSW_VERSION`).
    pub version: String,

    /// Scram architecture (`SCRAM_ARCH`).
    pub scram_arch: String,
}

impl Toolchain {
    /// Probe the environment for a CMSSW setup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ToolchainNotSet`] naming the first
    /// missing variable. This is checked before any job is created.
    pub fn discover() -> Result<Self, ConfigError> {
        Ok(Self {
            base: require_env("CMSSW_BASE")?,
            version: require_env("CMSSW_VERSION")?,
            scram_arch: require_env("SCRAM_ARCH")?,
        })
    }
}

fn require_env(var: &'static str) -> Result<String, ConfigError> {
    env::var(var).map_err(|_| ConfigError::ToolchainNotSet { var })
}
