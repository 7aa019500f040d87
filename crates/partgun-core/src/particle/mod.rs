//! Particle identities and gun parameters.
//!
//! Both the particle set and the gun kinds are closed enumerations:
//! anything outside them is rejected while the run configuration is
//! built, before any job exists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// PDG ids the production pipeline supports, in canonical submission
/// order.
pub const SUPPORTED_PARTICLES: [u32; 9] = [22, 111, 211, 11, 13, 15, 12, 14, 16];

/// A PDG particle id validated against [`SUPPORTED_PARTICLES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticleId(u32);

impl ParticleId {
    /// Validate a raw PDG id against the supported set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedParticle`] for ids outside the
    /// supported set.
    pub fn new(id: u32) -> Result<Self, ConfigError> {
        if SUPPORTED_PARTICLES.contains(&id) {
            Ok(Self(id))
        } else {
            Err(ConfigError::UnsupportedParticle {
                value: id.to_string(),
            })
        }
    }

    /// The raw PDG id.
    #[must_use]
    pub const fn pdg(self) -> u32 {
        self.0
    }

    /// All supported particles in canonical submission order.
    pub fn all() -> impl Iterator<Item = Self> {
        SUPPORTED_PARTICLES.into_iter().map(Self)
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticleId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u32 = s.parse().map_err(|_| ConfigError::UnsupportedParticle {
            value: s.to_string(),
        })?;
        Self::new(id)
    }
}

/// Particle gun flavor: flat-random in transverse momentum or in energy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GunKind {
    /// Transverse-momentum gun.
    Pt,
    /// Energy gun.
    E,
}

impl GunKind {
    /// Letter code used in file names and threshold field suffixes.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Pt => "Pt",
            Self::E => "E",
        }
    }

    /// Gun producer type name substituted into generation configs.
    #[must_use]
    pub fn producer(self) -> String {
        format!("FlatRandom{}GunProducer", self.code())
    }
}

impl fmt::Display for GunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GunKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pt" => Ok(Self::Pt),
            "E" => Ok(Self::E),
            other => Err(ConfigError::UnsupportedGunKind {
                value: other.to_string(),
            }),
        }
    }
}

/// Generation-stage gun parameters: what to shoot and how hard.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleGun {
    /// Gun flavor.
    pub kind: GunKind,

    /// Number of particles generated per event.
    pub multiplicity: u32,

    /// Minimum threshold value (pT or E, depending on the gun kind).
    pub threshold_min: f64,

    /// Maximum threshold value.
    pub threshold_max: f64,
}
