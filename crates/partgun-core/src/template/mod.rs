//! Per-job config materialization.
//!
//! The stage template is a complete config with well-known placeholder
//! tokens. Materialization copies it to the job's config path with a
//! fixed, ordered sequence of literal substitutions.
//!
//! Substitution is literal string replacement, not pattern matching.
//! The tokens are chosen to be disjoint from every legal substituted
//! value; a value that itself contained a token would be re-replaced,
//! so callers must not let that happen. Writing is plain overwrite:
//! materializing the same job twice onto the same path is idempotent.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::RunConfig;
use crate::naming::format_threshold;
use crate::partition::{JobDescriptor, JobInputs};

/// A template could not be turned into a per-job config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("failed to read template {path}: {source}")]
    Read {
        /// The template path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The per-job config could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        /// The config path.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// Materialize the per-job config and return its path.
///
/// `input_prefix` resolves an upstream file name into a
/// config-readable reference; it is ignored for generation jobs.
///
/// # Errors
///
/// Returns a [`TemplateError`] if the template cannot be read or the
/// config cannot be written.
pub fn materialize(
    cfg: &RunConfig,
    job: &JobDescriptor,
    input_prefix: &str,
) -> Result<PathBuf, TemplateError> {
    let mut text =
        fs::read_to_string(&cfg.template).map_err(|source| TemplateError::Read {
            path: cfg.template.clone(),
            source,
        })?;

    text = text.replace("DUMMYFILENAME", &format!("{}.root", job.base_name));
    text = text.replace("DUMMYSEED", &job.index.to_string());

    match &job.inputs {
        JobInputs::Events { events } => {
            let ids = vec![job.particle.to_string(); cfg.gun.multiplicity as usize].join(",");
            text = text.replace("DUMMYEVTSPERJOB", &events.to_string());
            text = text.replace("DUMMYIDs", &ids);
            text = text.replace("DUMMYTHRESHMIN", &format_threshold(job.threshold_min));
            text = text.replace("DUMMYTHRESHMAX", &format_threshold(job.threshold_max));
            text = text.replace("GUNPRODUCERTYPE", &job.gun.producer());
            text = text.replace("MAXTHRESHSTRING", &format!("Max{}", job.gun.code()));
            text = text.replace("MINTHRESHSTRING", &format!("Min{}", job.gun.code()));
        },
        JobInputs::Files { files, .. } => {
            let quoted: Vec<String> = files
                .iter()
                .map(|f| format!("\"{input_prefix}{f}\""))
                .collect();
            text = text.replace("DUMMYINPUTFILELIST", &quoted.join(", "));
            // Derived jobs run to input exhaustion.
            text = text.replace("DUMMYEVTSPERJOB", "-1");
        },
    }

    write_config(&job.cfg_path, &text)?;
    debug!(config = %job.cfg_path.display(), "materialized job config");
    Ok(job.cfg_path.clone())
}

fn write_config(path: &Path, text: &str) -> Result<(), TemplateError> {
    fs::write(path, text).map_err(|source| TemplateError::Write {
        path: path.to_path_buf(),
        source,
    })
}
