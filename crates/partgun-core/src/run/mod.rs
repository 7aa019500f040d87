//! The sequential submission driver.
//!
//! One invocation walks the configured particles in canonical order.
//! For each particle it partitions the requested work into job
//! descriptors, then consumes them in index order: materialize the
//! config, build the scheduler command, submit. Jobs are logically
//! independent once their descriptors exist, but the driver is
//! deliberately sequential; discovery and submission are blocking
//! external calls.
//!
//! Fatal errors (configuration, layout collision, an undecodable
//! upstream name, collaborator I/O) abort the run. A submission whose
//! output indicates failure is logged and counted, and the run
//! continues with the next job.

use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, RunConfig};
use crate::discovery::{FileStore, StoreError};
use crate::layout::{LayoutError, RunLayout};
use crate::naming::{self, FormatError};
use crate::partition;
use crate::submit::{self, BatchSubmitter};
use crate::template::{self, TemplateError};
use crate::toolchain::Toolchain;

/// A fatal problem that aborts the run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Output directory problem, including the GSD collision guard.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// An upstream file name that cannot be decoded.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// File store failure during discovery.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Template materialization failure.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// What a finished run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Jobs that reached the submit step (including dry-run echoes).
    pub jobs: u64,

    /// Jobs whose submission failed or indicated failure.
    pub failures: u64,
}

/// Partition, materialize, and submit every job of the run.
///
/// `date` stamps the GSD output directory name; callers pass today.
///
/// # Errors
///
/// Returns a [`RunError`] on the fatal conditions listed on the error
/// type. Submission failures are not fatal and are reported through
/// [`RunSummary::failures`].
pub fn submit_production(
    cfg: &RunConfig,
    toolchain: &Toolchain,
    cwd: &Path,
    date: NaiveDate,
    store: &dyn FileStore,
    submitter: &dyn BatchSubmitter,
) -> Result<RunSummary, RunError> {
    let layout = RunLayout::prepare(cfg, cwd, date, store)?;
    let mut summary = RunSummary::default();

    for &particle in &cfg.particles {
        let jobs = match cfg.stage.upstream() {
            None => partition::primary_jobs(cfg, &layout, particle),
            Some(upstream) => {
                let dir = layout.discovery_dir(cfg, upstream);
                let pattern = naming::discovery_pattern(particle);
                let files = store.list_files(&dir, &pattern)?;
                if files.is_empty() {
                    debug!(%particle, %dir, "no upstream files, skipping particle");
                    continue;
                }
                partition::derived_jobs(cfg, &layout, particle, files)?
            },
        };

        let input_prefix = cfg
            .stage
            .upstream()
            .map(|upstream| layout.input_prefix(cfg, upstream))
            .unwrap_or_default();
        let total = jobs.len();

        for job in &jobs {
            info!(
                "Submitting job {} out of {} for particle ID {}",
                job.index, total, particle
            );
            template::materialize(cfg, job, &input_prefix)?;

            let command = submit::build_command(cfg, &layout, toolchain, job);
            match submit::submit_with_policy(submitter, &command, cfg.retry) {
                Ok(output) => {
                    if submit::indicates_failure(&output) {
                        warn!(job = %job.base_name, %output, "submission indicated failure");
                        summary.failures += 1;
                    }
                },
                Err(err) => {
                    warn!(job = %job.base_name, %err, "submission failed");
                    summary.failures += 1;
                },
            }
            summary.jobs += 1;
        }
    }

    info!(jobs = summary.jobs, failures = summary.failures, "run finished");
    Ok(summary)
}
