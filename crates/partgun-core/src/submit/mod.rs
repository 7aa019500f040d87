//! Batch submission: `bsub` command construction and the submitter
//! collaborator.
//!
//! The scheduler is driven through a single shell command string and
//! answers with raw output text; there is no structured result. A
//! submission that fails is logged and counted by the driver, which
//! then moves on to the next job. Nothing is rolled back: the job's
//! config stays materialized either way.

use std::process::Command;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::config::RunConfig;
use crate::layout::RunLayout;
use crate::partition::JobDescriptor;
use crate::toolchain::Toolchain;

/// Wrapper script invoked on the batch node.
pub const WRAPPER_SCRIPT: &str = "SubmitFileGSD.sh";

/// Substring in scheduler output that marks a failed submission.
pub const FAILURE_INDICATOR: &str = "error";

/// A submission attempt that never produced scheduler output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmitError {
    /// The scheduler client could not be spawned.
    #[error("failed to run submission command: {source}")]
    Spawn {
        /// The underlying error.
        source: std::io::Error,
    },

    /// The scheduler client exited with a failure status.
    #[error("submission command exited with {status}: {output}")]
    CommandFailed {
        /// The exit status.
        status: std::process::ExitStatus,
        /// Combined stdout/stderr.
        output: String,
    },
}

/// Submits one fully-formed scheduler command.
pub trait BatchSubmitter {
    /// Run the command and return the scheduler's raw output.
    ///
    /// # Errors
    ///
    /// Returns a [`SubmitError`] if the command cannot be run or exits
    /// with a failure status.
    fn submit(&self, command: &str) -> Result<String, SubmitError>;
}

/// Submits through the local `bsub` client via `sh -c`.
#[derive(Debug, Default)]
pub struct LsfSubmitter;

impl BatchSubmitter for LsfSubmitter {
    fn submit(&self, command: &str) -> Result<String, SubmitError> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .output()
            .map_err(|source| SubmitError::Spawn { source })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(text)
        } else {
            Err(SubmitError::CommandFailed {
                status: output.status,
                output: text,
            })
        }
    }
}

/// Echoes the command instead of invoking the scheduler.
#[derive(Debug, Default)]
pub struct DryRunSubmitter;

impl BatchSubmitter for DryRunSubmitter {
    fn submit(&self, command: &str) -> Result<String, SubmitError> {
        println!("Dry-run: [{command}]");
        Ok(String::new())
    }
}

/// Whether scheduler output indicates a failed submission.
#[must_use]
pub fn indicates_failure(output: &str) -> bool {
    output.contains(FAILURE_INDICATOR)
}

/// Retry behavior after a submission whose output carries the failure
/// indicator. Off by default; submission failures are then logged and
/// counted without a second attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RetryPolicy {
    /// Never retry.
    #[default]
    Disabled,

    /// Re-submit while the output still indicates failure, up to a
    /// bounded number of attempts.
    OnErrorIndicator {
        /// Additional attempts after the first submission.
        max_attempts: u32,

        /// Pause between attempts.
        #[serde(with = "humantime_serde")]
        delay: Duration,
    },
}

/// Submit `command`, re-submitting per `policy` while the output
/// carries the failure indicator.
///
/// # Errors
///
/// Returns the last [`SubmitError`] if the submitter itself keeps
/// failing.
pub fn submit_with_policy(
    submitter: &dyn BatchSubmitter,
    command: &str,
    policy: RetryPolicy,
) -> Result<String, SubmitError> {
    let mut output = submitter.submit(command)?;

    if let RetryPolicy::OnErrorIndicator {
        max_attempts,
        delay,
    } = policy
    {
        let mut attempt = 0;
        while indicates_failure(&output) && attempt < max_attempts {
            attempt += 1;
            warn!(attempt, "submission indicated failure, retrying");
            thread::sleep(delay);
            output = submitter.submit(command)?;
        }
    }

    Ok(output)
}

/// Build the full scheduler command for one job.
///
/// The wrapper argument block is a single double-quoted string, in the
/// exact order the wrapper script unpacks: working directory, output
/// directory, config file name, locality flag, CMSSW version, CMSSW
/// base, scram architecture, EOS area, and stage tag.
#[must_use]
pub fn build_command(
    cfg: &RunConfig,
    layout: &RunLayout,
    toolchain: &Toolchain,
    job: &JobDescriptor,
) -> String {
    let local = if cfg.local { "True" } else { "False" };
    format!(
        "bsub -o {out}/std/{base}.out -e {out}/std/{base}.err -q {queue} -J {base} \
         \"{wrapper} {cwd} {out} {base}.py {local} {version} {release} {arch} {eos} {stage}\"",
        out = layout.out_dir,
        base = job.base_name,
        queue = cfg.queue,
        wrapper = WRAPPER_SCRIPT,
        cwd = layout.cwd.display(),
        version = toolchain.version,
        release = toolchain.base,
        arch = toolchain.scram_arch,
        eos = cfg.eos_area,
        stage = cfg.stage,
    )
}
