//! Run configuration.
//!
//! A [`RunConfig`] is resolved exactly once per invocation from the
//! raw request (CLI flags) and is read-only afterwards. Every closed
//! enumeration is checked here, so partitioning never sees an
//! unsupported stage, queue, particle, or gun kind.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::particle::{GunKind, ParticleGun, ParticleId};
use crate::stage::{Queue, Stage};
use crate::submit::RetryPolicy;

/// Default EOS area where production output is staged out.
pub const DEFAULT_EOS_AREA: &str = "/eos/cms/store/cmst3/group/hgcal/CMG_studies/Production";

/// A configuration problem, fatal before any job is built.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Data tier outside the closed stage set.
    #[error("data tier {value} is not supported")]
    UnsupportedStage {
        /// The rejected stage string.
        value: String,
    },

    /// Queue outside the closed queue set.
    #[error("queue {value} is not supported")]
    UnsupportedQueue {
        /// The rejected queue string.
        value: String,
    },

    /// Particle id outside the supported set.
    #[error("particle with ID {value} is not supported")]
    UnsupportedParticle {
        /// The rejected particle id string.
        value: String,
    },

    /// Gun kind other than `Pt` or `E`.
    #[error("particle gun type {value} is not supported")]
    UnsupportedGunKind {
        /// The rejected gun kind string.
        value: String,
    },

    /// An explicit events-per-job budget of zero cannot size any job.
    #[error("events per job must be at least 1")]
    InvalidEventsPerJob,

    /// Derived stages need the upstream run directory as input.
    #[error("stage {stage} requires an input directory from the previous stage")]
    MissingInputDir {
        /// The stage that was requested.
        stage: Stage,
    },

    /// The CMSSW environment is not set up.
    #[error("CMSSW does not seem to be set up: {var} is not set")]
    ToolchainNotSet {
        /// The missing environment variable.
        var: &'static str,
    },
}

/// Raw, unvalidated run parameters as they arrive from the CLI.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Tag appended to the output directory name.
    pub tag: String,
    /// Batch queue name.
    pub queue: String,
    /// Total number of events to generate (GSD only).
    pub total_events: u64,
    /// Explicit events-per-job budget; `None` asks for the
    /// queue-recommended value.
    pub events_per_job: Option<u64>,
    /// Config template path; `None` selects the stage default.
    pub template: Option<PathBuf>,
    /// Particle filter; `None` runs every supported particle.
    pub particle: Option<String>,
    /// Particles generated per event.
    pub multiplicity: u32,
    /// Minimum gun threshold.
    pub threshold_min: f64,
    /// Maximum gun threshold.
    pub threshold_max: f64,
    /// Gun kind name (`Pt` or `E`).
    pub gun_type: String,
    /// Store output locally instead of on EOS.
    pub local: bool,
    /// EOS staging area root.
    pub eos_area: String,
    /// Requested stage (data tier) name.
    pub stage: String,
    /// Upstream run directory, required for derived stages.
    pub in_dir: String,
    /// Retry behavior on submission failure.
    pub retry: RetryPolicy,
}

/// Immutable configuration for one submission run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// The stage to submit.
    pub stage: Stage,

    /// Target batch queue.
    pub queue: Queue,

    /// Events-per-job budget, explicit or queue-recommended.
    pub events_per_job: u64,

    /// Total requested events (used by the GSD stage only).
    pub total_events: u64,

    /// Particles to submit, in canonical order.
    pub particles: Vec<ParticleId>,

    /// Gun parameters (GSD stage; derived stages recover theirs from
    /// upstream file names).
    pub gun: ParticleGun,

    /// Store output locally instead of on EOS.
    pub local: bool,

    /// EOS staging area root.
    pub eos_area: String,

    /// Config template path.
    pub template: PathBuf,

    /// Tag appended to the output directory name.
    pub tag: String,

    /// Upstream run directory (empty for GSD).
    pub in_dir: String,

    /// Retry behavior on submission failure. Off by default.
    pub retry: RetryPolicy,
}

impl RunConfig {
    /// Resolve and validate a raw request.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any value outside the closed
    /// enumerations, a zero events-per-job budget, or a derived stage
    /// without an input directory.
    pub fn resolve(req: RunRequest) -> Result<Self, ConfigError> {
        let stage: Stage = req.stage.parse()?;
        let queue: Queue = req.queue.parse()?;
        let kind: GunKind = req.gun_type.parse()?;

        let events_per_job = match req.events_per_job {
            Some(0) => return Err(ConfigError::InvalidEventsPerJob),
            Some(explicit) => explicit,
            None => queue.recommended_events_per_job(stage),
        };

        let particles = match req.particle.as_deref() {
            None | Some("") => ParticleId::all().collect(),
            Some(one) => vec![one.parse()?],
        };

        if stage.upstream().is_some() && req.in_dir.is_empty() {
            return Err(ConfigError::MissingInputDir { stage });
        }

        let template = req.template.unwrap_or_else(|| {
            PathBuf::from(format!("templates/partGun_{stage}_template.py"))
        });

        Ok(Self {
            stage,
            queue,
            events_per_job,
            total_events: req.total_events,
            particles,
            gun: ParticleGun {
                kind,
                multiplicity: req.multiplicity,
                threshold_min: req.threshold_min,
                threshold_max: req.threshold_max,
            },
            local: req.local,
            eos_area: req.eos_area,
            template,
            tag: req.tag,
            in_dir: req.in_dir,
            retry: req.retry,
        })
    }
}
