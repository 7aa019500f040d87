//! Core library for partitioning particle gun production into batch jobs.
//!
//! A production campaign ("simulate N events of a given particle type")
//! runs as a three-stage pipeline: GSD (generation, simulation,
//! digitization), RECO (reconstruction), and NTUP (summary tuples).
//! Each stage after GSD consumes the file output of the previous stage.
//! This crate turns a campaign request into an ordered sequence of
//! independently schedulable LSF jobs:
//!
//! - [`stage`] - pipeline stages, queues, and the events-per-job tables
//! - [`particle`] - supported PDG ids and particle gun parameters
//! - [`naming`] - the canonical base-name wire format and its decoder
//! - [`config`] - the immutable per-invocation [`config::RunConfig`]
//! - [`layout`] - output directory layout and the collision guard
//! - [`discovery`] - local/EOS file store collaborator
//! - [`partition`] - the job partitioning algorithms
//! - [`template`] - per-job config materialization
//! - [`submit`] - `bsub` command construction and submission
//! - [`toolchain`] - CMSSW environment probe
//! - [`run`] - the sequential submission driver
//!
//! External collaborators (the file store and the batch scheduler) sit
//! behind narrow traits so the partitioning core can be exercised with
//! in-memory fakes.

pub mod config;
pub mod discovery;
pub mod layout;
pub mod naming;
pub mod particle;
pub mod partition;
pub mod run;
pub mod stage;
pub mod submit;
pub mod template;
pub mod toolchain;

pub use config::{RunConfig, RunRequest};
pub use run::{RunError, RunSummary};
