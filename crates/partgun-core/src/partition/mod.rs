//! Job partitioning: turning requested work into job descriptors.
//!
//! Two algorithms, selected by stage.
//!
//! The GSD stage has no upstream: `ceil(total_events /
//! events_per_job)` jobs are created and every one of them, including
//! the last, requests the full per-job budget. When the total is not
//! an exact multiple this over-generates events; that is the
//! historical behavior of the pipeline and correcting it would change
//! observed output volumes, so it is preserved.
//!
//! Derived stages split the discovered upstream file list into
//! contiguous chunks. The chunk size is derived from the per-job event
//! budget and the per-file event count recovered from the first
//! discovered file name; all of a particle's files within a run are
//! assumed homogeneous in that metadata, an invariant established
//! upstream and not re-validated here.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::layout::RunLayout;
use crate::naming::{self, FormatError, NamingToken};
use crate::particle::{GunKind, ParticleId};
use crate::stage::Stage;

/// What a job consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JobInputs {
    /// Generation job: the number of events to produce.
    Events {
        /// Requested event count.
        events: u64,
    },

    /// Derived job: the upstream files to read.
    Files {
        /// Input file names, in discovery order.
        files: Vec<String>,
        /// Total upstream events those files carry.
        upstream_events: u64,
    },
}

/// One schedulable batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// The stage this job runs.
    pub stage: Stage,

    /// The particle this job produces or processes.
    pub particle: ParticleId,

    /// 1-based job index, contiguous per particle within a stage.
    pub index: u32,

    /// Gun flavor (configured for GSD, recovered from upstream names
    /// for derived stages).
    pub gun: GunKind,

    /// Minimum gun threshold.
    pub threshold_min: f64,

    /// Maximum gun threshold.
    pub threshold_max: f64,

    /// Canonical base name shared by this job's outputs.
    pub base_name: String,

    /// What the job consumes.
    pub inputs: JobInputs,

    /// Materialized config path.
    pub cfg_path: PathBuf,

    /// Scheduler stdout path.
    pub stdout_path: PathBuf,

    /// Scheduler stderr path.
    pub stderr_path: PathBuf,
}

/// Partition a GSD request into jobs.
///
/// Yields `ceil(total_events / events_per_job)` descriptors, each
/// requesting `events_per_job` events. A zero total yields no jobs.
#[must_use]
pub fn primary_jobs(
    cfg: &RunConfig,
    layout: &RunLayout,
    particle: ParticleId,
) -> Vec<JobDescriptor> {
    let job_count = cfg.total_events.div_ceil(cfg.events_per_job);

    (1..=job_count)
        .map(|index| {
            #[allow(clippy::cast_possible_truncation)] // bounded by job_count
            let index = index as u32;
            let token = NamingToken {
                particle,
                multiplier: cfg.events_per_job,
                gun: cfg.gun.kind,
                threshold_min: cfg.gun.threshold_min,
                threshold_max: cfg.gun.threshold_max,
            };
            descriptor(
                cfg.stage,
                layout,
                &token,
                index,
                JobInputs::Events {
                    events: cfg.events_per_job,
                },
            )
        })
        .collect()
}

/// Partition a derived stage's discovered file list into jobs.
///
/// An empty list yields no jobs (the caller moves on to the next
/// particle). Otherwise the first file's name is decoded to size the
/// chunks:
///
/// ```text
/// files_per_job = max(floor(min(events_per_job, file_count * epuf) / epuf), 1)
/// ```
///
/// and the list is split into contiguous `files_per_job`-sized chunks,
/// the last possibly shorter. Every file lands in exactly one job. The
/// base-name multiplier is `files_per_job * epuf` for every job,
/// including a short final chunk.
///
/// # Errors
///
/// Returns a [`FormatError`] if the first file's name cannot be
/// decoded; the run cannot size this particle's jobs and aborts.
pub fn derived_jobs(
    cfg: &RunConfig,
    layout: &RunLayout,
    particle: ParticleId,
    files: Vec<String>,
) -> Result<Vec<JobDescriptor>, FormatError> {
    let Some(first) = files.first() else {
        return Ok(Vec::new());
    };

    let upstream = naming::decode(first)?;
    let events_per_file = upstream.multiplier;
    let file_count = files.len() as u64;

    let available = file_count * events_per_file;
    let files_per_job = (cfg.events_per_job.min(available) / events_per_file).max(1);

    let token = NamingToken {
        particle,
        multiplier: files_per_job * events_per_file,
        gun: upstream.gun,
        threshold_min: upstream.threshold_min,
        threshold_max: upstream.threshold_max,
    };

    #[allow(clippy::cast_possible_truncation)] // files_per_job >= 1
    let jobs = files
        .chunks(files_per_job as usize)
        .enumerate()
        .map(|(i, chunk)| {
            #[allow(clippy::cast_possible_truncation)] // chunk count <= file count
            let index = i as u32 + 1;
            descriptor(
                cfg.stage,
                layout,
                &token,
                index,
                JobInputs::Files {
                    files: chunk.to_vec(),
                    upstream_events: chunk.len() as u64 * events_per_file,
                },
            )
        })
        .collect();

    Ok(jobs)
}

fn descriptor(
    stage: Stage,
    layout: &RunLayout,
    token: &NamingToken,
    index: u32,
    inputs: JobInputs,
) -> JobDescriptor {
    let base_name = naming::encode(token, stage, index);
    JobDescriptor {
        stage,
        particle: token.particle,
        index,
        gun: token.gun,
        threshold_min: token.threshold_min,
        threshold_max: token.threshold_max,
        cfg_path: layout.cfg_path(&base_name),
        stdout_path: layout.stdout_path(&base_name),
        stderr_path: layout.stderr_path(&base_name),
        base_name,
        inputs,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use proptest::prelude::*;

    use super::*;
    use crate::config::{RunConfig, RunRequest};
    use crate::naming::encode;

    fn layout() -> RunLayout {
        RunLayout {
            out_dir: "partGun_Test_20250314".to_string(),
            cwd: PathBuf::from("/work"),
        }
    }

    fn config(stage: &str, events_per_job: u64, total_events: u64) -> RunConfig {
        RunConfig::resolve(RunRequest {
            tag: "Test".to_string(),
            queue: "1nd".to_string(),
            total_events,
            events_per_job: Some(events_per_job),
            multiplicity: 10,
            threshold_min: 1.0,
            threshold_max: 35.0,
            gun_type: "Pt".to_string(),
            local: true,
            eos_area: "/eos/test".to_string(),
            stage: stage.to_string(),
            in_dir: if stage == "GSD" {
                String::new()
            } else {
                "partGun_Test_20250314".to_string()
            },
            ..RunRequest::default()
        })
        .unwrap()
    }

    fn particle(id: u32) -> ParticleId {
        ParticleId::new(id).unwrap()
    }

    fn upstream_files(particle: u32, events_per_file: u64, count: u32) -> Vec<String> {
        (1..=count)
            .map(|i| {
                let token = NamingToken {
                    particle: ParticleId::new(particle).unwrap(),
                    multiplier: events_per_file,
                    gun: GunKind::Pt,
                    threshold_min: 1.0,
                    threshold_max: 35.0,
                };
                format!("{}.root", encode(&token, Stage::Gsd, i))
            })
            .collect()
    }

    #[test]
    fn primary_rounds_up_and_keeps_full_budget() {
        let jobs = primary_jobs(&config("GSD", 30, 100), &layout(), particle(22));

        assert_eq!(jobs.len(), 4);
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(job.index, i as u32 + 1);
            // The last job is intentionally not clamped to the
            // remaining 10 events.
            assert_eq!(job.inputs, JobInputs::Events { events: 30 });
            assert_eq!(
                job.base_name,
                format!("partGun_PDGid22_x30_Pt1.0To35.0_GSD_{}", i + 1)
            );
        }
    }

    #[test]
    fn primary_exact_multiple() {
        let jobs = primary_jobs(&config("GSD", 25, 100), &layout(), particle(13));
        assert_eq!(jobs.len(), 4);
    }

    #[test]
    fn primary_oversized_budget_yields_single_job() {
        let jobs = primary_jobs(&config("GSD", 1000, 100), &layout(), particle(13));
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].inputs, JobInputs::Events { events: 1000 });
    }

    #[test]
    fn primary_zero_total_yields_no_jobs() {
        let jobs = primary_jobs(&config("GSD", 30, 0), &layout(), particle(22));
        assert!(jobs.is_empty());
    }

    #[test]
    fn primary_job_paths_follow_layout() {
        let jobs = primary_jobs(&config("GSD", 100, 100), &layout(), particle(22));
        assert_eq!(
            jobs[0].cfg_path,
            PathBuf::from("/work/partGun_Test_20250314/cfg/partGun_PDGid22_x100_Pt1.0To35.0_GSD_1.py")
        );
        assert_eq!(
            jobs[0].stdout_path,
            PathBuf::from("/work/partGun_Test_20250314/std/partGun_PDGid22_x100_Pt1.0To35.0_GSD_1.out")
        );
        assert_eq!(
            jobs[0].stderr_path,
            PathBuf::from("/work/partGun_Test_20250314/std/partGun_PDGid22_x100_Pt1.0To35.0_GSD_1.err")
        );
    }

    #[test]
    fn derived_worked_example() {
        // 10 files of 4 events with an 8-event budget: 2 files per
        // job, 5 jobs.
        let files = upstream_files(22, 4, 10);
        let jobs = derived_jobs(&config("RECO", 8, 0), &layout(), particle(22), files.clone())
            .unwrap();

        assert_eq!(jobs.len(), 5);
        for (i, job) in jobs.iter().enumerate() {
            assert_eq!(job.index, i as u32 + 1);
            let JobInputs::Files {
                files: chunk,
                upstream_events,
            } = &job.inputs
            else {
                panic!("derived job without file inputs");
            };
            assert_eq!(chunk.as_slice(), &files[i * 2..(i + 1) * 2]);
            assert_eq!(*upstream_events, 8);
            assert_eq!(
                job.base_name,
                format!("partGun_PDGid22_x8_Pt1.0To35.0_RECO_{}", i + 1)
            );
        }
    }

    #[test]
    fn derived_short_final_chunk_keeps_nominal_multiplier() {
        // 5 files of 4 events, 8-event budget: chunks of 2, last chunk
        // holds a single file but the name still says x8.
        let files = upstream_files(11, 4, 5);
        let jobs =
            derived_jobs(&config("RECO", 8, 0), &layout(), particle(11), files).unwrap();

        assert_eq!(jobs.len(), 3);
        let last = jobs.last().unwrap();
        assert_eq!(
            last.base_name,
            "partGun_PDGid11_x8_Pt1.0To35.0_RECO_3"
        );
        let JobInputs::Files {
            files: chunk,
            upstream_events,
        } = &last.inputs
        else {
            panic!("derived job without file inputs");
        };
        assert_eq!(chunk.len(), 1);
        assert_eq!(*upstream_events, 4);
    }

    #[test]
    fn derived_budget_below_one_file_still_takes_one() {
        let files = upstream_files(22, 100, 3);
        let jobs =
            derived_jobs(&config("RECO", 8, 0), &layout(), particle(22), files).unwrap();
        assert_eq!(jobs.len(), 3);
        for job in &jobs {
            let JobInputs::Files { files: chunk, .. } = &job.inputs else {
                panic!("derived job without file inputs");
            };
            assert_eq!(chunk.len(), 1);
        }
    }

    #[test]
    fn derived_oversized_budget_yields_single_job() {
        let files = upstream_files(22, 4, 10);
        let jobs = derived_jobs(&config("RECO", 100_000, 0), &layout(), particle(22), files)
            .unwrap();
        assert_eq!(jobs.len(), 1);
        let JobInputs::Files { files: chunk, .. } = &jobs[0].inputs else {
            panic!("derived job without file inputs");
        };
        assert_eq!(chunk.len(), 10);
    }

    #[test]
    fn derived_empty_discovery_yields_no_jobs() {
        let jobs =
            derived_jobs(&config("RECO", 8, 0), &layout(), particle(22), Vec::new()).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn derived_inherits_upstream_gun_metadata() {
        // The run asks for a Pt gun, but the upstream files were shot
        // with an E gun; derived jobs follow the files.
        let token = NamingToken {
            particle: particle(15),
            multiplier: 6,
            gun: GunKind::E,
            threshold_min: 2.5,
            threshold_max: 20.0,
        };
        let files = vec![format!("{}.root", encode(&token, Stage::Gsd, 1))];
        let jobs =
            derived_jobs(&config("RECO", 6, 0), &layout(), particle(15), files).unwrap();

        assert_eq!(jobs[0].gun, GunKind::E);
        assert_eq!(jobs[0].threshold_min, 2.5);
        assert_eq!(jobs[0].threshold_max, 20.0);
        assert_eq!(jobs[0].base_name, "partGun_PDGid15_x6_E2.5To20.0_RECO_1");
    }

    #[test]
    fn derived_malformed_first_file_is_fatal() {
        let files = vec!["partGun_oops.root".to_string()];
        let err = derived_jobs(&config("RECO", 8, 0), &layout(), particle(22), files)
            .unwrap_err();
        assert!(matches!(err, FormatError::UnrecognizedName { .. }));
    }

    proptest! {
        #[test]
        fn derived_assigns_every_file_exactly_once(
            file_count in 1u32..200,
            events_per_file in 1u64..50,
            events_per_job in 1u64..2000,
        ) {
            let files = upstream_files(22, events_per_file, file_count);
            let jobs = derived_jobs(
                &config("RECO", events_per_job, 0),
                &layout(),
                particle(22),
                files.clone(),
            )
            .unwrap();

            // Concatenating the chunks in job order reproduces the
            // discovered list.
            let mut reassembled = Vec::new();
            for (i, job) in jobs.iter().enumerate() {
                prop_assert_eq!(job.index, i as u32 + 1);
                let JobInputs::Files { files: chunk, .. } = &job.inputs else {
                    panic!("derived job without file inputs");
                };
                prop_assert!(!chunk.is_empty());
                reassembled.extend(chunk.iter().cloned());
            }
            prop_assert_eq!(reassembled, files);
        }

        #[test]
        fn primary_job_count_is_ceiling(
            total in 1u64..100_000,
            per_job in 1u64..5000,
        ) {
            let jobs = primary_jobs(&config("GSD", per_job, total), &layout(), particle(22));
            prop_assert_eq!(jobs.len() as u64, total.div_ceil(per_job));
            let all_events_match = jobs
                .iter()
                .all(|j| j.inputs == JobInputs::Events { events: per_job });
            prop_assert!(all_events_match);
        }
    }
}
