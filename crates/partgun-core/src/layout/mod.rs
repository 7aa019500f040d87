//! Output directory layout for a submission run.
//!
//! A GSD run owns a fresh `partGun_<tag>_<date>` directory and must
//! not clobber an existing one; derived stages reuse the upstream
//! run's directory and extend it. Per-job configs land in `cfg/`,
//! scheduler stdout/stderr in `std/`, and the stage's data files in a
//! `<STAGE>/` subdirectory, either locally or on EOS.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use crate::config::RunConfig;
use crate::discovery::{FileStore, StoreError};
use crate::stage::Stage;

/// Redirector prefix for reading EOS files over xrootd.
pub const XROOTD_REDIRECTOR: &str = "root://eoscms.cern.ch/";

/// A layout problem, fatal before any job is materialized.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LayoutError {
    /// The GSD collision guard: the output directory already exists.
    #[error("directory {dir} already exists")]
    OutputDirExists {
        /// The colliding directory name.
        dir: String,
    },

    /// A local directory could not be created.
    #[error("failed to create {dir}: {source}")]
    CreateDir {
        /// The directory being created.
        dir: String,
        /// The underlying error.
        source: io::Error,
    },

    /// A staging directory could not be created through the store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// `partGun_<tag>_<YYYYMMDD>` for a given submission date.
#[must_use]
pub fn output_dir_name(tag: &str, date: NaiveDate) -> String {
    format!("partGun_{}_{}", tag, date.format("%Y%m%d"))
}

/// Resolved on-disk layout of one run.
#[derive(Debug, Clone)]
pub struct RunLayout {
    /// Output directory name, relative to the working directory.
    pub out_dir: String,

    /// The submission working directory.
    pub cwd: PathBuf,
}

impl RunLayout {
    /// Prepare the run's directory tree.
    ///
    /// For GSD this creates a fresh output directory named after the
    /// tag and `date`, failing hard if it already exists. Derived
    /// stages reuse the configured input directory. In both cases the
    /// `cfg/` and `std/` subtrees are created locally, and the stage
    /// data directory is created locally or on EOS depending on the
    /// run's locality.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::OutputDirExists`] on a GSD collision, or
    /// the underlying create failure.
    pub fn prepare(
        cfg: &RunConfig,
        cwd: &Path,
        date: NaiveDate,
        store: &dyn FileStore,
    ) -> Result<Self, LayoutError> {
        let out_dir = if cfg.stage.upstream().is_none() {
            let name = output_dir_name(&cfg.tag, date);
            // Single creator: create_dir itself is the existence check.
            match fs::create_dir(cwd.join(&name)) {
                Ok(()) => name,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(LayoutError::OutputDirExists { dir: name });
                },
                Err(source) => {
                    return Err(LayoutError::CreateDir { dir: name, source });
                },
            }
        } else {
            cfg.in_dir.clone()
        };

        let layout = Self {
            out_dir,
            cwd: cwd.to_path_buf(),
        };

        for sub in ["cfg", "std"] {
            let dir = layout.cwd.join(&layout.out_dir).join(sub);
            fs::create_dir_all(&dir).map_err(|source| LayoutError::CreateDir {
                dir: dir.display().to_string(),
                source,
            })?;
        }

        // Stage data directory: local runs keep it next to cfg/ and
        // std/, EOS runs stage out under the EOS area.
        if cfg.local {
            let dir = layout.cwd.join(&layout.out_dir).join(cfg.stage.tag());
            fs::create_dir_all(&dir).map_err(|source| LayoutError::CreateDir {
                dir: dir.display().to_string(),
                source,
            })?;
        } else {
            store.ensure_dir(&format!(
                "{}/{}/{}",
                cfg.eos_area, layout.out_dir, cfg.stage
            ))?;
        }

        debug!(out_dir = %layout.out_dir, "prepared run layout");
        Ok(layout)
    }

    /// Per-job config file path.
    #[must_use]
    pub fn cfg_path(&self, base_name: &str) -> PathBuf {
        self.cwd
            .join(&self.out_dir)
            .join("cfg")
            .join(format!("{base_name}.py"))
    }

    /// Per-job scheduler stdout path.
    #[must_use]
    pub fn stdout_path(&self, base_name: &str) -> PathBuf {
        self.cwd
            .join(&self.out_dir)
            .join("std")
            .join(format!("{base_name}.out"))
    }

    /// Per-job scheduler stderr path.
    #[must_use]
    pub fn stderr_path(&self, base_name: &str) -> PathBuf {
        self.cwd
            .join(&self.out_dir)
            .join("std")
            .join(format!("{base_name}.err"))
    }

    /// Prefix turning an upstream file name into a config-readable
    /// input reference.
    #[must_use]
    pub fn input_prefix(&self, cfg: &RunConfig, upstream: Stage) -> String {
        if cfg.local {
            format!(
                "file:{}/{}/{}/",
                self.cwd.display(),
                self.out_dir,
                upstream
            )
        } else {
            format!(
                "{XROOTD_REDIRECTOR}{}/{}/{}/",
                cfg.eos_area, self.out_dir, upstream
            )
        }
    }

    /// Directory listed to discover the upstream stage's files.
    #[must_use]
    pub fn discovery_dir(&self, cfg: &RunConfig, upstream: Stage) -> String {
        if cfg.local {
            format!("{}/{}/{}", self.cwd.display(), cfg.in_dir, upstream)
        } else {
            format!("{}/{}/{}", cfg.eos_area, cfg.in_dir, upstream)
        }
    }
}
