//! File store collaborator: listing upstream files and creating
//! staging directories, locally or on EOS.
//!
//! The store is a narrow seam so the partitioning core can run against
//! an in-memory fake. The EOS implementation shells out to the EOS
//! client and is deliberately dumb: `ls` the directory, keep the
//! entries whose `fileinfo` reports a plain file.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Default path of the EOS client executable.
pub const EOS_EXEC: &str = "/afs/cern.ch/project/eos/installation/0.3.84-aquamarine/bin/eos.select";

/// A file store operation that failed.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A local filesystem operation failed.
    #[error("file store operation on {path} failed: {source}")]
    Io {
        /// The path being operated on.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The store client process could not be run.
    #[error("failed to run {command}: {source}")]
    Spawn {
        /// The command that failed to start.
        command: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The store client ran but reported failure.
    #[error("command {command} failed: {output}")]
    CommandFailed {
        /// The failing command.
        command: String,
        /// Combined stdout/stderr of the client.
        output: String,
    },
}

/// Where a stage reads its inputs and stages its outputs.
///
/// Directories are addressed as strings rather than `Path`s because
/// the EOS namespace is not a local filesystem.
pub trait FileStore {
    /// Create `dir` (and any missing parents); succeeds if it already
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the directory cannot be created.
    fn ensure_dir(&self, dir: &str) -> Result<(), StoreError>;

    /// List the plain files in `dir` whose names match `pattern`
    /// (shell-style, `*` wildcard only). Directory entries are
    /// excluded.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the directory cannot be read.
    fn list_files(&self, dir: &str, pattern: &str) -> Result<Vec<String>, StoreError>;
}

/// Match `name` against a shell-style pattern where `*` matches any
/// run of characters (including none) and every other character
/// matches literally.
#[must_use]
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    fn matches(pattern: &[u8], name: &[u8]) -> bool {
        match pattern.split_first() {
            None => name.is_empty(),
            Some((&b'*', rest)) => {
                matches(rest, name) || (!name.is_empty() && matches(pattern, &name[1..]))
            },
            Some((ch, rest)) => name.split_first().is_some_and(|(n, ntail)| {
                n == ch && matches(rest, ntail)
            }),
        }
    }
    matches(pattern.as_bytes(), name.as_bytes())
}

/// Local filesystem store.
#[derive(Debug, Default)]
pub struct LocalStore;

impl FileStore for LocalStore {
    fn ensure_dir(&self, dir: &str) -> Result<(), StoreError> {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_string(),
            source,
        })
    }

    fn list_files(&self, dir: &str, pattern: &str) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(dir).map_err(|source| StoreError::Io {
            path: dir.to_string(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: dir.to_string(),
                source,
            })?;
            let is_file = entry
                .file_type()
                .map_err(|source| StoreError::Io {
                    path: entry.path().display().to_string(),
                    source,
                })?
                .is_file();
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && wildcard_match(pattern, &name) {
                files.push(name);
            }
        }
        // read_dir order is platform-dependent; chunking must be
        // deterministic.
        files.sort();
        debug!(dir, pattern, count = files.len(), "listed local files");
        Ok(files)
    }
}

/// EOS store driven through the EOS client executable.
#[derive(Debug)]
pub struct EosStore {
    exec: PathBuf,
}

impl EosStore {
    /// Store using the given EOS client executable.
    #[must_use]
    pub fn new(exec: PathBuf) -> Self {
        Self { exec }
    }

    fn run(&self, args: &[&str]) -> Result<String, StoreError> {
        let command = format!("{} {}", self.exec.display(), args.join(" "));
        let output = Command::new(&self.exec)
            .args(args)
            .output()
            .map_err(|source| StoreError::Spawn {
                command: command.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        if output.status.success() {
            Ok(text)
        } else {
            Err(StoreError::CommandFailed {
                command,
                output: text,
            })
        }
    }
}

impl Default for EosStore {
    fn default() -> Self {
        Self::new(PathBuf::from(EOS_EXEC))
    }
}

impl FileStore for EosStore {
    fn ensure_dir(&self, dir: &str) -> Result<(), StoreError> {
        self.run(&["mkdir", "-p", dir]).map(|_| ())
    }

    fn list_files(&self, dir: &str, pattern: &str) -> Result<Vec<String>, StoreError> {
        // EOS `ls` has no files-only mode; query each candidate's
        // fileinfo and keep the ones reported as plain files.
        let listing = self.run(&["ls", dir])?;
        let mut files = Vec::new();
        for name in listing.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if !wildcard_match(pattern, name) {
                continue;
            }
            let info = self.run(&["fileinfo", &format!("{dir}/{name}")])?;
            let kind = info.split(':').next().unwrap_or_default().trim_start();
            if kind == "File" {
                files.push(name.to_string());
            }
        }
        files.sort();
        debug!(dir, pattern, count = files.len(), "listed EOS files");
        Ok(files)
    }
}
