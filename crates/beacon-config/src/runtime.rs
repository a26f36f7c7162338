//! Derives the runtime artefact paths shared by the CLI and the daemon.
//!
//! Both binaries must agree on where the pid file and log file live so the
//! lifecycle commands can find the record written by the detached daemon.
//! Deriving paths never touches the filesystem; [`RuntimePaths::prepare`]
//! provisions the directories on the start path.

use std::fs::DirBuilder;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

const PID_FILE_NAME: &str = "beacond.pid";
const LOG_FILE_NAME: &str = "beacond.log";

/// Canonical paths for the daemon's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    base_dir: PathBuf,
    pid_path: PathBuf,
    log_path: PathBuf,
    working_dir: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::from_base_dir(config.base_dir())
    }

    /// Derives runtime paths rooted at `base_dir`.
    #[must_use]
    pub fn from_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let run_dir = base_dir.join("run");
        let log_dir = base_dir.join("log");
        Self {
            pid_path: run_dir.join(PID_FILE_NAME),
            log_path: log_dir.join(LOG_FILE_NAME),
            working_dir: log_dir,
            base_dir,
        }
    }

    /// Directory under which every runtime artefact lives.
    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_path()
    }

    /// Path to the pid file holding the instance record.
    pub fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }

    /// Path to the daemon's append-only log file.
    pub fn log_path(&self) -> &Path {
        self.log_path.as_path()
    }

    /// Working directory adopted by the detached daemon.
    pub fn working_dir(&self) -> &Path {
        self.working_dir.as_path()
    }

    /// Creates the working directory and the parents of the pid and log files.
    ///
    /// Directories are created owner-only. A directory that already exists is
    /// accepted as-is; any other failure is reported with the offending path.
    pub fn prepare(&self) -> Result<(), RuntimePathsError> {
        create_private_dir(&self.working_dir)?;
        for file in [&self.pid_path, &self.log_path] {
            let Some(parent) = file.parent() else {
                return Err(RuntimePathsError::MissingParent { path: file.clone() });
            };
            create_private_dir(parent)?;
        }
        Ok(())
    }
}

fn create_private_dir(path: &Path) -> Result<(), RuntimePathsError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    match builder.create(path) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(RuntimePathsError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Errors raised while provisioning runtime directories.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// A runtime file path had no parent directory.
    #[error("runtime path '{path}' has no parent directory")]
    MissingParent { path: PathBuf },
    /// Creating a runtime directory failed.
    #[error("failed to create runtime directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
