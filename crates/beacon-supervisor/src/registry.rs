//! Durable instance record stored in a single pid file.
//!
//! The registry is the only component that touches the pid file. Reads are
//! forgiving: anything that is not a usable pid reads as "no instance". Writes
//! go through a temporary file that is fsync'd and renamed into place, so a
//! concurrent reader sees either the previous record or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tempfile::Builder;
use tracing::{debug, info, warn};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::errors::SupervisorError;

pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// File-backed slot holding the pid of the current daemon instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidRegistry {
    path: PathBuf,
}

impl PidRegistry {
    /// Builds a registry over the given pid file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the pid file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Returns the recorded pid, or `None` when the slot is empty or corrupt.
    pub fn read(&self) -> Option<u32> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return None,
            Err(error) => {
                warn!(
                    target: REGISTRY_TARGET,
                    file = %self.path.display(),
                    error = %error,
                    "pid file unreadable; treating as absent"
                );
                return None;
            }
        };
        let pid = parse_pid(&content);
        if pid.is_none() {
            warn!(
                target: REGISTRY_TARGET,
                file = %self.path.display(),
                content = content.trim(),
                "pid file is corrupt; treating as absent"
            );
        }
        pid
    }

    /// Atomically records `pid` as the current instance.
    ///
    /// The parent directory must already exist; it is never created here.
    pub fn write(&self, pid: u32) -> Result<(), SupervisorError> {
        atomic_write(&self.path, format!("{pid}\n").as_bytes()).map_err(|source| {
            SupervisorError::RegistryWrite {
                path: self.path.clone(),
                source,
            }
        })?;
        info!(
            target: REGISTRY_TARGET,
            pid,
            file = %self.path.display(),
            "pid file written"
        );
        Ok(())
    }

    /// Removes the record. Clearing an empty slot is a no-op.
    pub fn clear(&self) -> Result<(), SupervisorError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(
                    target: REGISTRY_TARGET,
                    file = %self.path.display(),
                    "pid file removed"
                );
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SupervisorError::RegistryClear {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Removes the record only while it still names `pid`.
    ///
    /// Returns `true` when a matching record was removed.
    pub fn clear_if(&self, pid: u32) -> Result<bool, SupervisorError> {
        if self.read() != Some(pid) {
            debug!(
                target: REGISTRY_TARGET,
                pid,
                "pid file no longer names this process; leaving it"
            );
            return Ok(false);
        }
        self.clear()?;
        Ok(true)
    }

    /// When the current record was written, if one exists.
    pub fn claimed_at(&self) -> Option<SystemTime> {
        fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok()
    }
}

/// Parses pid file content into a signalable process id.
///
/// Zero and values outside the `pid_t` range are rejected so callers can
/// never address a process group by accident.
fn parse_pid(content: &str) -> Option<u32> {
    let pid = content.trim().parse::<u32>().ok()?;
    let valid = pid != 0 && i32::try_from(pid).is_ok();
    valid.then_some(pid)
}

/// Writes the bytes to `path` via a temporary sibling and an atomic rename.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "pid file path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder.prefix(
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("beacond"),
    );
    #[cfg(unix)]
    {
        use std::fs::Permissions;
        builder.permissions(Permissions::from_mode(0o600));
    }

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
