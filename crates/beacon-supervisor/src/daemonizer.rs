//! Detaches the daemon and claims the instance record for it.
//!
//! This is the child-side call site of a start: `beacond` calls
//! [`claim_and_detach`] before running any service logic. The parent side
//! lives in [`crate::Launcher`].

use std::env;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::Path;

use beacon_config::{LogFormat, RuntimePaths};
use daemonize_me::Daemon;
use thiserror::Error;
use tracing::{info, warn};

use crate::errors::SupervisorError;
use crate::liveness::LivenessProber;
use crate::registry::PidRegistry;
use crate::telemetry::{self, LogSink};

const DAEMON_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::daemonizer");

/// Environment variable that keeps the daemon attached to its terminal.
pub const FOREGROUND_ENV_VAR: &str = "BEACON_FOREGROUND";

/// Launch mode for the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    /// Fork into the background and detach from the controlling terminal.
    Background,
    /// Remain attached to the terminal; primarily used for debugging and tests.
    Foreground,
}

impl LaunchMode {
    /// Selects foreground mode when [`FOREGROUND_ENV_VAR`] is set.
    pub fn detect() -> Self {
        if env::var_os(FOREGROUND_ENV_VAR).is_some() {
            Self::Foreground
        } else {
            Self::Background
        }
    }
}

/// Abstraction over daemonisation strategies.
pub trait Daemonizer: Send + Sync {
    /// Detaches the process into the background.
    fn daemonize(&self, paths: &RuntimePaths) -> Result<(), DaemonizeError>;
}

/// Errors surfaced by the daemonisation backend.
#[derive(Debug, Error)]
pub enum DaemonizeError {
    /// System-level daemonisation failed.
    #[error("{0}")]
    System(#[from] daemonize_me::DaemonError),
}

/// Daemoniser that delegates to `daemonize-me`.
#[derive(Debug, Clone)]
pub struct SystemDaemonizer {
    name: OsString,
}

impl SystemDaemonizer {
    /// Builds a daemoniser that renames the detached process to `name`.
    pub fn new(name: impl Into<OsString>) -> Self {
        Self { name: name.into() }
    }
}

impl Daemonizer for SystemDaemonizer {
    fn daemonize(&self, paths: &RuntimePaths) -> Result<(), DaemonizeError> {
        info!(
            target: DAEMON_TARGET,
            working_dir = %paths.working_dir().display(),
            "daemonising into background"
        );
        let mut daemon = Daemon::new();
        daemon = daemon.work_dir(paths.working_dir());
        daemon = daemon.name(&self.name);
        daemon.start()?;
        Ok(())
    }
}

/// Log settings applied once the process has detached.
#[derive(Debug, Clone, Copy)]
pub struct LogSettings<'a> {
    /// `tracing` filter expression.
    pub filter: &'a str,
    /// Line format.
    pub format: LogFormat,
}

/// Ownership of the instance record held by the running daemon.
///
/// Dropping the claim releases it. Releasing only removes the record while it
/// still names this process, so a claim never erases a successor's record.
#[derive(Debug)]
pub struct InstanceClaim {
    registry: PidRegistry,
    pid: u32,
    released: bool,
}

impl InstanceClaim {
    /// PID recorded for this daemon.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Removes the instance record if it still belongs to this claim.
    pub fn release(&mut self) -> Result<(), SupervisorError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.registry.clear_if(self.pid)?;
        info!(
            target: DAEMON_TARGET,
            pid = self.pid,
            "instance claim released"
        );
        Ok(())
    }
}

impl Drop for InstanceClaim {
    fn drop(&mut self) {
        if let Err(error) = self.release() {
            warn!(
                target: DAEMON_TARGET,
                pid = self.pid,
                error = %error,
                "failed to release instance claim"
            );
        }
    }
}

/// Detaches the current process and records it as the running instance.
///
/// The steps run in order and cannot be undone once begun: provision the
/// runtime directories, refuse if a live instance is registered, detach (in
/// [`LaunchMode::Background`]), redirect logging to the log file, then write
/// this process's pid as the final step.
pub fn claim_and_detach<D>(
    paths: &RuntimePaths,
    mode: LaunchMode,
    daemonizer: &D,
    logging: LogSettings<'_>,
) -> Result<InstanceClaim, SupervisorError>
where
    D: Daemonizer + ?Sized,
{
    paths.prepare()?;
    let registry = PidRegistry::new(paths.pid_path());
    let prober = LivenessProber::new(registry.clone());
    if let Some(pid) = prober.live_pid() {
        info!(
            target: DAEMON_TARGET,
            pid,
            "refusing to start: existing daemon alive"
        );
        return Err(SupervisorError::AlreadyRunning { pid });
    }

    let sink = match mode {
        LaunchMode::Background => {
            daemonizer.daemonize(paths)?;
            LogSink::File(open_log_file(paths.log_path())?)
        }
        LaunchMode::Foreground => LogSink::Stderr,
    };
    telemetry::initialise(logging.filter, logging.format, sink)?;

    let pid = std::process::id();
    registry.write(pid)?;
    info!(
        target: DAEMON_TARGET,
        pid,
        ?mode,
        log = %paths.log_path().display(),
        "daemon detached and registered"
    );
    Ok(InstanceClaim {
        registry,
        pid,
        released: false,
    })
}

fn open_log_file(path: &Path) -> Result<File, SupervisorError> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options.open(path).map_err(|source| SupervisorError::LogSink {
        path: path.to_path_buf(),
        source,
    })
}
