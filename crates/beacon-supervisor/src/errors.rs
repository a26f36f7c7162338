//! Defines the unified error surface for supervisor operations.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;

use beacon_config::RuntimePathsError;
use nix::errno::Errno;
use thiserror::Error;

use crate::daemonizer::DaemonizeError;
use crate::telemetry::TelemetryError;

/// Errors surfaced by the supervisor core.
///
/// Stale and malformed instance records never appear here: they are
/// reconciled to "not running" where they are read.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// A live instance already holds the registry slot.
    #[error("daemon already running with pid {pid}")]
    AlreadyRunning {
        /// PID recorded in the registry.
        pid: u32,
    },
    /// Provisioning the runtime directories failed.
    #[error("failed to prepare runtime directories: {source}")]
    CreateDirectory {
        /// Underlying filesystem error.
        #[from]
        source: RuntimePathsError,
    },
    /// Detaching from the controlling terminal failed.
    #[error("failed to daemonise: {source}")]
    Daemonize {
        /// Underlying daemonisation error.
        #[from]
        source: DaemonizeError,
    },
    /// Opening the daemon log file failed.
    #[error("failed to open log file '{path}': {source}")]
    LogSink {
        /// Log file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Installing the telemetry subscriber failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[from]
        source: TelemetryError,
    },
    /// Writing the instance record failed.
    #[error("failed to write pid file '{path}': {source}")]
    RegistryWrite {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing the instance record failed.
    #[error("failed to remove pid file '{path}': {source}")]
    RegistryClear {
        /// PID file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Delivering the termination signal failed.
    #[error("failed to signal daemon pid {pid}: {source}")]
    Signal {
        /// Target process.
        pid: u32,
        /// Underlying OS error.
        #[source]
        source: Errno,
    },
    /// The daemon survived every termination attempt.
    #[error("daemon pid {pid} did not stop after {attempts} attempts of {wait_seconds}s each")]
    TerminationTimeout {
        /// Process that refused to exit.
        pid: u32,
        /// Signals sent.
        attempts: u32,
        /// Polls performed after each signal.
        wait_seconds: u32,
    },
    /// Spawning the daemon binary failed.
    #[error("failed to spawn daemon binary '{binary:?}': {source}")]
    Launch {
        /// Binary that could not be spawned.
        binary: OsString,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The launched process exited before registering a pid.
    #[error("daemon exited before registering (status: {exit_status:?}); see '{log_path}'")]
    StartupFailed {
        /// Exit code of the launched process, if it exited normally.
        exit_status: Option<i32>,
        /// Log file the daemon writes to.
        log_path: PathBuf,
    },
    /// No pid was registered within the startup budget.
    #[error("timed out after {timeout_ms} ms waiting for '{pid_path}'")]
    StartupTimeout {
        /// PID file that never received a live pid.
        pid_path: PathBuf,
        /// Budget that elapsed.
        timeout_ms: u64,
    },
    /// Polling the launched process failed.
    #[error("failed to monitor daemon launch: {source}")]
    MonitorChild {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
