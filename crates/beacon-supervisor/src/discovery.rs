//! Locates a running daemon by executable name.
//!
//! Discovery is a fallback for uptime reporting when no instance record
//! exists, for example when the daemon was launched by hand. It never drives
//! lifecycle decisions.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sysinfo::{Process, ProcessStatus, System};
use tracing::debug;

const DISCOVERY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::discovery");

/// Scheduling state reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Currently running or runnable.
    Running,
    /// Waiting on an event.
    Sleeping,
    /// Stopped by a signal or a tracer.
    Stopped,
    /// Exited but not yet reaped.
    Zombie,
    /// Any state the mapping does not distinguish.
    Unknown,
}

impl From<ProcessStatus> for ProcessState {
    fn from(status: ProcessStatus) -> Self {
        match status {
            ProcessStatus::Run => Self::Running,
            ProcessStatus::Sleep | ProcessStatus::Idle | ProcessStatus::UninterruptibleDiskSleep => {
                Self::Sleeping
            }
            ProcessStatus::Stop | ProcessStatus::Tracing => Self::Stopped,
            ProcessStatus::Zombie => Self::Zombie,
            _ => Self::Unknown,
        }
    }
}

/// Point-in-time view of a discovered process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSnapshot {
    /// Process identifier.
    pub pid: u32,
    /// Scheduling state at scan time.
    pub state: ProcessState,
    /// When the OS reports the process was created.
    pub start_time: SystemTime,
}

impl ProcessSnapshot {
    fn from_process(process: &Process) -> Self {
        Self {
            pid: process.pid().as_u32(),
            state: process.status().into(),
            start_time: UNIX_EPOCH + Duration::from_secs(process.start_time()),
        }
    }

    /// Time elapsed between process creation and `now`; zero if the clock
    /// moved backwards.
    pub fn uptime(&self, now: SystemTime) -> Duration {
        now.duration_since(self.start_time).unwrap_or_default()
    }
}

/// Scans the process table once and returns the first exact name match.
///
/// Which match wins among several is unspecified.
pub fn find_by_name(name: &str) -> Option<ProcessSnapshot> {
    find_by_names(&[name])
}

/// Scans the process table once, trying each name in order.
pub fn find_by_names<S: AsRef<str>>(names: &[S]) -> Option<ProcessSnapshot> {
    let mut system = System::new();
    system.refresh_processes();
    let snapshot = names.iter().find_map(|name| {
        system
            .processes_by_exact_name(name.as_ref())
            .next()
            .map(ProcessSnapshot::from_process)
    });
    debug!(
        target: DISCOVERY_TARGET,
        candidates = names.len(),
        found = snapshot.as_ref().map(|found| found.pid),
        "process table scanned"
    );
    snapshot
}
