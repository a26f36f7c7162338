//! Graceful termination with bounded retries.
//!
//! A stop sends `SIGTERM` and then polls liveness once per poll interval, up
//! to `wait_seconds` polls. The cycle repeats up to `max_attempts` times. A
//! process observed dead at any point has its record cleared. A process that
//! survives every attempt keeps its record: it is still alive and must not be
//! forgotten.

use std::thread;
use std::time::Duration;

use beacon_config::Config;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

use crate::errors::SupervisorError;
use crate::liveness::LivenessProber;

const TERMINATION_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::termination");
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Retry budget for a termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationPolicy {
    /// Signals sent before giving up.
    pub max_attempts: u32,
    /// Liveness polls performed after each signal.
    pub wait_seconds: u32,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl TerminationPolicy {
    /// Builds the policy described by the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.stop_attempts,
            wait_seconds: config.stop_wait_seconds,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Default for TerminationPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Signals processes and waits for them to exit.
#[derive(Debug, Clone)]
pub struct Terminator {
    prober: LivenessProber,
    policy: TerminationPolicy,
}

impl Terminator {
    /// Builds a terminator reconciling the prober's registry.
    pub fn new(prober: LivenessProber, policy: TerminationPolicy) -> Self {
        Self { prober, policy }
    }

    /// Retry budget in force.
    pub fn policy(&self) -> TerminationPolicy {
        self.policy
    }

    /// Asks `pid` to exit and waits for it within the retry budget.
    ///
    /// Returns `Ok(())` once the process is observed dead (including when it
    /// was never alive). Returns [`SupervisorError::TerminationTimeout`] when
    /// it outlives every attempt, and [`SupervisorError::Signal`] when the
    /// signal cannot be delivered for any reason other than the process being
    /// gone.
    pub fn terminate(&self, pid: u32) -> Result<(), SupervisorError> {
        if !self.prober.is_alive(pid) {
            debug!(target: TERMINATION_TARGET, pid, "process already gone");
            return Ok(());
        }

        let TerminationPolicy {
            max_attempts,
            wait_seconds,
            poll_interval,
        } = self.policy;
        for attempt in 1..=max_attempts {
            info!(
                target: TERMINATION_TARGET,
                pid,
                attempt,
                max_attempts,
                "sending SIGTERM"
            );
            if !send_sigterm(pid)? {
                self.prober.is_alive(pid);
                return Ok(());
            }
            for _ in 0..wait_seconds {
                thread::sleep(poll_interval);
                if !self.prober.is_alive(pid) {
                    info!(target: TERMINATION_TARGET, pid, attempt, "process exited");
                    return Ok(());
                }
            }
            debug!(
                target: TERMINATION_TARGET,
                pid,
                attempt,
                "process still alive after waiting"
            );
        }

        warn!(
            target: TERMINATION_TARGET,
            pid,
            max_attempts,
            wait_seconds,
            "process outlived every termination attempt"
        );
        Err(SupervisorError::TerminationTimeout {
            pid,
            attempts: max_attempts,
            wait_seconds,
        })
    }
}

/// Sends `SIGTERM`; returns `false` when the process no longer exists.
fn send_sigterm(pid: u32) -> Result<bool, SupervisorError> {
    let raw = i32::try_from(pid).map_err(|_| SupervisorError::Signal {
        pid,
        source: Errno::EINVAL,
    })?;
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => Ok(true),
        Err(Errno::ESRCH) => Ok(false),
        Err(source) => Err(SupervisorError::Signal { pid, source }),
    }
}
