//! Lifecycle operations composed from the registry, prober, and terminator.

use std::process::Child;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use beacon_config::{Config, RuntimePaths};
use tracing::{info, warn};

use crate::discovery;
use crate::errors::SupervisorError;
use crate::launcher::Launcher;
use crate::liveness::LivenessProber;
use crate::registry::PidRegistry;
use crate::termination::{TerminationPolicy, Terminator};

const SUPERVISOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::supervisor");

/// Result of a lifecycle operation that completed without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A live instance was already registered.
    AlreadyRunning {
        /// Registered pid.
        pid: u32,
    },
    /// A new instance registered itself.
    Started {
        /// Newly registered pid.
        pid: u32,
    },
    /// No live instance is registered.
    NotRunning,
    /// The registered instance exited after being signalled.
    Stopped {
        /// Pid that exited.
        pid: u32,
    },
    /// The registered instance outlived every termination attempt.
    TimedOut {
        /// Pid that is still alive.
        pid: u32,
    },
}

impl Outcome {
    /// Whether the outcome leaves a live instance behind.
    #[must_use]
    pub fn is_running(self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning { .. } | Self::Started { .. } | Self::TimedOut { .. }
        )
    }
}

/// Lifecycle operations exposed to the CLI and the HTTP control API.
pub trait DaemonControl: Send + Sync {
    /// Starts the daemon unless a live instance is registered.
    fn start(&self) -> Result<Outcome, SupervisorError>;
    /// Stops the registered instance, if any.
    fn stop(&self) -> Result<Outcome, SupervisorError>;
    /// Stops then starts the daemon.
    fn restart(&self) -> Result<Outcome, SupervisorError>;
    /// Reports the registered instance after reconciling stale records.
    fn status(&self) -> Outcome;
    /// Pid of the live registered instance.
    fn pid(&self) -> Option<u32>;
    /// How long the daemon has been up; zero when it cannot be found.
    fn uptime(&self) -> Duration;
}

/// Timing and identification knobs for a [`Supervisor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorSettings {
    /// Retry budget used by `stop`.
    pub termination: TerminationPolicy,
    /// How long `start` waits for the daemon to register itself.
    pub startup_timeout: Duration,
    /// Delay between registry polls during `start`.
    pub poll_interval: Duration,
    /// Executable names tried, in order, to discover an unregistered daemon.
    pub process_names: Vec<String>,
}

impl SupervisorSettings {
    /// Settings described by the shared configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let termination = TerminationPolicy::from_config(config);
        Self {
            termination,
            startup_timeout: config.startup_timeout(),
            poll_interval: termination.poll_interval,
            process_names: discovery_names(config),
        }
    }
}

/// The configured process name, then the file name of a custom daemon binary.
fn discovery_names(config: &Config) -> Vec<String> {
    let mut names = vec![config.process_name().to_owned()];
    let binary_name = config
        .daemon_binary()
        .and_then(|binary| binary.file_name())
        .and_then(|name| name.to_str());
    if let Some(name) = binary_name {
        if !names.iter().any(|known| known == name) {
            names.push(name.to_owned());
        }
    }
    names
}

/// Supervises a single daemon instance described by [`RuntimePaths`].
#[derive(Debug)]
pub struct Supervisor<L> {
    launcher: L,
    paths: RuntimePaths,
    prober: LivenessProber,
    terminator: Terminator,
    settings: SupervisorSettings,
}

impl<L: Launcher> Supervisor<L> {
    /// Builds a supervisor over `paths`.
    pub fn new(paths: RuntimePaths, launcher: L, settings: SupervisorSettings) -> Self {
        let prober = LivenessProber::new(PidRegistry::new(paths.pid_path()));
        let terminator = Terminator::new(prober.clone(), settings.termination);
        Self {
            launcher,
            paths,
            prober,
            terminator,
            settings,
        }
    }

    /// Builds a supervisor from the shared configuration.
    pub fn from_config(config: &Config, launcher: L) -> Self {
        Self::new(
            config.runtime_paths(),
            launcher,
            SupervisorSettings::from_config(config),
        )
    }

    /// Runtime paths this supervisor manages.
    pub fn paths(&self) -> &RuntimePaths {
        &self.paths
    }

    fn registry(&self) -> &PidRegistry {
        self.prober.registry()
    }

    fn await_registration(&self, mut child: Child) -> Result<Outcome, SupervisorError> {
        let deadline = Instant::now() + self.settings.startup_timeout;
        let mut detached = false;
        loop {
            if let Some(pid) = self.prober.live_pid() {
                info!(target: SUPERVISOR_TARGET, pid, "daemon registered");
                if !detached {
                    reap_in_background(child);
                }
                return Ok(Outcome::Started { pid });
            }
            if !detached {
                match child
                    .try_wait()
                    .map_err(|source| SupervisorError::MonitorChild { source })?
                {
                    // A clean exit is the launcher's half of a successful detach.
                    Some(status) if status.success() => detached = true,
                    Some(status) => {
                        return self.abandon_start(SupervisorError::StartupFailed {
                            exit_status: status.code(),
                            log_path: self.paths.log_path().to_path_buf(),
                        });
                    }
                    None => {}
                }
            }
            if Instant::now() >= deadline {
                if !detached {
                    kill_launch(&mut child);
                }
                return self.abandon_start(SupervisorError::StartupTimeout {
                    pid_path: self.paths.pid_path().to_path_buf(),
                    timeout_ms: u64::try_from(self.settings.startup_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                });
            }
            thread::sleep(self.settings.poll_interval);
        }
    }

    /// Reconciles a failed start: a racing instance wins, otherwise the slot
    /// is cleared and the failure reported.
    fn abandon_start(&self, error: SupervisorError) -> Result<Outcome, SupervisorError> {
        if let Some(pid) = self.prober.live_pid() {
            info!(
                target: SUPERVISOR_TARGET,
                pid,
                "another instance registered while starting"
            );
            return Ok(Outcome::AlreadyRunning { pid });
        }
        warn!(target: SUPERVISOR_TARGET, error = %error, "daemon failed to start");
        self.registry().clear()?;
        Err(error)
    }
}

/// Kills a launch that never registered so it cannot claim the slot later.
fn kill_launch(child: &mut Child) {
    let launcher_pid = child.id();
    if let Err(error) = child.kill().and_then(|()| child.wait()) {
        warn!(
            target: SUPERVISOR_TARGET,
            launcher_pid,
            error = %error,
            "failed to kill unregistered launch"
        );
    } else {
        info!(target: SUPERVISOR_TARGET, launcher_pid, "killed unregistered launch");
    }
}

/// Reaps a launched child that has not exited yet.
///
/// The child is either the launcher half of a detach, which exits promptly,
/// or a foreground daemon that registered itself and runs until stopped.
fn reap_in_background(mut child: Child) {
    match child.try_wait() {
        Ok(Some(_)) => return,
        Ok(None) => {}
        Err(error) => {
            warn!(target: SUPERVISOR_TARGET, error = %error, "failed to poll launched child");
        }
    }
    let launcher_pid = child.id();
    let spawned = thread::Builder::new()
        .name(format!("beacon-reap-{launcher_pid}"))
        .spawn(move || {
            if let Err(error) = child.wait() {
                warn!(
                    target: SUPERVISOR_TARGET,
                    launcher_pid,
                    error = %error,
                    "failed to reap launched child"
                );
            }
        });
    if let Err(error) = spawned {
        warn!(
            target: SUPERVISOR_TARGET,
            launcher_pid,
            error = %error,
            "failed to spawn reaper thread"
        );
    }
}

impl<L: Launcher> DaemonControl for Supervisor<L> {
    fn start(&self) -> Result<Outcome, SupervisorError> {
        if let Some(pid) = self.prober.live_pid() {
            info!(target: SUPERVISOR_TARGET, pid, "daemon already running");
            return Ok(Outcome::AlreadyRunning { pid });
        }
        let child = self.launcher.launch()?;
        info!(
            target: SUPERVISOR_TARGET,
            launcher_pid = child.id(),
            log = %self.paths.log_path().display(),
            "daemon launched"
        );
        self.await_registration(child)
    }

    fn stop(&self) -> Result<Outcome, SupervisorError> {
        let Some(pid) = self.prober.live_pid() else {
            return Ok(Outcome::NotRunning);
        };
        match self.terminator.terminate(pid) {
            Ok(()) => Ok(Outcome::Stopped { pid }),
            Err(SupervisorError::TerminationTimeout { .. }) => Ok(Outcome::TimedOut { pid }),
            Err(error) => Err(error),
        }
    }

    fn restart(&self) -> Result<Outcome, SupervisorError> {
        match self.stop()? {
            timed_out @ Outcome::TimedOut { .. } => Ok(timed_out),
            _ => self.start(),
        }
    }

    fn status(&self) -> Outcome {
        match self.prober.live_pid() {
            Some(pid) => Outcome::AlreadyRunning { pid },
            None => Outcome::NotRunning,
        }
    }

    fn pid(&self) -> Option<u32> {
        self.prober.live_pid()
    }

    fn uptime(&self) -> Duration {
        let now = SystemTime::now();
        if self.prober.live_pid().is_some() {
            if let Some(claimed_at) = self.registry().claimed_at() {
                return now.duration_since(claimed_at).unwrap_or_default();
            }
        }
        discovery::find_by_names(&self.settings.process_names)
            .map(|snapshot| snapshot.uptime(now))
            .unwrap_or_default()
    }
}
