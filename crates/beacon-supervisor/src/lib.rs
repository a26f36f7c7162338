//! Single-instance lifecycle supervision for the `beacond` daemon.
//!
//! The instance record is a pid file owned by [`PidRegistry`]. Every read of
//! it goes through a [`LivenessProber`], which clears records naming dead
//! processes, so stale state heals itself. Starting is split across two
//! processes: the controller spawns the daemon through a [`Launcher`] and
//! polls the registry, while the daemon calls [`claim_and_detach`] to detach
//! and record its own pid. [`Supervisor`] composes these into the
//! start/stop/restart/status operations exposed by [`DaemonControl`].

mod daemonizer;
pub mod discovery;
mod errors;
mod launcher;
pub mod liveness;
mod registry;
mod supervisor;
pub mod telemetry;
mod termination;

pub use daemonizer::{
    DaemonizeError, Daemonizer, FOREGROUND_ENV_VAR, InstanceClaim, LaunchMode, LogSettings,
    SystemDaemonizer, claim_and_detach,
};
pub use discovery::{ProcessSnapshot, ProcessState, find_by_name, find_by_names};
pub use errors::SupervisorError;
pub use launcher::{DAEMON_BIN_ENV_VAR, DaemonLauncher, Launcher};
pub use liveness::{Liveness, LivenessProber, probe};
pub use registry::PidRegistry;
pub use supervisor::{DaemonControl, Outcome, Supervisor, SupervisorSettings};
pub use telemetry::{LogSink, TelemetryError, TelemetryHandle};
pub use termination::{TerminationPolicy, Terminator};
