//! The `beacond` daemon.
//!
//! `beacond` is the process managed by the `beacon` controller. On launch it
//! loads the shared configuration, detaches from the terminal, and records its
//! pid through [`beacon_supervisor::claim_and_detach`]. It then idles until a
//! termination signal arrives and releases its instance record on the way out.
//! Set `BEACON_FOREGROUND` to keep it attached to the terminal.

mod bootstrap;
mod process;
mod shutdown;

pub use bootstrap::{ConfigLoader, StaticConfigLoader, SystemConfigLoader};
pub use process::{LaunchError, run_daemon};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

#[cfg(test)]
mod tests;
