//! CLI argument definitions for the beacon controller.

use clap::{Parser, Subcommand};

/// Controls the single `beacond` instance for this base directory.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Lifecycle command to run.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Commands accepted by `beacon`.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Starts the daemon unless one is already running.
    Start,
    /// Stops the running daemon.
    Stop,
    /// Stops the daemon if running, then starts it.
    Restart,
    /// Reports whether the daemon is running; exits 2 when it is not.
    Status,
    /// Serves the HTTP control API in the foreground.
    Serve,
}
