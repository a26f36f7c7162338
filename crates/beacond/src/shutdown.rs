//! Waiting for the signal that ends the daemon.
//!
//! `beacond` idles on its instance claim until one of the termination signals
//! arrives. `SIGTERM` is what `beacon stop` sends; the others cover a terminal
//! session ending or an operator interrupt. Once the wait returns, the launch
//! sequence releases the claim so the pid file disappears before exit.

use std::io;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use crate::process::PROCESS_TARGET;

/// Source of the daemon's shutdown request.
pub trait ShutdownSignal: Send + Sync {
    /// Blocks until the daemon should release its claim and exit.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Waits for `SIGTERM`, `SIGINT`, `SIGQUIT` or `SIGHUP`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShutdownSignal;

impl SystemShutdownSignal {
    /// Builds a signal listener.
    pub fn new() -> Self {
        Self
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                "shutdown signal received; releasing instance claim"
            );
        }
        Ok(())
    }
}
