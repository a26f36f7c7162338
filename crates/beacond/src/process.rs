//! Daemon launch sequencing: claim, idle, release.

use std::sync::Arc;

use beacon_supervisor::{
    Daemonizer, LaunchMode, LogSettings, SupervisorError, SystemDaemonizer, claim_and_detach,
};
use ortho_config::OrthoError;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader};
use crate::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Errors surfaced while launching or running the daemon process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Claiming the instance record or detaching failed.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    /// Waiting for shutdown failed.
    #[error("failed to await shutdown: {source}")]
    Shutdown {
        /// Underlying listener error.
        #[from]
        source: ShutdownError,
    },
}

/// Collaborators required to launch the daemon runtime.
pub(crate) struct LaunchPlan<L, D, S> {
    pub(crate) mode: LaunchMode,
    pub(crate) loader: L,
    pub(crate) daemonizer: D,
    pub(crate) shutdown: S,
}

/// Runs the daemon using the production collaborators.
pub fn run_daemon() -> Result<(), LaunchError> {
    run_daemon_with(LaunchPlan {
        mode: LaunchMode::detect(),
        loader: SystemConfigLoader,
        daemonizer: SystemDaemonizer::new(env!("CARGO_PKG_NAME")),
        shutdown: SystemShutdownSignal::new(),
    })
}

/// Runs the daemon with injected collaborators.
pub(crate) fn run_daemon_with<L, D, S>(plan: LaunchPlan<L, D, S>) -> Result<(), LaunchError>
where
    L: ConfigLoader,
    D: Daemonizer,
    S: ShutdownSignal,
{
    let LaunchPlan {
        mode,
        loader,
        daemonizer,
        shutdown,
    } = plan;

    let config = loader
        .load()
        .map_err(|source| LaunchError::Config { source })?;
    let paths = config.runtime_paths();
    let logging = LogSettings {
        filter: config.log_filter(),
        format: config.log_format(),
    };
    let mut claim = claim_and_detach(&paths, mode, &daemonizer, logging)?;
    info!(
        target: PROCESS_TARGET,
        pid = claim.pid(),
        ?mode,
        "daemon running"
    );

    // Release the record even when the listener fails.
    let waited = shutdown.wait();
    claim.release()?;
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
