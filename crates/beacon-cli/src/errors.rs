//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use beacon_supervisor::{SupervisorError, TelemetryError};
use thiserror::Error;

use crate::http::ServeError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("beacond pid {pid} is still running after every stop attempt")]
    StopTimedOut { pid: u32 },
    #[error("failed to write command output: {0}")]
    Output(io::Error),
    #[error(transparent)]
    Serve(#[from] ServeError),
}
