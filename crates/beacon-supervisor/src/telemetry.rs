//! Structured telemetry initialisation for the supervisor binaries.

use std::fs::File;
use std::io::{self, IsTerminal};
use std::sync::Mutex;

use beacon_config::LogFormat;
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{self, writer::BoxMakeWriter};

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Destination for log lines.
#[derive(Debug)]
pub enum LogSink {
    /// Standard error; used by the CLI and foreground daemons.
    Stderr,
    /// An append-mode log file; used once the daemon has detached.
    File(File),
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Repeated calls are idempotent: later invocations return a fresh
/// [`TelemetryHandle`] and drop their sink without touching global state.
pub fn initialise(
    filter: &str,
    format: LogFormat,
    sink: LogSink,
) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(filter, format, sink))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(filter: &str, format: LogFormat, sink: LogSink) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_new(filter).map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let (writer, ansi) = match sink {
        LogSink::Stderr => (BoxMakeWriter::new(io::stderr), io::stderr().is_terminal()),
        LogSink::File(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}
