//! Command-line runtime for the beacon supervisor.
//!
//! `beacon` loads the shared configuration, parses one lifecycle command, and
//! drives a [`Supervisor`] that launches `beacond` with the same configuration
//! flags. `beacon serve` exposes the same operations over HTTP. Configuration
//! loading and the IO streams can be substituted so the runtime can be
//! exercised from tests.

use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use beacon_supervisor::{DaemonLauncher, LogSink, Supervisor, telemetry};
use clap::Parser;

mod cli;
mod config;
mod errors;
mod http;
mod lifecycle;
#[cfg(test)]
mod test_support;

use cli::{Cli, CliCommand};
use config::{ConfigLoader, OrthoConfigLoader, command_arguments, split_config_arguments};
pub(crate) use errors::AppError;
pub use http::ServeError;
use lifecycle::{LifecycleCommand, LifecycleOutput};

/// CLI flags recognised by the configuration loader.
///
/// MAINTENANCE: keep in sync with the fields of `beacon_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--base-dir",
    "--log-filter",
    "--log-format",
    "--stop-attempts",
    "--stop-wait-seconds",
    "--startup-timeout-seconds",
    "--http-listen",
    "--process-name",
    "--daemon-binary",
];

/// Log filter for one-shot lifecycle commands, whose stdout is the report.
const LIFECYCLE_LOG_FILTER: &str = "warn";

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

fn run_with_loader<I, W, E, L>(args: I, stdout: &mut W, stderr: &mut E, loader: &L) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let args: Vec<OsString> = args.into_iter().collect();
    match execute(&args, stdout, loader) {
        Ok(exit_code) => exit_code,
        Err(AppError::CliUsage(error)) if !error.use_stderr() => {
            let _ = write!(stdout, "{error}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            let _ = writeln!(stderr, "{error}");
            ExitCode::FAILURE
        }
    }
}

fn execute<W, L>(args: &[OsString], stdout: &mut W, loader: &L) -> Result<ExitCode, AppError>
where
    W: Write,
    L: ConfigLoader,
{
    let split = split_config_arguments(args);
    let cli = Cli::try_parse_from(command_arguments(args, &split)).map_err(AppError::CliUsage)?;
    let config = loader.load(&split.config_arguments)?;

    let filter = match cli.command {
        CliCommand::Serve => config.log_filter(),
        _ => LIFECYCLE_LOG_FILTER,
    };
    telemetry::initialise(filter, config.log_format(), LogSink::Stderr)?;

    let launcher = DaemonLauncher::new(
        &split.config_arguments,
        config.daemon_binary().map(Path::as_os_str),
    );
    let supervisor = Supervisor::from_config(&config, launcher);
    let command = match cli.command {
        CliCommand::Serve => {
            http::serve(config.http_listen(), Arc::new(supervisor))?;
            return Ok(ExitCode::SUCCESS);
        }
        CliCommand::Start => LifecycleCommand::Start,
        CliCommand::Stop => LifecycleCommand::Stop,
        CliCommand::Restart => LifecycleCommand::Restart,
        CliCommand::Status => LifecycleCommand::Status,
    };
    let log_path = supervisor.paths().log_path().to_path_buf();
    lifecycle::handle(
        command,
        &supervisor,
        &log_path,
        &mut LifecycleOutput::new(stdout),
    )
}

#[cfg(test)]
mod tests;
