//! Lifecycle command handling and exit-code policy.
//!
//! Each command prints one line describing its outcome. `status` exits with
//! [`NOT_RUNNING_EXIT_CODE`] when no instance is registered; errors, including
//! a daemon that refuses to stop, surface as [`AppError`]s.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

use beacon_supervisor::{DaemonControl, Outcome};

use crate::AppError;

/// Exit code reported by `status` when the daemon is not running.
pub(crate) const NOT_RUNNING_EXIT_CODE: u8 = 2;

/// Supported lifecycle commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleCommand {
    Start,
    Stop,
    Restart,
    Status,
}

/// Line-oriented handle over the stdout writer.
pub(crate) struct LifecycleOutput<W: Write> {
    stdout: W,
}

impl<W: Write> LifecycleOutput<W> {
    pub(crate) fn new(stdout: W) -> Self {
        Self { stdout }
    }

    fn stdout_line(&mut self, args: fmt::Arguments<'_>) -> Result<(), AppError> {
        self.stdout.write_fmt(args).map_err(AppError::Output)?;
        self.stdout.write_all(b"\n").map_err(AppError::Output)?;
        self.stdout.flush().map_err(AppError::Output)
    }
}

/// Runs `command` against `control` and reports the outcome.
pub(crate) fn handle<C, W>(
    command: LifecycleCommand,
    control: &C,
    log_path: &Path,
    output: &mut LifecycleOutput<W>,
) -> Result<ExitCode, AppError>
where
    C: DaemonControl + ?Sized,
    W: Write,
{
    match command {
        LifecycleCommand::Start => {
            if let Outcome::AlreadyRunning { pid } = control.status() {
                output.stdout_line(format_args!("beacond is already running in pid {pid}"))?;
                return Ok(ExitCode::SUCCESS);
            }
            output.stdout_line(format_args!(
                "starting beacond; logging to {}",
                log_path.display()
            ))?;
            report(control.start()?, output)
        }
        LifecycleCommand::Stop => report(control.stop()?, output),
        LifecycleCommand::Restart => report(control.restart()?, output),
        LifecycleCommand::Status => match control.status() {
            Outcome::NotRunning => {
                output.stdout_line(format_args!("beacond is not running"))?;
                Ok(ExitCode::from(NOT_RUNNING_EXIT_CODE))
            }
            outcome => report(outcome, output),
        },
    }
}

fn report<W: Write>(outcome: Outcome, output: &mut LifecycleOutput<W>) -> Result<ExitCode, AppError> {
    match outcome {
        Outcome::AlreadyRunning { pid } => {
            output.stdout_line(format_args!("beacond is running in pid {pid}"))?;
        }
        Outcome::Started { pid } => {
            output.stdout_line(format_args!("beacond started with pid {pid}"))?;
        }
        Outcome::Stopped { pid } => {
            output.stdout_line(format_args!("beacond stopped (pid {pid})"))?;
        }
        Outcome::NotRunning => output.stdout_line(format_args!("beacond is not running"))?,
        Outcome::TimedOut { pid } => return Err(AppError::StopTimedOut { pid }),
    }
    Ok(ExitCode::SUCCESS)
}
