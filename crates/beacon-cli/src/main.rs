//! CLI entrypoint for the beacon supervisor.
//!
//! The binary delegates to [`beacon_cli::run`], which loads configuration,
//! parses the lifecycle command, and drives the supervisor.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    beacon_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
