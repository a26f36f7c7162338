//! Parent-side half of a start: spawning the daemon binary.
//!
//! The spawned `beacond` performs its own detach through
//! [`crate::claim_and_detach`]; the parent only needs the child handle to
//! notice an early failure.

use std::env;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use tracing::debug;

use crate::errors::SupervisorError;

const LAUNCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::launcher");

/// Environment variable naming the daemon binary.
pub const DAEMON_BIN_ENV_VAR: &str = "BEACOND_BIN";
const DAEMON_BIN_NAME: &str = "beacond";

/// Starts a daemon process that will register itself.
pub trait Launcher: Send + Sync {
    /// Spawns the daemon and returns a handle to the spawned process.
    fn launch(&self) -> Result<Child, SupervisorError>;
}

/// Launches the `beacond` binary with forwarded configuration arguments.
#[derive(Debug, Clone)]
pub struct DaemonLauncher {
    binary: OsString,
    arguments: Vec<OsString>,
}

impl DaemonLauncher {
    /// Builds a launcher forwarding `config_arguments` to the daemon.
    ///
    /// `config_arguments` follows argv conventions: the first element is the
    /// invoking program's name and is not forwarded.
    pub fn new(config_arguments: &[OsString], binary_override: Option<&OsStr>) -> Self {
        Self {
            binary: resolve_daemon_binary(binary_override),
            arguments: config_arguments.iter().skip(1).cloned().collect(),
        }
    }

    /// Binary that will be spawned.
    pub fn binary(&self) -> &OsStr {
        &self.binary
    }

    /// Arguments forwarded to the daemon.
    pub fn arguments(&self) -> &[OsString] {
        &self.arguments
    }
}

impl Launcher for DaemonLauncher {
    fn launch(&self) -> Result<Child, SupervisorError> {
        debug!(
            target: LAUNCH_TARGET,
            binary = ?self.binary,
            arguments = ?self.arguments,
            "spawning daemon"
        );
        Command::new(&self.binary)
            .args(&self.arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| SupervisorError::Launch {
                binary: self.binary.clone(),
                source,
            })
    }
}

/// Picks the daemon binary: explicit override, then [`DAEMON_BIN_ENV_VAR`],
/// then a `beacond` installed next to the running executable, then `PATH`.
fn resolve_daemon_binary(binary_override: Option<&OsStr>) -> OsString {
    binary_override
        .map(OsString::from)
        .or_else(|| env::var_os(DAEMON_BIN_ENV_VAR))
        .or_else(|| sibling_binary().map(PathBuf::into_os_string))
        .unwrap_or_else(|| OsString::from(DAEMON_BIN_NAME))
}

fn sibling_binary() -> Option<PathBuf> {
    let current = env::current_exe().ok()?;
    let candidate = current.parent()?.join(DAEMON_BIN_NAME);
    candidate.is_file().then_some(candidate)
}
