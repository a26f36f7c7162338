use std::env;
use std::path::PathBuf;

#[cfg(unix)]
use dirs::home_dir;
#[cfg(unix)]
use libc::geteuid;

use crate::logging::LogFormat;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// How many times `SIGTERM` is sent before a stop is declared timed out.
pub const DEFAULT_STOP_ATTEMPTS: u32 = 5;

/// Seconds to wait for the daemon to exit after each `SIGTERM`.
pub const DEFAULT_STOP_WAIT_SECONDS: u32 = 5;

/// Seconds to wait for a freshly launched daemon to register its pid.
pub const DEFAULT_STARTUP_TIMEOUT_SECONDS: u32 = 10;

/// Address the HTTP control API binds to.
pub const DEFAULT_HTTP_LISTEN: &str = "127.0.0.1:8081";

/// Executable name of the managed daemon.
pub const DEFAULT_PROCESS_NAME: &str = "beacond";

/// Owned log filter value used where allocation is required.
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned HTTP listen address.
pub fn default_http_listen() -> String {
    DEFAULT_HTTP_LISTEN.to_owned()
}

/// Owned daemon process name.
pub fn default_process_name() -> String {
    DEFAULT_PROCESS_NAME.to_owned()
}

/// Computes the base directory holding the `run/` and `log/` trees.
///
/// Mirrors the classic `~/var` layout; when no home directory is known the
/// tree moves under the temporary directory, namespaced by user id.
pub fn default_base_dir() -> PathBuf {
    #[cfg(unix)]
    {
        if let Some(mut dir) = home_dir() {
            dir.push("var");
            return dir;
        }
        let mut dir = env::temp_dir();
        dir.push("beacon");
        // SAFETY: `geteuid(2)` has no preconditions and cannot fail.
        let uid = unsafe { geteuid() };
        dir.push(format!("uid-{uid}"));
        dir
    }

    #[cfg(not(unix))]
    {
        let mut dir = env::temp_dir();
        dir.push("beacon");
        dir
    }
}
