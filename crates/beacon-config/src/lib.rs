//! Shared configuration for the beacon supervisor binaries.
//!
//! Configuration is layered by [`ortho_config`]: built-in defaults, then an
//! optional configuration file (`--config-path` or `BEACON_CONFIG_PATH`), then
//! `BEACON_*` environment variables, then command-line flags. Both `beacon`
//! and `beacond` load the same [`Config`] so they agree on where the instance
//! record and log file live.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

mod defaults;
mod logging;
mod runtime;

pub use defaults::{
    DEFAULT_HTTP_LISTEN, DEFAULT_LOG_FILTER, DEFAULT_PROCESS_NAME,
    DEFAULT_STARTUP_TIMEOUT_SECONDS, DEFAULT_STOP_ATTEMPTS, DEFAULT_STOP_WAIT_SECONDS,
    default_base_dir, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use runtime::{RuntimePaths, RuntimePathsError};

/// Configuration shared by the CLI, the HTTP control API, and the daemon.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "BEACON")]
pub struct Config {
    /// Directory holding the `run/` and `log/` trees.
    #[ortho_config(default = defaults::default_base_dir())]
    pub base_dir: PathBuf,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log line format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
    /// Termination signals sent before a stop gives up.
    #[ortho_config(default = defaults::DEFAULT_STOP_ATTEMPTS)]
    pub stop_attempts: u32,
    /// Seconds polled for exit after each termination signal.
    #[ortho_config(default = defaults::DEFAULT_STOP_WAIT_SECONDS)]
    pub stop_wait_seconds: u32,
    /// Seconds a start waits for the daemon to register itself.
    #[ortho_config(default = defaults::DEFAULT_STARTUP_TIMEOUT_SECONDS)]
    pub startup_timeout_seconds: u32,
    /// Socket address served by `beacon serve`.
    #[ortho_config(default = defaults::default_http_listen())]
    pub http_listen: String,
    /// Executable name used to discover an unregistered daemon.
    #[ortho_config(default = defaults::default_process_name())]
    pub process_name: String,
    /// Explicit path to the `beacond` binary.
    pub daemon_binary: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: defaults::default_base_dir(),
            log_filter: defaults::default_log_filter_string(),
            log_format: defaults::default_log_format(),
            stop_attempts: DEFAULT_STOP_ATTEMPTS,
            stop_wait_seconds: DEFAULT_STOP_WAIT_SECONDS,
            startup_timeout_seconds: DEFAULT_STARTUP_TIMEOUT_SECONDS,
            http_listen: defaults::default_http_listen(),
            process_name: defaults::default_process_name(),
            daemon_binary: None,
        }
    }
}

impl Config {
    /// Directory holding the `run/` and `log/` trees.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        self.base_dir.as_path()
    }

    /// Filter expression handed to the telemetry layer.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log line format.
    #[must_use]
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Derived runtime paths.
    #[must_use]
    pub fn runtime_paths(&self) -> RuntimePaths {
        RuntimePaths::from_config(self)
    }

    /// Upper bound on how long a start waits for registration.
    #[must_use]
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.startup_timeout_seconds))
    }

    /// Socket address served by the HTTP control API.
    #[must_use]
    pub fn http_listen(&self) -> &str {
        &self.http_listen
    }

    /// Executable name of the managed daemon.
    #[must_use]
    pub fn process_name(&self) -> &str {
        &self.process_name
    }

    /// Explicit `beacond` binary override, if configured.
    #[must_use]
    pub fn daemon_binary(&self) -> Option<&Path> {
        self.daemon_binary.as_deref()
    }
}
