//! Request handlers for the control API.

use axum::Json;
use axum::extract::State;
use beacon_supervisor::{DaemonControl, Outcome, SupervisorError};
use serde::Serialize;
use tracing::warn;

use super::{HTTP_TARGET, SharedControl};

/// Body of `GET /ping`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct PingResponse {
    /// Seconds the daemon has been up.
    pub(crate) uptime: f64,
}

/// Body reporting whether the daemon is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct StatusResponse {
    #[serde(rename = "daemon status")]
    pub(crate) running: bool,
}

/// Body of `GET /daemon/pid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct PidResponse {
    #[serde(rename = "daemon pid")]
    pub(crate) pid: Option<u32>,
}

/// Runs `operation` on the blocking pool; a panicked task yields `None`.
async fn blocking<T, F>(control: SharedControl, operation: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn DaemonControl) -> T + Send + 'static,
{
    match tokio::task::spawn_blocking(move || operation(control.as_ref())).await {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(target: HTTP_TARGET, %error, "supervisor task failed");
            None
        }
    }
}

/// GET /ping - daemon uptime.
pub(crate) async fn ping(State(control): State<SharedControl>) -> Json<PingResponse> {
    let uptime = blocking(control, |control| control.uptime())
        .await
        .unwrap_or_default();
    Json(PingResponse {
        uptime: uptime.as_secs_f64(),
    })
}

/// GET /daemon/status - whether a live instance is registered.
pub(crate) async fn status(State(control): State<SharedControl>) -> Json<StatusResponse> {
    let running = blocking(control, |control| control.status().is_running())
        .await
        .unwrap_or(false);
    Json(StatusResponse { running })
}

/// GET /daemon/pid - pid of the live instance.
pub(crate) async fn pid(State(control): State<SharedControl>) -> Json<PidResponse> {
    let pid = blocking(control, |control| control.pid()).await.flatten();
    Json(PidResponse { pid })
}

/// POST /daemon/start
pub(crate) async fn start(State(control): State<SharedControl>) -> Json<StatusResponse> {
    run_lifecycle(control, "start", |control| control.start()).await
}

/// POST /daemon/stop
pub(crate) async fn stop(State(control): State<SharedControl>) -> Json<StatusResponse> {
    run_lifecycle(control, "stop", |control| control.stop()).await
}

/// POST /daemon/restart
pub(crate) async fn restart(State(control): State<SharedControl>) -> Json<StatusResponse> {
    run_lifecycle(control, "restart", |control| control.restart()).await
}

/// Runs a lifecycle operation and reports the status observed afterwards.
///
/// Failures are logged rather than returned: callers only learn whether the
/// daemon ends up running.
async fn run_lifecycle<F>(
    control: SharedControl,
    operation: &'static str,
    action: F,
) -> Json<StatusResponse>
where
    F: FnOnce(&dyn DaemonControl) -> Result<Outcome, SupervisorError> + Send + 'static,
{
    let running = blocking(control, move |control| {
        if let Err(error) = action(control) {
            warn!(target: HTTP_TARGET, operation, %error, "lifecycle operation failed");
        }
        control.status().is_running()
    })
    .await
    .unwrap_or(false);
    Json(StatusResponse { running })
}
