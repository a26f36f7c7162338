//! HTTP control API served by `beacon serve`.
//!
//! ## Endpoints
//!
//! - `GET /ping` - daemon uptime in seconds
//! - `GET /daemon/status` - whether the daemon is running
//! - `GET /daemon/pid` - pid of the running daemon, or `null`
//! - `POST /daemon/start`, `POST /daemon/stop`, `POST /daemon/restart` -
//!   run the lifecycle operation and report the resulting status
//!
//! Lifecycle operations block while they poll, so every handler runs its
//! supervisor call on the blocking thread pool.

use std::io;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use beacon_supervisor::DaemonControl;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

mod handlers;

pub(crate) const HTTP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::http");

/// Supervisor shared by every request.
pub(crate) type SharedControl = Arc<dyn DaemonControl>;

/// Errors raised while running the control API.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The async runtime could not be built.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] io::Error),
    /// The listen address could not be bound.
    #[error("failed to bind control API to '{address}': {source}")]
    Bind {
        /// Configured listen address.
        address: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The server stopped with an error.
    #[error("control API server error: {0}")]
    Server(#[source] io::Error),
}

/// Builds the control API router.
pub(crate) fn router(control: SharedControl) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/daemon/status", get(handlers::status))
        .route("/daemon/pid", get(handlers::pid))
        .route("/daemon/start", post(handlers::start))
        .route("/daemon/stop", post(handlers::stop))
        .route("/daemon/restart", post(handlers::restart))
        .with_state(control)
        .layer(TraceLayer::new_for_http())
}

/// Serves the control API on `address` until Ctrl-C or `SIGTERM`.
pub(crate) fn serve(address: &str, control: SharedControl) -> Result<(), ServeError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(ServeError::Runtime)?;
    runtime.block_on(serve_until_shutdown(address, control))
}

async fn serve_until_shutdown(address: &str, control: SharedControl) -> Result<(), ServeError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ServeError::Bind {
            address: address.to_owned(),
            source,
        })?;
    info!(
        target: HTTP_TARGET,
        address = %listener.local_addr().map_or_else(|_| address.to_owned(), |addr| addr.to_string()),
        "control API listening"
    );
    axum::serve(listener, router(control))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Server)?;
    info!(target: HTTP_TARGET, "control API stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(target: HTTP_TARGET, %error, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(target: HTTP_TARGET, %error, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!(target: HTTP_TARGET, "shutdown signal received");
}
