//! HTTP surface of a running gate.
//!
//! - `GET /metrics` - Prometheus text format
//! - `GET /status` - JSON snapshot of lockdown, command switches and cache size

use crate::commands::Switchboard;
use crate::security::PermissionCache;
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Live state read by `/status`.
#[derive(Clone)]
pub struct StatusSource {
    pub switchboard: Arc<Switchboard>,
    pub cache: Arc<PermissionCache>,
}

#[derive(Debug, Serialize)]
struct Status {
    lockdown: bool,
    enabled_commands: Vec<String>,
    disabled_commands: Vec<String>,
    cached_admin_flags: usize,
    cached_silence_flags: usize,
}

async fn metrics_handler() -> String {
    crate::metrics::gather_metrics()
}

async fn status_handler(State(source): State<StatusSource>) -> Json<Status> {
    let table = source.switchboard.snapshot();
    let (enabled, disabled): (Vec<_>, Vec<_>) = table
        .descriptors()
        .into_iter()
        .partition(|d| table.is_enabled(d));
    let stats = source.cache.stats();

    Json(Status {
        lockdown: table.lockdown(),
        enabled_commands: enabled.iter().map(|d| d.name.clone()).collect(),
        disabled_commands: disabled.iter().map(|d| d.name.clone()).collect(),
        cached_admin_flags: stats.admin_entries,
        cached_silence_flags: stats.silence_entries,
    })
}

pub fn router(source: StatusSource) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/status", get(status_handler))
        .with_state(source)
}

/// Serve on an already bound listener until the task is dropped.
pub async fn serve(listener: TcpListener, source: StatusSource) -> std::io::Result<()> {
    axum::serve(listener, router(source)).await
}

/// Bind `0.0.0.0:port` and serve. Meant to be spawned in the background.
pub async fn run_http_server(port: u16, source: StatusSource) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind status server");
            return;
        }
    };
    tracing::info!(%addr, "Status and metrics server listening");

    if let Err(e) = serve(listener, source).await {
        tracing::error!(error = %e, "Status server error");
    }
}
