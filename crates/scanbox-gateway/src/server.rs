use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use scanbox_core::{BuildInfo, ScannerStatus, StatusTracker};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Everything the status document is built from.
pub struct StatusState {
    /// Live counters and self-test outcome.
    pub tracker: Arc<StatusTracker>,
    /// Worker id reported to the engine.
    pub worker_id: String,
    /// Process start time.
    pub started_at: DateTime<Utc>,
    /// Build metadata.
    pub build: BuildInfo,
}

impl StatusState {
    /// Builds a fresh status document.
    pub fn status(&self) -> ScannerStatus {
        ScannerStatus::from_snapshot(
            self.tracker.snapshot(),
            self.started_at,
            self.worker_id.clone(),
            self.build.clone(),
        )
    }
}

/// The status server.
pub struct StatusServer;

impl StatusServer {
    /// Builds the router serving `GET /status`.
    pub fn build(state: StatusState) -> Router {
        Router::new()
            .route("/status", get(status_handler))
            .with_state(Arc::new(state))
    }

    /// Serves `router` on `listener` until `cancel` fires.
    pub async fn serve(
        listener: TcpListener,
        router: Router,
        cancel: CancellationToken,
    ) -> std::io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("Status endpoint listening on {addr}");
        }
        axum::serve(listener, router)
            .with_graceful_shutdown(cancel.cancelled_owned())
            .await
    }
}

async fn status_handler(State(state): State<Arc<StatusState>>) -> Response {
    let status = state.status();
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (code, Json(status)).into_response()
}
