use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::state_machine::SentinelStatus;

/// The sentinel's own control port (§4.K: "a status endpoint is always
/// available on the sentinel's own control port").
pub fn router(status: Arc<RwLock<SentinelStatus>>) -> Router {
    Router::new()
        .route("/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(status)
}

async fn get_status(State(status): State<Arc<RwLock<SentinelStatus>>>) -> Json<SentinelStatus> {
    Json(status.read().await.clone())
}
