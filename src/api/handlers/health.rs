use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::AppState;
use crate::poller::Poller;

/// Health check endpoint response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_interfaces: usize,
}

/// GET /health
///
/// Returns "ok", the application version and the current cache size.
pub async fn health_check<P: Poller>(State(state): State<Arc<AppState<P>>>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_interfaces: state.component.cache().len(),
    };

    (StatusCode::OK, Json(response))
}
