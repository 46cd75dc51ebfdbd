//! HTTP API module for the flow metadata cache
//!
//! # Endpoints
//! - `GET /health`: health check
//! - `GET /metrics`: Prometheus metrics
//! - `GET /api/v0/lookup?sampler=<ip>&if_index=<n>`: cached interface metadata

pub mod handlers;

use axum::{Router, routing::get};
use std::sync::Arc;

use crate::component::Component;
use crate::metrics::MetricsRegistry;
use crate::poller::Poller;

/// Application state shared with endpoints
pub struct AppState<P: Poller> {
    pub metrics: MetricsRegistry,
    pub component: Arc<Component<P>>,
}

/// Creates the main Axum router with all endpoints
pub fn create_router<P: Poller>(state: Arc<AppState<P>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check::<P>))
        .route("/metrics", get(handlers::metrics_handler::<P>))
        .route("/api/v0/lookup", get(handlers::lookup_handler::<P>))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::poller::MockPoller;

    #[tokio::test]
    async fn test_create_router() {
        let metrics = MetricsRegistry::new();
        let component =
            Component::new(Config::default(), metrics.clone(), MockPoller::new()).unwrap();
        let state = Arc::new(AppState {
            metrics,
            component: Arc::new(component),
        });

        let _router = create_router(state);
        // If we get here without panicking, the router was created successfully
    }
}
