//! Route configuration for the exporter.

use axum::routing::{get, Router};
use event_vault::ExpositionRegistry;
use tower_http::trace::TraceLayer;

use crate::handlers::{healthz, index, metrics};

/// Create the exporter router.
pub fn create_router(registry: ExpositionRegistry) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(registry)
        .layer(TraceLayer::new_for_http())
}
