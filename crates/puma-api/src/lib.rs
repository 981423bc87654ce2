//! puma-api — HTTP surface of the Puma exporter.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/` | Landing page with version and a link to `/metrics` |
//! | GET | `/metrics` | Prometheus text exposition |
//!
//! Handlers only read [`PumaMetrics`]; polling the control app is the
//! refresher's job.

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use puma_metrics::PumaMetrics;

/// Shared state for handlers.
#[derive(Clone)]
pub struct ApiState {
    pub metrics: Arc<PumaMetrics>,
}

/// Build the exporter router.
pub fn build_router(metrics: Arc<PumaMetrics>) -> Router {
    Router::new()
        .route("/", get(handlers::landing))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(ApiState { metrics })
}
