use axum::http::{HeaderValue, Method};
use axum::{routing::get, routing::post, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod jobs;
pub mod metrics;

/// Generate requests are small JSON documents.
const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// API routes plus read-only artifact serving under `/outputs`, and `/metrics`
/// when a Prometheus handle is given.
pub fn api_router(
    state: AppState,
    prometheus: Option<Arc<PrometheusHandle>>,
    cors_origins: &[String],
) -> Router {
    let outputs = ServeDir::new(&state.output_dir);

    let mut router = Router::new()
        .route("/api/generate", post(jobs::submit_generation))
        .route("/api/job/{job_id}", get(jobs::get_job))
        .route("/api/jobs/recent", get(jobs::list_recent_jobs))
        .route("/api/health", get(health::health_check))
        .nest_service("/outputs", outputs)
        .with_state(state);

    if let Some(handle) = prometheus {
        // Prometheus metrics endpoint (separate state)
        router = router.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(handle),
        );
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(cors_origins))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}
