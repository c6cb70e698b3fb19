use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Prometheus metrics scrape endpoint.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the service emits.
pub fn describe() {
    ::metrics::describe_counter!("video_jobs_submitted_total", "Total generation jobs submitted");
    ::metrics::describe_counter!("video_jobs_completed_total", "Total generation jobs completed");
    ::metrics::describe_counter!("video_jobs_failed_total", "Total generation jobs that failed");
    ::metrics::describe_histogram!("video_render_seconds", "Time spent rendering one job");
    ::metrics::describe_gauge!("video_queue_depth", "Jobs waiting in the queued state");
}
