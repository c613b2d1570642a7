//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    Ok(PrometheusBuilder::new().install_recorder()?)
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "tubely_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "tubely_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "tubely_http_requests_in_flight";

    // Ingestion metrics
    pub const INGEST_STAGE_DURATION_SECONDS: &str = "tubely_ingest_stage_duration_seconds";
    pub const INGEST_FAILURES_TOTAL: &str = "tubely_ingest_failures_total";
    pub const INGEST_COMPLETED_TOTAL: &str = "tubely_ingest_completed_total";
    pub const UPLOAD_BYTES_TOTAL: &str = "tubely_upload_bytes_total";

    // Orphaned objects
    pub const ORPHANED_OBJECTS_TOTAL: &str = "tubely_orphaned_objects_total";
    pub const ORPHANS_SWEPT_TOTAL: &str = "tubely_orphans_swept_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record how long one ingestion stage took.
pub fn record_stage_duration(stage: &str, duration_secs: f64) {
    let labels = [("stage", stage.to_string())];
    histogram!(names::INGEST_STAGE_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an ingestion failure.
pub fn record_ingest_failure(stage: &str, kind: &str) {
    let labels = [("stage", stage.to_string()), ("kind", kind.to_string())];
    counter!(names::INGEST_FAILURES_TOTAL, &labels).increment(1);
}

/// Record a completed ingestion.
pub fn record_ingest_completed(aspect: &str, bytes: u64) {
    let labels = [("aspect", aspect.to_string())];
    counter!(names::INGEST_COMPLETED_TOTAL, &labels).increment(1);
    counter!(names::UPLOAD_BYTES_TOTAL).increment(bytes);
}

/// Record an object left in the store without a referencing record.
pub fn record_orphaned_object() {
    counter!(names::ORPHANED_OBJECTS_TOTAL).increment(1);
}

/// Record objects removed by the sweeper.
pub fn record_orphans_swept(count: u64) {
    counter!(names::ORPHANS_SWEPT_TOTAL).increment(count);
}

/// Metrics middleware for HTTP requests.
///
/// Paths are labelled by their route template so IDs never become label values.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
