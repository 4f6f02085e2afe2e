//! Prometheus metrics for the API server.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "mwatch_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "mwatch_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "mwatch_http_requests_in_flight";

    // Stream metrics
    pub const STREAM_CONNECTIONS_TOTAL: &str = "mwatch_stream_connections_total";
    pub const STREAM_CLIENTS_ACTIVE: &str = "mwatch_stream_clients_active";
    pub const FRAMES_STREAMED_TOTAL: &str = "mwatch_frames_streamed_total";
    pub const ENCODE_FAILURES_TOTAL: &str = "mwatch_encode_failures_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", route_label(path).to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a new stream client and the resulting client count.
pub fn record_stream_connected(active: u64) {
    counter!(names::STREAM_CONNECTIONS_TOTAL).increment(1);
    gauge!(names::STREAM_CLIENTS_ACTIVE).set(active as f64);
}

pub fn set_stream_clients(active: u64) {
    gauge!(names::STREAM_CLIENTS_ACTIVE).set(active as f64);
}

pub fn record_frame_streamed(bytes: usize) {
    counter!(names::FRAMES_STREAMED_TOTAL).increment(1);
    histogram!("mwatch_streamed_frame_bytes").record(bytes as f64);
}

pub fn record_encode_failure() {
    counter!(names::ENCODE_FAILURES_TOTAL).increment(1);
}

/// Collapse paths onto the known routes so unknown URLs don't create
/// unbounded label values.
fn route_label(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/video_feed" => "/video_feed",
        "/snapshot" => "/snapshot",
        "/status" => "/status",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "other",
    }
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
