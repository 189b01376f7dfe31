//! Prometheus metrics for the API server.

use std::sync::LazyLock;
use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use regex::Regex;

/// Install the Prometheus recorder and return a handle for rendering.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "frametag_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "frametag_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "frametag_http_requests_in_flight";

    // Analysis metrics
    pub const ANALYSES_TOTAL: &str = "frametag_analyses_total";
    pub const ANALYSIS_DURATION_SECONDS: &str = "frametag_analysis_duration_seconds";
    pub const PROVIDER_CALL_DURATION_SECONDS: &str = "frametag_provider_call_duration_seconds";
    pub const FRAMES_CAPTURED_TOTAL: &str = "frametag_frames_captured_total";

    // Session metrics
    pub const SESSIONS_IN_FLIGHT: &str = "frametag_sessions_in_flight";
    pub const ABORTS_TOTAL: &str = "frametag_aborts_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "frametag_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished analysis. `outcome` is completed, cancelled, rejected or failed.
pub fn record_analysis(provider: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("provider", provider.to_string()),
        ("outcome", outcome.to_string()),
    ];
    counter!(names::ANALYSES_TOTAL, &labels).increment(1);
    histogram!(names::ANALYSIS_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_provider_call(provider: &str, outcome: &str, duration_secs: f64) {
    let labels = [
        ("provider", provider.to_string()),
        ("outcome", outcome.to_string()),
    ];
    histogram!(names::PROVIDER_CALL_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_frames_captured(provider: &str, count: usize) {
    let labels = [("provider", provider.to_string())];
    counter!(names::FRAMES_CAPTURED_TOTAL, &labels).increment(count as u64);
}

/// Update the in-flight sessions gauge.
pub fn set_sessions_in_flight(count: usize) {
    gauge!(names::SESSIONS_IN_FLIGHT).set(count as f64);
}

/// Record an abort request and whether it hit a live session.
pub fn record_abort(found: bool) {
    let labels = [("found", found.to_string())];
    counter!(names::ABORTS_TOTAL, &labels).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});
static NUMERIC_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/[0-9]+(/|$)").unwrap());

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, ":id");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/:id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);
    // Decrement even when the handler future is dropped mid-request
    let _in_flight = scopeguard::guard((), |_| {
        gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);
    });

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/api/analyze"), "/api/analyze");
        assert_eq!(
            sanitize_path("/api/sessions/550e8400-e29b-41d4-a716-446655440000"),
            "/api/sessions/:id"
        );
        assert_eq!(sanitize_path("/api/items/42/frames"), "/api/items/:id/frames");
    }
}
