//! API middleware.

use std::collections::HashMap;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, HeaderName, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn, Span};
use uuid::Uuid;

use crate::metrics;

/// Per-IP rate limiter using governor.
pub type IpRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Maximum number of IPs to track in rate limiter cache.
const MAX_RATE_LIMITER_ENTRIES: usize = 10_000;

const DEFAULT_RPS: NonZeroU32 = match NonZeroU32::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

/// IP-based rate limiter cache with automatic cleanup.
#[derive(Clone)]
pub struct RateLimiterCache {
    limiters: Arc<RwLock<HashMap<IpAddr, (Arc<IpRateLimiter>, Instant)>>>,
    quota: Quota,
    /// Time-to-live for cached rate limiters
    ttl: Duration,
}

impl RateLimiterCache {
    /// Create a new rate limiter cache. Zero falls back to 10 requests/s.
    pub fn new(requests_per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(DEFAULT_RPS));
        Self {
            limiters: Arc::new(RwLock::new(HashMap::new())),
            quota,
            ttl: Duration::from_secs(3600),
        }
    }

    /// Drop expired limiters, then the oldest ones if still over capacity.
    async fn cleanup_expired(&self) {
        let mut limiters = self.limiters.write().await;
        let now = Instant::now();

        limiters.retain(|_, (_, created_at)| now.duration_since(*created_at) < self.ttl);

        if limiters.len() > MAX_RATE_LIMITER_ENTRIES {
            let mut entries: Vec<_> = limiters.iter().map(|(ip, (_, t))| (*ip, *t)).collect();
            entries.sort_by_key(|(_, t)| *t);

            let to_remove = limiters.len() - MAX_RATE_LIMITER_ENTRIES;
            for (ip, _) in entries.into_iter().take(to_remove) {
                limiters.remove(&ip);
            }
            warn!("Rate limiter cache exceeded capacity, removed {} entries", to_remove);
        }
    }

    /// Get or create a rate limiter for an IP.
    pub async fn get_limiter(&self, ip: IpAddr) -> Arc<IpRateLimiter> {
        {
            let limiters = self.limiters.read().await;
            if let Some((limiter, _)) = limiters.get(&ip) {
                return Arc::clone(limiter);
            }
        }

        let mut limiters = self.limiters.write().await;
        // Double-check after acquiring write lock
        if let Some((limiter, _)) = limiters.get(&ip) {
            return Arc::clone(limiter);
        }

        if limiters.len() >= MAX_RATE_LIMITER_ENTRIES {
            drop(limiters);
            self.cleanup_expired().await;
            limiters = self.limiters.write().await;
        }

        let limiter = Arc::new(RateLimiter::direct(self.quota));
        limiters.insert(ip, (Arc::clone(&limiter), Instant::now()));
        limiter
    }

    /// Check rate limit for an IP.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let limiter = self.get_limiter(ip).await;
        limiter.check().is_ok()
    }
}

/// Create CORS layer.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_headers = [header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN];
    let exposed_headers = [header::CONTENT_LENGTH, header::CONTENT_TYPE];
    let allowed_methods = [Method::GET, Method::POST, Method::OPTIONS];

    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(Any)
            .allow_origin(Any)
            .max_age(Duration::from_secs(600))
    } else {
        // tower-http rejects credentials combined with wildcard headers
        let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_methods(allowed_methods)
            .allow_headers(allowed_headers)
            .expose_headers(exposed_headers)
            .allow_credentials(true)
            .allow_origin(origins)
            .max_age(Duration::from_secs(600))
    }
}

const SECURITY_HEADERS: [(&str, &str); 7] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("x-permitted-cross-domain-policies", "none"),
];

/// Security headers middleware.
pub async fn security_headers(request: Request<Body>, next: Next) -> Response<Body> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    response
}

/// Request ID middleware.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response<Body> {
    let request_id = request
        .headers()
        .get("X-Request-ID")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(request_id.clone());
    Span::current().record("request_id", &request_id);

    let mut response = next.run(request).await;

    if let Ok(header_value) = request_id.parse() {
        response.headers_mut().insert("X-Request-ID", header_value);
    }

    response
}

/// Request logging middleware.
pub async fn request_logging(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let duration = start.elapsed();

    // Skip probe noise
    if !matches!(uri.path(), "/health" | "/healthz" | "/ready" | "/metrics") {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed"
        );
    }

    response
}

/// Per-IP rate limiting for the `/api` routes.
pub async fn rate_limit_middleware(
    State(rate_limiter): State<Arc<RateLimiterCache>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if let Some(ip) = extract_client_ip(&request) {
        if !rate_limiter.check(ip).await {
            warn!(ip = %ip, "Rate limit exceeded");
            metrics::record_rate_limit_hit(request.uri().path());
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", "1")],
                "Rate limit exceeded. Please try again later.",
            )
                .into_response();
        }
    }

    next.run(request).await
}

/// Client IP from proxy headers, falling back to the peer address.
pub fn extract_client_ip(request: &Request<Body>) -> Option<IpAddr> {
    // First hop of X-Forwarded-For is the original client
    if let Some(ip) = request
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse().ok())
    {
        return Some(ip);
    }

    if let Some(ip) = request
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
    {
        return Some(ip);
    }

    request
        .extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|ci| ci.0.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let request = Request::builder()
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("X-Real-IP", "198.51.100.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_client_ip(&request),
            Some("203.0.113.7".parse().unwrap())
        );

        let request = Request::builder()
            .header("X-Real-IP", "198.51.100.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_client_ip(&request),
            Some("198.51.100.1".parse().unwrap())
        );

        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(extract_client_ip(&request), None);
    }

    #[tokio::test]
    async fn test_rate_limiter_blocks_after_quota() {
        let cache = RateLimiterCache::new(2);
        let ip: IpAddr = "192.0.2.1".parse().unwrap();

        assert!(cache.check(ip).await);
        assert!(cache.check(ip).await);
        assert!(!cache.check(ip).await);

        let other: IpAddr = "192.0.2.2".parse().unwrap();
        assert!(cache.check(other).await);
    }
}
