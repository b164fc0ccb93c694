//! Axum Middleware for HTTP Request Tracing and Metrics
//!
//! Wraps every request in a tracing span and records its latency under a
//! normalized path.

use axum::{extract::Request, middleware::Next, response::Response};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Instant;
use tracing::{info_span, Instrument};

use super::metrics::metrics;

/// UUID pattern: 8-4-4-4-12 hex chars
static UUID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .ok()
});

/// Hex hashes and addresses
static HEX_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"/0[xX][0-9a-fA-F]+(/|$)").ok());

/// Numeric IDs: epochs, heights, upgrades
static ID_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Normalize path for metrics/spans (replace IDs and hashes with placeholders).
///
/// This prevents high-cardinality label explosion in Prometheus.
pub fn normalize_path(path: &str) -> String {
    let mut result = path.to_string();
    if let Some(re) = UUID_PATTERN.as_ref() {
        result = re.replace_all(&result, "{id}").into_owned();
    }
    // Each pass can miss adjacent segments sharing a slash, hence the loop.
    for (pattern, replacement) in [(&*HEX_PATTERN, "/{hash}$1"), (&*ID_PATTERN, "/{id}$1")] {
        if let Some(re) = pattern.as_ref() {
            while re.is_match(&result) {
                result = re.replace_all(&result, replacement).into_owned();
            }
        }
    }
    result
}

/// Observability middleware for Axum.
///
/// This middleware wraps every request with:
/// 1. A tracing span
/// 2. Prometheus metrics recording
/// 3. Request completion logging
pub async fn observability_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let normalized_path = normalize_path(&path);

    let span = info_span!(
        "http_request",
        http.method = %method,
        http.target = %path,
        http.route = %normalized_path,
    );

    let response = next.run(request).instrument(span).await;

    let duration = start.elapsed();
    let status = response.status();

    if let Some(m) = metrics() {
        m.record_http_request(
            method.as_str(),
            &normalized_path,
            status.as_u16(),
            duration.as_secs_f64(),
        );
    }

    tracing::info!(
        method = %method,
        path = %normalized_path,
        status = status.as_u16(),
        duration_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        "Request completed"
    );

    response
}
