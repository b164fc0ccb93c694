//! Prometheus Metrics Definitions
//!
//! Defines all gateway metrics with their labels and types.
//! Exposes a /metrics endpoint for Prometheus scraping.

use axum::{http::StatusCode, response::IntoResponse};
use ledgerline_storage::StoreStats;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram_vec, Counter, CounterVec, Encoder, Gauge, GaugeVec, HistogramVec,
    TextEncoder,
};

use crate::error::{ApiError, ApiResult};

/// HTTP request latency buckets (seconds)
/// Covers: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s
const HTTP_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0,
];

/// Admission wait buckets (seconds), up to the default admission timeout.
const ADMISSION_WAIT_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.010, 0.050, 0.100, 0.500, 1.0, 5.0, 15.0, 30.0, 60.0,
];

/// Global metrics instance - initialized once at startup
pub static METRICS: Lazy<ApiResult<GatewayMetrics>> = Lazy::new(GatewayMetrics::new);

/// The registered metrics, or `None` if registration failed.
pub fn metrics() -> Option<&'static GatewayMetrics> {
    METRICS.as_ref().ok()
}

/// Container for all gateway metrics.
#[derive(Clone)]
pub struct GatewayMetrics {
    /// HTTP request counter - labels: method, path, status
    pub http_requests_total: CounterVec,

    /// HTTP request duration histogram - labels: method, path
    pub http_request_duration_seconds: HistogramVec,

    /// Admission outcomes - labels: lane, outcome (admitted/rate_limited/overloaded)
    pub admission_outcomes_total: CounterVec,

    /// Time spent waiting for a lane slot - labels: lane
    pub admission_wait_seconds: HistogramVec,

    /// Slots currently held - labels: lane
    pub admission_in_flight: GaugeVec,

    /// Clients with a live rate window
    pub rate_tracked_clients: Gauge,

    /// Entries per store - labels: operation
    pub cache_entries: GaugeVec,

    /// Cumulative store hits since the store was created - labels: operation
    pub cache_hits: GaugeVec,

    /// Cumulative store misses - labels: operation
    pub cache_misses: GaugeVec,

    /// Cumulative capacity evictions - labels: operation
    pub cache_evictions: GaugeVec,

    /// Whole-cache clears triggered by a new epoch
    pub epoch_clears_total: Counter,

    /// Latest observed epoch
    pub current_epoch: Gauge,
}

impl GatewayMetrics {
    /// Create and register all metrics with Prometheus.
    pub fn new() -> ApiResult<Self> {
        Ok(Self {
            http_requests_total: register_counter_vec!(
                "ledgerline_http_requests_total",
                "Total number of HTTP requests",
                &["method", "path", "status"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_requests_total: {}", e)))?,

            http_request_duration_seconds: register_histogram_vec!(
                "ledgerline_http_request_duration_seconds",
                "HTTP request duration in seconds",
                &["method", "path"],
                HTTP_LATENCY_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register http_request_duration_seconds: {}", e)))?,

            admission_outcomes_total: register_counter_vec!(
                "ledgerline_admission_outcomes_total",
                "Admission decisions by lane and outcome",
                &["lane", "outcome"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register admission_outcomes_total: {}", e)))?,

            admission_wait_seconds: register_histogram_vec!(
                "ledgerline_admission_wait_seconds",
                "Time spent waiting for an admission slot in seconds",
                &["lane"],
                ADMISSION_WAIT_BUCKETS.to_vec()
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register admission_wait_seconds: {}", e)))?,

            admission_in_flight: register_gauge_vec!(
                "ledgerline_admission_in_flight",
                "Admission slots currently held",
                &["lane"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register admission_in_flight: {}", e)))?,

            rate_tracked_clients: register_gauge!(
                "ledgerline_rate_tracked_clients",
                "Clients with a live rate window"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register rate_tracked_clients: {}", e)))?,

            cache_entries: register_gauge_vec!(
                "ledgerline_cache_entries",
                "Entries held per operation store",
                &["operation"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_entries: {}", e)))?,

            cache_hits: register_gauge_vec!(
                "ledgerline_cache_hits",
                "Cache hits per operation store",
                &["operation"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_hits: {}", e)))?,

            cache_misses: register_gauge_vec!(
                "ledgerline_cache_misses",
                "Cache misses per operation store",
                &["operation"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_misses: {}", e)))?,

            cache_evictions: register_gauge_vec!(
                "ledgerline_cache_evictions",
                "Live entries evicted by capacity pressure per operation store",
                &["operation"]
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register cache_evictions: {}", e)))?,

            epoch_clears_total: register_counter!(
                "ledgerline_epoch_clears_total",
                "Cache clears triggered by a new epoch"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register epoch_clears_total: {}", e)))?,

            current_epoch: register_gauge!(
                "ledgerline_current_epoch",
                "Latest observed epoch"
            )
            .map_err(|e| ApiError::internal_error(format!("Failed to register current_epoch: {}", e)))?,
        })
    }

    /// Record an HTTP request.
    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status_str = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, &status_str])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    /// Record an admission decision.
    pub fn record_admission(&self, lane: &str, outcome: &str) {
        self.admission_outcomes_total
            .with_label_values(&[lane, outcome])
            .inc();
    }

    /// Export a registry snapshot. Stores that were dropped by a clear keep
    /// reporting through their replacement.
    pub fn record_cache_snapshot(&self, snapshot: &[StoreStats]) {
        for stats in snapshot {
            let op = stats.operation.as_str();
            self.cache_entries
                .with_label_values(&[op])
                .set(stats.entries as f64);
            self.cache_hits.with_label_values(&[op]).set(stats.hits as f64);
            self.cache_misses
                .with_label_values(&[op])
                .set(stats.misses as f64);
            self.cache_evictions
                .with_label_values(&[op])
                .set(stats.evictions as f64);
        }
    }

    /// Record a new epoch.
    pub fn record_epoch_advance(&self, epoch: u64) {
        self.epoch_clears_total.inc();
        self.current_epoch.set(epoch as f64);
    }
}

/// Handler for GET /metrics endpoint.
///
/// Returns Prometheus text format metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain")],
                format!("Failed to encode metrics: {}", e).into_bytes(),
            )
        }
    }
}
