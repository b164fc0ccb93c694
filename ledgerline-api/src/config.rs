//! API Configuration Module
//!
//! Admission, cache, epoch tracking and upstream settings for the gateway.
//! Configuration is loaded from environment variables with defaults taken
//! from [`crate::constants`].

use std::time::Duration;

use ledgerline_core::ConfigError;
use ledgerline_storage::{CachePolicyTable, EpochTrackerConfig, OperationCachePolicy};

use crate::constants::*;

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Admission
    // ========================================================================
    /// Size of the standard lane.
    pub max_req_count: usize,

    /// Longest a request waits for a lane slot before it is turned away.
    pub admission_timeout: Duration,

    /// Per-client ceiling per rolling minute. `0` disables the check.
    pub reqs_per_minute_limit: u32,

    /// Length of one rate sub-window; two of them make up the rolling window.
    pub rate_window: Duration,

    /// Regexes matched against the lower-cased path to select the heavy lane.
    pub heavy_route_patterns: Vec<String>,

    /// How often idle rate windows are dropped.
    pub rate_sweep_interval: Duration,

    // ========================================================================
    // Cache
    // ========================================================================
    pub cache_default_capacity: usize,
    pub cache_default_ttl: Duration,
    pub cache_permanent_ttl: Duration,

    /// Raw `Op=capacity:ttl_secs` / `Op=bypass` overrides, comma-separated.
    pub cache_overrides: String,

    pub cache_report_interval: Duration,

    // ========================================================================
    // Epoch tracking
    // ========================================================================
    pub epoch_poll_interval: Duration,
    pub epoch_resume_delay: Duration,

    // ========================================================================
    // CORS / upstream
    // ========================================================================
    /// Permissive CORS layer on all routes.
    pub cors_enabled: bool,

    /// Base URL of the upstream indexer (mempool reads). `None` disables them.
    pub indexer_url: Option<String>,

    pub indexer_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            max_req_count: DEFAULT_MAX_REQ_COUNT,
            admission_timeout: Duration::from_secs(DEFAULT_ADMISSION_TIMEOUT_SECS),
            reqs_per_minute_limit: DEFAULT_REQS_PER_MINUTE_LIMIT,
            rate_window: Duration::from_secs(DEFAULT_RATE_WINDOW_SECS),
            heavy_route_patterns: split_list(DEFAULT_HEAVY_ROUTE_PATTERNS),
            rate_sweep_interval: Duration::from_secs(DEFAULT_RATE_SWEEP_INTERVAL_SECS),

            cache_default_capacity: DEFAULT_CACHE_CAPACITY,
            cache_default_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            cache_permanent_ttl: Duration::from_secs(DEFAULT_CACHE_PERMANENT_TTL_SECS),
            cache_overrides: String::new(),
            cache_report_interval: Duration::from_secs(DEFAULT_CACHE_REPORT_INTERVAL_SECS),

            epoch_poll_interval: Duration::from_secs(DEFAULT_EPOCH_POLL_INTERVAL_SECS),
            epoch_resume_delay: Duration::from_secs(DEFAULT_EPOCH_RESUME_DELAY_SECS),

            cors_enabled: true,
            indexer_url: None,
            indexer_timeout: Duration::from_secs(DEFAULT_INDEXER_TIMEOUT_SECS),
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `LEDGERLINE_MAX_REQ_COUNT`: Standard lane size (default: 50)
    /// - `LEDGERLINE_ADMISSION_TIMEOUT_SECS`: Max wait for a slot (default: 60)
    /// - `LEDGERLINE_REQS_PER_MINUTE_LIMIT`: Per-client ceiling, 0 disables (default: 0)
    /// - `LEDGERLINE_RATE_WINDOW_SECS`: Rate sub-window length (default: 30)
    /// - `LEDGERLINE_HEAVY_ROUTE_PATTERNS`: Comma-separated regexes (default: `(?i)/adjacentflips$`)
    /// - `LEDGERLINE_RATE_SWEEP_INTERVAL_SECS`: Rate window sweep interval (default: 60)
    /// - `LEDGERLINE_CACHE_DEFAULT_CAPACITY`: Default store capacity (default: 100)
    /// - `LEDGERLINE_CACHE_DEFAULT_TTL_SECS`: Default TTL (default: 60)
    /// - `LEDGERLINE_CACHE_PERMANENT_TTL_SECS`: Epoch-scoped TTL (default: 7200)
    /// - `LEDGERLINE_CACHE_OVERRIDES`: Per-operation overrides (default: empty)
    /// - `LEDGERLINE_CACHE_REPORT_INTERVAL_SECS`: Cache report interval (default: 60)
    /// - `LEDGERLINE_EPOCH_POLL_INTERVAL_SECS`: Epoch poll interval (default: 5)
    /// - `LEDGERLINE_EPOCH_RESUME_DELAY_SECS`: Delay past validation time (default: 1500)
    /// - `LEDGERLINE_CORS_ENABLED`: "true" or "false" (default: true)
    /// - `LEDGERLINE_INDEXER_URL`: Upstream indexer base URL (default: unset)
    /// - `LEDGERLINE_INDEXER_TIMEOUT_SECS`: Upstream request timeout (default: 30)
    pub fn from_env() -> Self {
        let max_req_count = env_parse("LEDGERLINE_MAX_REQ_COUNT").unwrap_or(DEFAULT_MAX_REQ_COUNT);

        let heavy_route_patterns = std::env::var("LEDGERLINE_HEAVY_ROUTE_PATTERNS")
            .ok()
            .map(|s| split_list(&s))
            .unwrap_or_else(|| split_list(DEFAULT_HEAVY_ROUTE_PATTERNS));

        let cache_overrides = std::env::var("LEDGERLINE_CACHE_OVERRIDES").unwrap_or_default();

        let cors_enabled = std::env::var("LEDGERLINE_CORS_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        let indexer_url = std::env::var("LEDGERLINE_INDEXER_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty());

        Self {
            max_req_count,
            admission_timeout: env_secs(
                "LEDGERLINE_ADMISSION_TIMEOUT_SECS",
                DEFAULT_ADMISSION_TIMEOUT_SECS,
            ),
            reqs_per_minute_limit: env_parse("LEDGERLINE_REQS_PER_MINUTE_LIMIT")
                .unwrap_or(DEFAULT_REQS_PER_MINUTE_LIMIT),
            rate_window: env_secs("LEDGERLINE_RATE_WINDOW_SECS", DEFAULT_RATE_WINDOW_SECS),
            heavy_route_patterns,
            rate_sweep_interval: env_secs(
                "LEDGERLINE_RATE_SWEEP_INTERVAL_SECS",
                DEFAULT_RATE_SWEEP_INTERVAL_SECS,
            ),

            cache_default_capacity: env_parse("LEDGERLINE_CACHE_DEFAULT_CAPACITY")
                .unwrap_or(DEFAULT_CACHE_CAPACITY),
            cache_default_ttl: env_secs("LEDGERLINE_CACHE_DEFAULT_TTL_SECS", DEFAULT_CACHE_TTL_SECS),
            cache_permanent_ttl: env_secs(
                "LEDGERLINE_CACHE_PERMANENT_TTL_SECS",
                DEFAULT_CACHE_PERMANENT_TTL_SECS,
            ),
            cache_overrides,
            cache_report_interval: env_secs(
                "LEDGERLINE_CACHE_REPORT_INTERVAL_SECS",
                DEFAULT_CACHE_REPORT_INTERVAL_SECS,
            ),

            epoch_poll_interval: env_secs(
                "LEDGERLINE_EPOCH_POLL_INTERVAL_SECS",
                DEFAULT_EPOCH_POLL_INTERVAL_SECS,
            ),
            epoch_resume_delay: env_secs(
                "LEDGERLINE_EPOCH_RESUME_DELAY_SECS",
                DEFAULT_EPOCH_RESUME_DELAY_SECS,
            ),

            cors_enabled,
            indexer_url,
            indexer_timeout: env_secs(
                "LEDGERLINE_INDEXER_TIMEOUT_SECS",
                DEFAULT_INDEXER_TIMEOUT_SECS,
            ),
        }
    }

    /// Reject values that would stall or disable part of the gateway: an
    /// empty standard lane, a zero-length rate sub-window, or a zero period
    /// for any of the background loops.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_req_count == 0 {
            return Err(invalid("max_req_count", "0", "standard lane needs at least one slot"));
        }

        for (field, value) in [
            ("rate_window", self.rate_window),
            ("rate_sweep_interval", self.rate_sweep_interval),
            ("cache_report_interval", self.cache_report_interval),
            ("epoch_poll_interval", self.epoch_poll_interval),
        ] {
            if value.is_zero() {
                return Err(invalid(field, "0", "must be at least one second"));
            }
        }
        Ok(())
    }

    /// Build the cache policy table: standard table with the configured
    /// defaults, then the per-operation overrides on top.
    pub fn cache_policies(&self) -> Result<CachePolicyTable, ConfigError> {
        let mut table = CachePolicyTable::standard_with(
            OperationCachePolicy::new(self.cache_default_capacity, self.cache_default_ttl),
            self.cache_permanent_ttl,
        );
        table.apply_overrides(&self.cache_overrides)?;
        Ok(table)
    }

    pub fn epoch_tracker(&self) -> EpochTrackerConfig {
        EpochTrackerConfig {
            poll_interval: self.epoch_poll_interval,
            resume_delay: self.epoch_resume_delay,
        }
    }

    /// Whether per-client rate limiting is active.
    pub fn rate_limit_enabled(&self) -> bool {
        self.reqs_per_minute_limit > 0
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(env_parse(key).unwrap_or(default))
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
