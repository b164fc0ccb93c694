//! Cache Report Background Task
//!
//! Periodically purges expired slots from every response store, logs the
//! registry occupancy at debug level and exports it to Prometheus.
//!
//! ```text
//! Cache report: Total: 42, empty: 37 (Epoch: 12, LastBlock: 1, ...)
//! ```

use ledgerline_storage::{CacheRegistry, CacheReport};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::ApiConfig;
use crate::constants::DEFAULT_CACHE_REPORT_INTERVAL_SECS;
use crate::telemetry::metrics as gateway_metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct CacheReportConfig {
    /// How often to purge and report (default: 60 seconds)
    pub report_interval: Duration,
}

impl Default for CacheReportConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(DEFAULT_CACHE_REPORT_INTERVAL_SECS),
        }
    }
}

impl From<&ApiConfig> for CacheReportConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            report_interval: config.cache_report_interval,
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

#[derive(Debug, Default)]
pub struct CacheReportMetrics {
    /// Reports produced since startup
    pub reports: AtomicU64,

    /// Expired slots purged since startup
    pub purged_entries: AtomicU64,
}

impl CacheReportMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> CacheReportSnapshot {
        CacheReportSnapshot {
            reports: self.reports.load(Ordering::Relaxed),
            purged_entries: self.purged_entries.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheReportSnapshot {
    pub reports: u64,
    pub purged_entries: u64,
}

// ============================================================================
// BACKGROUND TASK
// ============================================================================

/// Purge and report until the shutdown signal fires.
pub async fn cache_report_task(
    registry: Arc<CacheRegistry>,
    config: CacheReportConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<CacheReportMetrics> {
    let metrics = Arc::new(CacheReportMetrics::new());

    let mut report_interval = interval(config.report_interval);
    report_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        report_interval_secs = config.report_interval.as_secs(),
        "Cache report task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Cache report task shutting down");
                    break;
                }
            }

            _ = report_interval.tick() => {
                report_once(&registry, &metrics);
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        reports = snapshot.reports,
        purged_entries = snapshot.purged_entries,
        "Cache report task completed"
    );

    metrics
}

/// One purge-and-report cycle.
pub(crate) fn report_once(registry: &CacheRegistry, metrics: &CacheReportMetrics) -> CacheReport {
    let purged = registry.purge_expired();
    metrics.reports.fetch_add(1, Ordering::Relaxed);
    metrics
        .purged_entries
        .fetch_add(purged as u64, Ordering::Relaxed);

    let snapshot = registry.snapshot();
    let report = CacheReport::from_snapshot(&snapshot);
    tracing::debug!(purged, "Cache report: {}", report);

    if let Some(m) = gateway_metrics() {
        m.record_cache_snapshot(&snapshot);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::{LedgerResult, Operation};
    use ledgerline_storage::{CacheEntry, CacheKey, CachePolicyTable, OperationCachePolicy};

    #[test]
    fn test_report_counts_occupied_stores() {
        let registry = CacheRegistry::new(CachePolicyTable::new(OperationCachePolicy::default()));
        let store = registry.get_or_create(Operation::Epoch);
        let result: LedgerResult<u64> = Ok(5);
        store.insert(
            CacheKey::new(Operation::Epoch).push(&5u64),
            CacheEntry::from_result(&result),
        );
        registry.get_or_create(Operation::LastBlock);

        let metrics = CacheReportMetrics::new();
        let report = report_once(&registry, &metrics);

        assert_eq!(report.total_stores, 2);
        assert_eq!(report.empty_stores, 1);
        assert_eq!(report.occupied, vec![(Operation::Epoch, 1)]);
        assert_eq!(metrics.snapshot().reports, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_reports_until_shutdown() {
        let registry = Arc::new(CacheRegistry::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(cache_report_task(
            registry,
            CacheReportConfig {
                report_interval: Duration::from_secs(10),
            },
            shutdown_rx,
        ));

        // First tick fires immediately, then at 10s and 20s.
        tokio::time::sleep(Duration::from_secs(25)).await;
        shutdown_tx.send(true).unwrap();

        let metrics = handle.await.unwrap();
        assert_eq!(metrics.snapshot().reports, 3);
    }
}
