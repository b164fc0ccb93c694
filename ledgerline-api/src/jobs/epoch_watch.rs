//! Epoch Watch Background Task
//!
//! Drives the [`EpochTracker`] poll loop. The tracker itself notifies its
//! observers (the caching accessor clears the cache); this module adds an
//! observer that exports each advance to Prometheus.

use ledgerline_core::EpochMarker;
use ledgerline_storage::{EpochObserver, EpochTracker};
use std::sync::Arc;
use tokio::sync::watch;

use crate::telemetry::metrics;

/// Logs each advance and records it in the gateway metrics.
#[derive(Debug, Default, Clone, Copy)]
pub struct EpochMetricsObserver;

impl EpochObserver for EpochMetricsObserver {
    fn on_epoch_advance(&self, previous: EpochMarker, current: EpochMarker) {
        tracing::info!(
            previous = previous.epoch,
            current = current.epoch,
            "New epoch observed, response cache cleared"
        );
        if let Some(m) = metrics() {
            m.record_epoch_advance(current.epoch);
        }
    }
}

/// Tracker state when the task stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochWatchSnapshot {
    pub epoch: Option<u64>,
    pub advances: u64,
    pub poll_errors: u64,
}

/// Run the tracker until the shutdown signal fires.
pub async fn epoch_watch_task(
    tracker: Arc<EpochTracker>,
    shutdown_rx: watch::Receiver<bool>,
) -> EpochWatchSnapshot {
    tracing::info!("Epoch watch task started");

    Arc::clone(&tracker).run(shutdown_rx).await;

    let snapshot = EpochWatchSnapshot {
        epoch: tracker.current().map(|m| m.epoch),
        advances: tracker.advances(),
        poll_errors: tracker.poll_errors(),
    };
    tracing::info!(
        epoch = ?snapshot.epoch,
        advances = snapshot.advances,
        poll_errors = snapshot.poll_errors,
        "Epoch watch task completed"
    );
    snapshot
}
