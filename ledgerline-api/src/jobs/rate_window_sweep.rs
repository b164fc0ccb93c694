//! Rate Window Sweep Background Task
//!
//! Rate windows are created on a client's first request and never removed by
//! the request path. This task drops windows that have gone stale so the
//! table stays bounded by the number of recently active clients.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::admission::AdmissionController;
use crate::config::ApiConfig;
use crate::constants::DEFAULT_RATE_SWEEP_INTERVAL_SECS;
use crate::telemetry::metrics as gateway_metrics;

#[derive(Debug, Clone)]
pub struct RateSweepConfig {
    /// How often to sweep (default: 60 seconds)
    pub sweep_interval: Duration,
}

impl Default for RateSweepConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(DEFAULT_RATE_SWEEP_INTERVAL_SECS),
        }
    }
}

impl From<&ApiConfig> for RateSweepConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            sweep_interval: config.rate_sweep_interval,
        }
    }
}

#[derive(Debug, Default)]
pub struct RateSweepMetrics {
    pub sweeps: AtomicU64,
    pub windows_dropped: AtomicU64,
}

impl RateSweepMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> RateSweepSnapshot {
        RateSweepSnapshot {
            sweeps: self.sweeps.load(Ordering::Relaxed),
            windows_dropped: self.windows_dropped.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSweepSnapshot {
    pub sweeps: u64,
    pub windows_dropped: u64,
}

/// Sweep stale rate windows until the shutdown signal fires.
pub async fn rate_window_sweep_task(
    admission: Arc<AdmissionController>,
    config: RateSweepConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) -> Arc<RateSweepMetrics> {
    let metrics = Arc::new(RateSweepMetrics::new());

    let mut sweep_interval = interval(config.sweep_interval);
    sweep_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(
        sweep_interval_secs = config.sweep_interval.as_secs(),
        rate_limit = admission.rate_limit(),
        "Rate window sweep task started"
    );

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    tracing::info!("Rate window sweep task shutting down");
                    break;
                }
            }

            _ = sweep_interval.tick() => {
                let dropped = admission.sweep_rate_windows();
                metrics.sweeps.fetch_add(1, Ordering::Relaxed);
                metrics.windows_dropped.fetch_add(dropped as u64, Ordering::Relaxed);

                let tracked = admission.tracked_clients();
                if dropped > 0 {
                    tracing::debug!(dropped, tracked, "Swept stale rate windows");
                }
                if let Some(m) = gateway_metrics() {
                    m.rate_tracked_clients.set(tracked as f64);
                }
            }
        }
    }

    let snapshot = metrics.snapshot();
    tracing::info!(
        sweeps = snapshot.sweeps,
        windows_dropped = snapshot.windows_dropped,
        "Rate window sweep task completed"
    );

    metrics
}
