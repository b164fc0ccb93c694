//! Background Jobs for the Ledgerline gateway
//!
//! This module contains background tasks that run for the lifetime of the
//! gateway:
//!
//! - `epoch_watch`: runs the epoch tracker, which clears the response cache
//!   whenever a new epoch appears
//! - `cache_report`: purges expired cache slots and reports occupancy
//! - `rate_window_sweep`: drops rate windows of clients that went quiet
//!
//! # Usage
//!
//! `Gateway::start` spawns all of them. To run one by hand:
//!
//! ```ignore
//! use ledgerline_api::jobs::{cache_report_task, CacheReportConfig};
//! use tokio::sync::watch;
//!
//! // Create shutdown signal
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! let registry = Arc::clone(&state.registry);
//! tokio::spawn(cache_report_task(registry, CacheReportConfig::default(), shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod cache_report;
pub mod epoch_watch;
pub mod rate_window_sweep;

// Re-export commonly used types
pub use cache_report::{
    cache_report_task, CacheReportConfig, CacheReportMetrics, CacheReportSnapshot,
};
pub use epoch_watch::{epoch_watch_task, EpochMetricsObserver, EpochWatchSnapshot};
pub use rate_window_sweep::{
    rate_window_sweep_task, RateSweepConfig, RateSweepMetrics, RateSweepSnapshot,
};
