//! Monotonic Epoch Tracker
//!
//! Polls an [`EpochSource`] for the latest epoch and notifies observers each
//! time it strictly increases. The first observation is a baseline and does
//! not count as an advance.
//!
//! Between polls the tracker sleeps. While the next validation ceremony is
//! still far away (its start plus `resume_delay` lies in the future) nothing
//! can change, so the tracker sleeps until that deadline instead of polling.
//!
//! ```ignore
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! let tracker = Arc::new(EpochTracker::new(source, EpochTrackerConfig::default()));
//! tracker.register(caching_accessor.clone());
//! tokio::spawn(tracker.clone().run(shutdown_rx));
//! // ...
//! let _ = shutdown_tx.send(true);
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledgerline_core::{Accessor, EpochMarker, EpochSource, LedgerResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Default pause between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default delay after the validation time before polling resumes.
pub const DEFAULT_RESUME_DELAY: Duration = Duration::from_secs(25 * 60);

// ============================================================================
// CLOCK
// ============================================================================

/// Wall-clock source.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// OBSERVERS
// ============================================================================

/// Notified synchronously, once, for every detected epoch advance.
pub trait EpochObserver: Send + Sync {
    fn on_epoch_advance(&self, previous: EpochMarker, current: EpochMarker);
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTrackerConfig {
    pub poll_interval: Duration,
    pub resume_delay: Duration,
}

impl Default for EpochTrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            resume_delay: DEFAULT_RESUME_DELAY,
        }
    }
}

// ============================================================================
// TRACKER
// ============================================================================

/// Result of one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochPoll {
    /// The epoch strictly increased and observers were notified.
    pub advanced: bool,
    /// What was fetched, `None` if the fetch failed.
    pub marker: Option<EpochMarker>,
}

pub struct EpochTracker {
    source: Arc<dyn EpochSource>,
    clock: Arc<dyn Clock>,
    config: EpochTrackerConfig,
    marker: RwLock<Option<EpochMarker>>,
    observers: RwLock<Vec<Arc<dyn EpochObserver>>>,
    advances: AtomicU64,
    poll_errors: AtomicU64,
}

impl EpochTracker {
    pub fn new(source: Arc<dyn EpochSource>, config: EpochTrackerConfig) -> Self {
        Self::with_clock(source, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        source: Arc<dyn EpochSource>,
        clock: Arc<dyn Clock>,
        config: EpochTrackerConfig,
    ) -> Self {
        Self {
            source,
            clock,
            config,
            marker: RwLock::new(None),
            observers: RwLock::new(Vec::new()),
            advances: AtomicU64::new(0),
            poll_errors: AtomicU64::new(0),
        }
    }

    pub fn register(&self, observer: Arc<dyn EpochObserver>) {
        self.observers.write().push(observer);
    }

    pub fn config(&self) -> EpochTrackerConfig {
        self.config
    }

    /// Last observed epoch, `None` before the first successful poll.
    pub fn current(&self) -> Option<EpochMarker> {
        *self.marker.read()
    }

    /// Number of advances detected so far.
    pub fn advances(&self) -> u64 {
        self.advances.load(Ordering::Relaxed)
    }

    pub fn poll_errors(&self) -> u64 {
        self.poll_errors.load(Ordering::Relaxed)
    }

    /// Fetch the latest epoch once. Fetch errors are logged and reported as
    /// "no advance".
    pub async fn poll(&self) -> EpochPoll {
        let latest = match self.source.latest_epoch().await {
            Ok(marker) => marker,
            Err(e) => {
                self.poll_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "Failed to fetch latest epoch");
                return EpochPoll {
                    advanced: false,
                    marker: None,
                };
            }
        };

        let previous = {
            let mut marker = self.marker.write();
            let observed = *marker;
            match observed {
                None => {
                    *marker = Some(latest);
                    tracing::info!(epoch = latest.epoch, "Epoch baseline established");
                    None
                }
                Some(prev) if latest.epoch > prev.epoch => {
                    *marker = Some(latest);
                    Some(prev)
                }
                Some(prev) => {
                    // Same epoch may carry a rescheduled validation time.
                    if latest.epoch == prev.epoch {
                        *marker = Some(latest);
                    }
                    None
                }
            }
        };

        let Some(previous) = previous else {
            return EpochPoll {
                advanced: false,
                marker: Some(latest),
            };
        };

        self.advances.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            previous_epoch = previous.epoch,
            epoch = latest.epoch,
            "Epoch advanced"
        );

        let observers: Vec<Arc<dyn EpochObserver>> = self.observers.read().clone();
        for observer in observers {
            observer.on_epoch_advance(previous, latest);
        }

        EpochPoll {
            advanced: true,
            marker: Some(latest),
        }
    }

    /// How long to sleep before the next poll.
    pub fn next_wake(&self, marker: Option<&EpochMarker>) -> Duration {
        let Some(marker) = marker else {
            return self.config.poll_interval;
        };

        let resume_delay = match chrono::Duration::from_std(self.config.resume_delay) {
            Ok(delay) => delay,
            Err(_) => return self.config.poll_interval,
        };
        let deadline = marker.validation_time + resume_delay;

        match (deadline - self.clock.now()).to_std() {
            Ok(wait) if !wait.is_zero() => wait,
            _ => self.config.poll_interval,
        }
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            resume_delay_secs = self.config.resume_delay.as_secs(),
            "Epoch tracker started"
        );

        let mut wait = if *shutdown.borrow() {
            None
        } else {
            let poll = self.poll().await;
            Some(self.next_wake(poll.marker.as_ref()))
        };

        while let Some(sleep_for) = wait {
            tracing::trace!(wait_secs = sleep_for.as_secs(), "Epoch tracker sleeping");
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        wait = None;
                    }
                }
                _ = tokio::time::sleep(sleep_for) => {
                    let poll = self.poll().await;
                    wait = Some(self.next_wake(poll.marker.as_ref()));
                }
            }
        }

        tracing::info!(advances = self.advances(), "Epoch tracker stopped");
    }
}

impl std::fmt::Debug for EpochTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpochTracker")
            .field("config", &self.config)
            .field("marker", &self.current())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

// ============================================================================
// ACCESSOR ADAPTER
// ============================================================================

/// Reads the latest epoch through `Accessor::last_epoch`.
///
/// Wrap the underlying accessor, not a caching one, or the tracker will keep
/// seeing the cached epoch.
pub struct AccessorEpochSource<A: ?Sized> {
    accessor: Arc<A>,
}

impl<A: ?Sized> AccessorEpochSource<A> {
    pub fn new(accessor: Arc<A>) -> Self {
        Self { accessor }
    }
}

#[async_trait]
impl<A: Accessor + ?Sized> EpochSource for AccessorEpochSource<A> {
    async fn latest_epoch(&self) -> LedgerResult<EpochMarker> {
        let epoch = self.accessor.last_epoch().await?;
        Ok(EpochMarker {
            epoch: epoch.epoch,
            validation_time: epoch.validation_time,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ledgerline_core::LedgerError;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct Script(Mutex<VecDeque<LedgerResult<EpochMarker>>>);

    #[async_trait]
    impl EpochSource for Script {
        async fn latest_epoch(&self) -> LedgerResult<EpochMarker> {
            self.0
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(LedgerError::not_found()))
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct CountingObserver(Mutex<Vec<(u64, u64)>>);

    impl EpochObserver for CountingObserver {
        fn on_epoch_advance(&self, previous: EpochMarker, current: EpochMarker) {
            self.0.lock().push((previous.epoch, current.epoch));
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn marker(epoch: u64) -> EpochMarker {
        EpochMarker {
            epoch,
            validation_time: at(12),
        }
    }

    fn tracker(script: Vec<LedgerResult<EpochMarker>>, now: DateTime<Utc>) -> EpochTracker {
        EpochTracker::with_clock(
            Arc::new(Script(Mutex::new(script.into()))),
            Arc::new(FixedClock(now)),
            EpochTrackerConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_first_poll_is_baseline() {
        let tracker = tracker(vec![Ok(marker(10))], at(0));
        let observer = Arc::new(CountingObserver::default());
        tracker.register(observer.clone());

        let poll = tracker.poll().await;
        assert!(!poll.advanced);
        assert_eq!(tracker.current(), Some(marker(10)));
        assert!(observer.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_only_strict_increase_advances() {
        let tracker = tracker(
            vec![Ok(marker(10)), Ok(marker(10)), Ok(marker(9)), Ok(marker(11))],
            at(0),
        );
        let observer = Arc::new(CountingObserver::default());
        tracker.register(observer.clone());

        assert!(!tracker.poll().await.advanced);
        assert!(!tracker.poll().await.advanced);
        assert!(!tracker.poll().await.advanced);
        assert_eq!(tracker.current().map(|m| m.epoch), Some(10));
        assert!(tracker.poll().await.advanced);

        assert_eq!(*observer.0.lock(), vec![(10, 11)]);
        assert_eq!(tracker.advances(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_an_advance() {
        let tracker = tracker(vec![Ok(marker(10))], at(0));
        tracker.poll().await;

        let poll = tracker.poll().await;
        assert_eq!(
            poll,
            EpochPoll {
                advanced: false,
                marker: None
            }
        );
        assert_eq!(tracker.current(), Some(marker(10)));
        assert_eq!(tracker.poll_errors(), 1);
    }

    #[test]
    fn test_next_wake_sleeps_until_deadline() {
        // Validation at 12:00, resume 25 minutes later, now 11:00.
        let tracker = tracker(vec![], at(11));
        let wait = tracker.next_wake(Some(&marker(10)));
        assert_eq!(wait, Duration::from_secs(85 * 60));
    }

    #[test]
    fn test_next_wake_polls_after_deadline() {
        let tracker = tracker(vec![], at(13));
        assert_eq!(tracker.next_wake(Some(&marker(10))), DEFAULT_POLL_INTERVAL);
        assert_eq!(tracker.next_wake(None), DEFAULT_POLL_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let tracker = Arc::new(tracker(vec![Ok(marker(1))], at(13)));
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(tracker.clone().run(rx));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(tracker.current(), Some(marker(1)));

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
