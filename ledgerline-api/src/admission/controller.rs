//! Admission Controller
//!
//! Decides whether a request may start real work. Two checks run in order:
//!
//! 1. Rate check: the caller's rolling window is incremented and compared to
//!    the per-client ceiling. Never blocks.
//! 2. Lane acquisition: one slot from the route's lane, waiting at most
//!    `admission_timeout`.
//!
//! A rejected request holds no slot. An admitted request holds a [`Ticket`]
//! whose slot goes back to the lane when the ticket is released or dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ledgerline_core::ConfigError;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

use super::classifier::{AdmissionLane, RouteClassifier};
use super::rate_window::{ClientId, RateLimiter};
use crate::config::ApiConfig;
use crate::constants::HEAVY_LANE_CAPACITY;
use crate::telemetry::metrics::metrics;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Size of the standard lane.
    pub max_req_count: usize,
    pub admission_timeout: Duration,
    /// Per-client ceiling per rolling minute, `0` disables it.
    pub reqs_per_minute_limit: u32,
    /// One of the two sub-windows making up the rolling minute.
    pub rate_window: Duration,
}

impl From<&ApiConfig> for AdmissionConfig {
    fn from(config: &ApiConfig) -> Self {
        Self {
            max_req_count: config.max_req_count,
            admission_timeout: config.admission_timeout,
            reqs_per_minute_limit: config.reqs_per_minute_limit,
            rate_window: config.rate_window,
        }
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self::from(&ApiConfig::default())
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    /// The caller exceeded its request ceiling.
    #[error("Request number limit exceeded")]
    RateLimitExceeded { retry_after: Duration },

    /// No slot in the lane freed up in time.
    #[error("Service is overloaded ({lane} lane)")]
    Overloaded { lane: AdmissionLane },
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::RateLimitExceeded { .. } => "rate_limited",
            Rejection::Overloaded { .. } => "overloaded",
        }
    }
}

/// Proof of admission. Holds one slot of its lane until released or dropped.
#[derive(Debug)]
pub struct Ticket {
    lane: AdmissionLane,
    admitted_at: Instant,
    _permit: OwnedSemaphorePermit,
}

impl Ticket {
    pub fn lane(&self) -> AdmissionLane {
        self.lane
    }

    /// Time spent holding the slot so far.
    pub fn held_for(&self) -> Duration {
        self.admitted_at.elapsed()
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        if let Some(m) = metrics() {
            m.admission_in_flight
                .with_label_values(&[self.lane.as_str()])
                .dec();
        }
    }
}

// ============================================================================
// STATISTICS
// ============================================================================

#[derive(Debug, Default)]
pub struct AdmissionStats {
    pub admitted: AtomicU64,
    pub rate_limited: AtomicU64,
    pub overloaded: AtomicU64,
}

impl AdmissionStats {
    pub fn snapshot(&self) -> AdmissionSnapshot {
        AdmissionSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            overloaded: self.overloaded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionSnapshot {
    pub admitted: u64,
    pub rate_limited: u64,
    pub overloaded: u64,
}

// ============================================================================
// CONTROLLER
// ============================================================================

#[derive(Debug)]
pub struct AdmissionController {
    classifier: RouteClassifier,
    standard: Arc<Semaphore>,
    heavy: Arc<Semaphore>,
    max_req_count: usize,
    admission_timeout: Duration,
    rate: RateLimiter,
    stats: AdmissionStats,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig, classifier: RouteClassifier) -> Self {
        Self {
            classifier,
            standard: Arc::new(Semaphore::new(config.max_req_count)),
            heavy: Arc::new(Semaphore::new(HEAVY_LANE_CAPACITY)),
            max_req_count: config.max_req_count,
            admission_timeout: config.admission_timeout,
            rate: RateLimiter::new(config.reqs_per_minute_limit, config.rate_window),
            stats: AdmissionStats::default(),
        }
    }

    /// Build from the gateway configuration, compiling the heavy route
    /// patterns.
    pub fn from_config(config: &ApiConfig) -> Result<Self, ConfigError> {
        let classifier = RouteClassifier::new(&config.heavy_route_patterns)?;
        Ok(Self::new(AdmissionConfig::from(config), classifier))
    }

    pub fn classify(&self, route: &str) -> AdmissionLane {
        self.classifier.classify(route)
    }

    /// Admit a request from `client` for `route`.
    pub async fn admit(&self, client: &ClientId, route: &str) -> Result<Ticket, Rejection> {
        let lane = self.classify(route);

        if let Err(retry_after) = self.rate.check(client) {
            return Err(self.reject(lane, Rejection::RateLimitExceeded { retry_after }));
        }

        let started = Instant::now();
        let semaphore = self.lane(lane).clone();
        let permit = match tokio::time::timeout(self.admission_timeout, semaphore.acquire_owned())
            .await
        {
            Ok(Ok(permit)) => permit,
            // Elapsed, or the lane was closed.
            _ => return Err(self.reject(lane, Rejection::Overloaded { lane })),
        };

        self.stats.admitted.fetch_add(1, Ordering::Relaxed);
        if let Some(m) = metrics() {
            m.record_admission(lane.as_str(), "admitted");
            m.admission_wait_seconds
                .with_label_values(&[lane.as_str()])
                .observe(started.elapsed().as_secs_f64());
            m.admission_in_flight
                .with_label_values(&[lane.as_str()])
                .inc();
        }

        Ok(Ticket {
            lane,
            admitted_at: Instant::now(),
            _permit: permit,
        })
    }

    /// Return the ticket's slot to its lane.
    pub fn release(&self, ticket: Ticket) {
        tracing::trace!(
            lane = %ticket.lane(),
            held_ms = u64::try_from(ticket.held_for().as_millis()).unwrap_or(u64::MAX),
            "Admission slot released"
        );
        drop(ticket);
    }

    /// Slots currently held in `lane`.
    pub fn in_flight(&self, lane: AdmissionLane) -> usize {
        self.capacity(lane)
            .saturating_sub(self.lane(lane).available_permits())
    }

    pub fn capacity(&self, lane: AdmissionLane) -> usize {
        match lane {
            AdmissionLane::Standard => self.max_req_count,
            AdmissionLane::HeavyLookup => HEAVY_LANE_CAPACITY,
        }
    }

    /// Drop idle rate windows. Returns how many were removed.
    pub fn sweep_rate_windows(&self) -> usize {
        self.rate.sweep()
    }

    pub fn tracked_clients(&self) -> usize {
        self.rate.tracked_clients()
    }

    pub fn rate_limit(&self) -> u32 {
        self.rate.limit()
    }

    pub fn stats(&self) -> AdmissionSnapshot {
        self.stats.snapshot()
    }

    fn lane(&self, lane: AdmissionLane) -> &Arc<Semaphore> {
        match lane {
            AdmissionLane::Standard => &self.standard,
            AdmissionLane::HeavyLookup => &self.heavy,
        }
    }

    fn reject(&self, lane: AdmissionLane, rejection: Rejection) -> Rejection {
        let counter = match rejection {
            Rejection::RateLimitExceeded { .. } => &self.stats.rate_limited,
            Rejection::Overloaded { .. } => &self.stats.overloaded,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Some(m) = metrics() {
            m.record_admission(lane.as_str(), rejection.reason());
        }
        rejection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::DEFAULT_HEAVY_ROUTE_PATTERNS;

    const STANDARD_ROUTE: &str = "/api/epoch/5";
    const HEAVY_ROUTE: &str = "/api/flip/0xf1/epoch/adjacentflips";

    fn controller(max_req_count: usize, timeout: Duration, limit: u32) -> Arc<AdmissionController> {
        let classifier =
            RouteClassifier::new(&[DEFAULT_HEAVY_ROUTE_PATTERNS]).expect("default pattern");
        Arc::new(AdmissionController::new(
            AdmissionConfig {
                max_req_count,
                admission_timeout: timeout,
                reqs_per_minute_limit: limit,
                rate_window: Duration::from_secs(30),
            },
            classifier,
        ))
    }

    fn client() -> ClientId {
        ClientId::from("192.0.2.7")
    }

    #[tokio::test(start_paused = true)]
    async fn test_standard_lane_ceiling() {
        let admission = controller(2, Duration::from_millis(50), 0);

        let a = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();
        let b = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();
        assert_eq!(admission.in_flight(AdmissionLane::Standard), 2);

        let third = admission.admit(&client(), STANDARD_ROUTE).await;
        assert_eq!(
            third.unwrap_err(),
            Rejection::Overloaded {
                lane: AdmissionLane::Standard
            }
        );

        admission.release(a);
        drop(b);
        assert_eq!(admission.in_flight(AdmissionLane::Standard), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overloaded_after_admission_timeout() {
        let admission = controller(1, Duration::from_millis(100), 0);
        let held = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();

        let holder = {
            let admission = admission.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                admission.release(held);
            })
        };

        let started = Instant::now();
        let second = admission.admit(&client(), STANDARD_ROUTE).await;
        let waited = started.elapsed();

        assert!(matches!(second, Err(Rejection::Overloaded { .. })));
        assert!(waited >= Duration::from_millis(100));
        assert!(waited < Duration::from_millis(200));
        holder.await.unwrap();
        assert_eq!(admission.in_flight(AdmissionLane::Standard), 0);
        assert_eq!(admission.stats().overloaded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_gets_slot_released_within_timeout() {
        let admission = controller(1, Duration::from_millis(500), 0);
        let held = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();

        let releaser = {
            let admission = admission.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                admission.release(held);
            })
        };

        let ticket = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();
        assert_eq!(ticket.lane(), AdmissionLane::Standard);
        releaser.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_heavy_lane_is_isolated() {
        let admission = controller(4, Duration::from_millis(20), 0);

        let heavy = admission.admit(&client(), HEAVY_ROUTE).await.unwrap();
        assert_eq!(heavy.lane(), AdmissionLane::HeavyLookup);

        // A second heavy lookup waits for the first one.
        assert_eq!(
            admission.admit(&client(), HEAVY_ROUTE).await.unwrap_err(),
            Rejection::Overloaded {
                lane: AdmissionLane::HeavyLookup
            }
        );

        // Standard traffic is unaffected.
        let standard = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();
        assert_eq!(admission.in_flight(AdmissionLane::HeavyLookup), 1);
        assert_eq!(admission.in_flight(AdmissionLane::Standard), 1);

        drop(standard);
        drop(heavy);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_rejects_without_taking_slot() {
        let admission = controller(10, Duration::from_secs(1), 5);

        let mut tickets = Vec::new();
        for _ in 0..5 {
            tickets.push(admission.admit(&client(), STANDARD_ROUTE).await.unwrap());
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        let sixth = admission.admit(&client(), STANDARD_ROUTE).await;
        assert!(matches!(sixth, Err(Rejection::RateLimitExceeded { .. })));
        assert_eq!(admission.in_flight(AdmissionLane::Standard), 5);
        drop(tickets);

        // After the rolling minute has passed the client is admitted again.
        tokio::time::advance(Duration::from_secs(61)).await;
        let seventh = admission.admit(&client(), STANDARD_ROUTE).await;
        assert!(seventh.is_ok());
        assert_eq!(admission.stats().rate_limited, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_per_client() {
        let admission = controller(10, Duration::from_secs(1), 1);
        let _a = admission.admit(&ClientId::from("a"), STANDARD_ROUTE).await.unwrap();
        let _b = admission.admit(&ClientId::from("b"), STANDARD_ROUTE).await.unwrap();
        assert!(admission.admit(&ClientId::from("a"), STANDARD_ROUTE).await.is_err());
        assert_eq!(admission.tracked_clients(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_admissions_never_exceed_lane() {
        let admission = controller(3, Duration::from_secs(5), 0);
        let peak = Arc::new(AtomicU64::new(0));

        let tasks: Vec<_> = (0..12)
            .map(|_| {
                let admission = admission.clone();
                let peak = peak.clone();
                tokio::spawn(async move {
                    let ticket = admission.admit(&client(), STANDARD_ROUTE).await.unwrap();
                    let now = admission.in_flight(AdmissionLane::Standard) as u64;
                    peak.fetch_max(now, Ordering::Relaxed);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    admission.release(ticket);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::Relaxed) <= 3);
        assert_eq!(admission.stats().admitted, 12);
    }
}
