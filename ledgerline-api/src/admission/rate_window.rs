//! Per-client request rate windows.
//!
//! Each client owns a pair of consecutive sub-windows. The rolling count is
//! the previous sub-window plus the current one, so a ceiling of `N` allows
//! `N` requests per two sub-windows. Rejected attempts are counted as well:
//! a client that keeps retrying stays rejected instead of resetting itself.

use dashmap::DashMap;
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::Instant;

// ============================================================================
// CLIENT IDENTITY
// ============================================================================

/// Caller identity used as the rate limiting dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Placeholder for requests whose source address is unknown.
    pub fn unknown() -> Self {
        Self("unknown".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for ClientId {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl From<&str> for ClientId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// RATE WINDOW
// ============================================================================

/// Counters of one client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    window_start: Instant,
    previous: u32,
    current: u32,
}

impl RateWindow {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            previous: 0,
            current: 0,
        }
    }

    /// Shift the sub-windows forward so that `now` falls in the current one.
    fn roll(&mut self, now: Instant, len: Duration) {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= len * 2 {
            *self = Self::new(now);
        } else if elapsed >= len {
            self.previous = self.current;
            self.current = 0;
            self.window_start += len;
        }
    }

    /// Count one attempt and return the rolling total including it.
    pub fn record(&mut self, now: Instant, len: Duration) -> u32 {
        self.roll(now, len);
        self.current = self.current.saturating_add(1);
        self.total()
    }

    pub fn total(&self) -> u32 {
        self.previous.saturating_add(self.current)
    }

    /// Nothing recorded in either sub-window is still relevant at `now`.
    pub fn is_stale(&self, now: Instant, len: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= len * 2
    }

    /// How long until one more attempt fits under `limit`.
    ///
    /// After the next rollover the current count becomes the previous one,
    /// so if it alone leaves no room the client must wait for both
    /// sub-windows to pass.
    pub fn retry_after(&self, now: Instant, len: Duration, limit: u32) -> Duration {
        let shed_at = if self.current.saturating_add(1) > limit {
            self.window_start + len * 2
        } else {
            self.window_start + len
        };
        shed_at.saturating_duration_since(now)
    }
}

// ============================================================================
// RATE LIMITER
// ============================================================================

/// Rolling per-client request ceiling.
///
/// DashMap gives per-shard locking, so the check never waits on other
/// clients for longer than a map update.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: DashMap<ClientId, RateWindow>,
}

impl RateLimiter {
    /// `limit` requests per two `window`s. A limit of `0` disables the check.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Count an attempt by `client`. Over the ceiling returns the suggested
    /// retry delay.
    pub fn check(&self, client: &ClientId) -> Result<(), Duration> {
        if !self.is_enabled() {
            return Ok(());
        }

        let now = Instant::now();
        let mut window = self
            .windows
            .entry(client.clone())
            .or_insert_with(|| RateWindow::new(now));

        if window.record(now, self.window) > self.limit {
            Err(window.retry_after(now, self.window, self.limit))
        } else {
            Ok(())
        }
    }

    /// Drop windows that no longer hold any relevant count.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| !window.is_stale(now, self.window));
        before.saturating_sub(self.windows.len())
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_secs(30);

    #[tokio::test(start_paused = true)]
    async fn test_window_rolls_previous_forward() {
        let start = Instant::now();
        let mut window = RateWindow::new(start);
        for _ in 0..3 {
            window.record(start, WINDOW);
        }

        assert_eq!(window.record(start + Duration::from_secs(31), WINDOW), 4);
        assert_eq!(window.previous, 3);
        assert_eq!(window.current, 1);

        // Two full sub-windows later nothing is left.
        assert_eq!(window.record(start + Duration::from_secs(95), WINDOW), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_attempts_still_count() {
        let limiter = RateLimiter::new(2, WINDOW);
        let client = ClientId::from("10.0.0.1");

        assert!(limiter.check(&client).is_ok());
        assert!(limiter.check(&client).is_ok());
        assert!(limiter.check(&client).is_err());

        // One sub-window later the previous window still carries 3.
        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(limiter.check(&client).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(1, WINDOW);
        assert!(limiter.check(&ClientId::from("a")).is_ok());
        assert!(limiter.check(&ClientId::from("b")).is_ok());
        assert!(limiter.check(&ClientId::from("a")).is_err());
        assert_eq!(limiter.tracked_clients(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_disables_check() {
        let limiter = RateLimiter::new(0, WINDOW);
        let client = ClientId::from("a");
        for _ in 0..100 {
            assert!(limiter.check(&client).is_ok());
        }
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_points_at_next_rollover() {
        let limiter = RateLimiter::new(1, WINDOW);
        let client = ClientId::from("a");
        limiter.check(&client).ok();

        tokio::time::advance(Duration::from_secs(10)).await;
        // current = 2 > limit, both sub-windows must pass.
        assert_eq!(limiter.check(&client), Err(Duration::from_secs(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_waits_out_a_full_current_window() {
        let limiter = RateLimiter::new(5, WINDOW);
        let client = ClientId::from("a");
        assert!(limiter.check(&client).is_ok());

        tokio::time::advance(Duration::from_secs(31)).await;
        for _ in 0..4 {
            assert!(limiter.check(&client).is_ok());
        }
        // previous = 1, current = 5: the next rollover still leaves 5.
        let wait = limiter.check(&client).unwrap_err();
        assert_eq!(wait, Duration::from_secs(59));

        tokio::time::advance(wait).await;
        assert!(limiter.check(&client).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_next_rollover_when_current_has_room() {
        let limiter = RateLimiter::new(3, WINDOW);
        let client = ClientId::from("a");
        for _ in 0..3 {
            assert!(limiter.check(&client).is_ok());
        }

        tokio::time::advance(Duration::from_secs(31)).await;
        // previous = 3, current = 1: after the rollover previous = 1.
        let wait = limiter.check(&client).unwrap_err();
        assert_eq!(wait, Duration::from_secs(29));

        tokio::time::advance(wait).await;
        assert!(limiter.check(&client).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_only_stale_windows() {
        let limiter = RateLimiter::new(5, WINDOW);
        limiter.check(&ClientId::from("old")).ok();
        tokio::time::advance(Duration::from_secs(45)).await;
        limiter.check(&ClientId::from("fresh")).ok();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.tracked_clients(), 1);
    }

    proptest! {
        /// The rolling total covers every attempt of the last sub-window
        /// and nothing older than two sub-windows.
        #[test]
        fn prop_total_bounded_by_recent_attempts(
            gaps in proptest::collection::vec(0u64..75_000, 1..80),
        ) {
            let start = Instant::now();
            let mut window = RateWindow::new(start);
            let mut seen: Vec<Instant> = Vec::new();
            let mut now = start;

            for gap in gaps {
                now += Duration::from_millis(gap);
                seen.push(now);
                let total = window.record(now, WINDOW);

                let within = |span: Duration| {
                    seen.iter()
                        .filter(|t| now.saturating_duration_since(**t) < span)
                        .count() as u32
                };
                prop_assert!(total >= within(WINDOW), "total {} below last window", total);
                prop_assert!(total <= within(WINDOW * 2), "total {} above two windows", total);
            }
        }

        /// Waiting the advertised time always lets the next attempt through.
        #[test]
        fn prop_retry_after_admits(
            limit in 1u32..6,
            gaps in proptest::collection::vec(0u64..40_000, 1..40),
        ) {
            let start = Instant::now();
            let mut window = RateWindow::new(start);
            let mut now = start;

            for gap in gaps {
                now += Duration::from_millis(gap);
                if window.record(now, WINDOW) > limit {
                    let wait = window.retry_after(now, WINDOW, limit);
                    let mut later = window;
                    prop_assert!(later.record(now + wait, WINDOW) <= limit);
                }
            }
        }
    }
}
