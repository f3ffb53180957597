use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::debug;

use super::window::RateWindow;
use super::{Decision, RateLimiter};
use crate::clock::{Clock, MonotonicClock};
use crate::config::LimiterConfig;

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Keys visited.
    pub scanned: usize,
    /// Keys that lost at least one expired timestamp.
    pub pruned_keys: usize,
    /// Keys removed because their window emptied.
    pub removed_keys: usize,
}

/// Per-key sliding-window limiter.
///
/// Each key keeps the timestamps of its admissions inside the trailing window. A request is
/// admitted while fewer than `max_requests` timestamps remain after pruning; unlike fixed
/// buckets, a burst straddling a bucket boundary is never undercounted.
///
/// The key map is a sharded [`DashMap`]: the prune/count/append sequence for one key runs
/// under that key's shard lock, and keys on other shards never wait on it.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    windows: DashMap<String, RateWindow>,
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
}

impl SlidingWindowLimiter {
    /// Create a limiter reading time from a [`MonotonicClock`].
    pub fn new(config: LimiterConfig) -> Self {
        Self { windows: DashMap::new(), config, clock: Arc::new(MonotonicClock::default()) }
    }

    /// Override the clock (useful for deterministic tests).
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Share a clock with other components.
    pub fn with_shared_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Admit or deny one request for `key` at `now` (milliseconds on the limiter's clock).
    ///
    /// Total and side-effect free on denial.
    pub fn admit(&self, key: &str, now: u64) -> bool {
        self.check_at(key, now).is_allowed()
    }

    /// Like [`admit`](Self::admit) but reports remaining quota or the wait before retrying.
    pub fn check_at(&self, key: &str, now: u64) -> Decision {
        let max = self.config.max_requests();
        if max == 0 {
            return Decision::Denied { retry_after: self.config.window(), reason: "limit_zero" };
        }
        let window_ms = self.config.window_millis();

        // Hot keys skip the key allocation that `entry` needs.
        if let Some(mut window) = self.windows.get_mut(key) {
            return decide(&mut window, now, window_ms, max);
        }
        let mut window = self.windows.entry(key.to_owned()).or_default();
        decide(&mut window, now, window_ms, max)
    }

    /// Prune every key and drop the ones left empty.
    ///
    /// Works from a snapshot of the key set and locks one key at a time. A key is removed only
    /// if it is still empty under its own lock, so an admission racing the sweep survives.
    pub fn sweep(&self, now: u64) -> SweepReport {
        let window_ms = self.config.window_millis();
        let keys: Vec<String> = self.windows.iter().map(|entry| entry.key().clone()).collect();
        let mut report = SweepReport { scanned: keys.len(), ..SweepReport::default() };

        for key in &keys {
            let emptied = match self.windows.get_mut(key) {
                Some(mut window) => {
                    if window.prune(now, window_ms) > 0 {
                        report.pruned_keys += 1;
                    }
                    window.is_empty()
                }
                None => continue,
            };
            if emptied && self.windows.remove_if(key, |_, window| window.is_empty()).is_some() {
                report.removed_keys += 1;
            }
        }

        debug!(
            target: "tollgate::rate_limit",
            scanned = report.scanned,
            pruned = report.pruned_keys,
            removed = report.removed_keys,
            "sweep complete"
        );
        report
    }

    /// Sweep at the limiter clock's current time.
    pub fn sweep_now(&self) -> SweepReport {
        self.sweep(self.clock.now_millis())
    }

    /// Number of keys currently holding state.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Timestamps currently stored for `key`, without pruning.
    pub fn window_len(&self, key: &str) -> usize {
        self.windows.get(key).map(|w| w.len()).unwrap_or(0)
    }

    /// Current time on the limiter's clock.
    pub fn now_millis(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Configuration in force.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}

fn decide(window: &mut RateWindow, now: u64, window_ms: u64, max: u32) -> Decision {
    window.prune(now, window_ms);
    let count = window.len();
    if count >= max as usize {
        // The oldest stamp stops counting once `now - oldest > window`.
        let oldest = window.oldest().unwrap_or(now);
        let leaves_at = oldest.saturating_add(window_ms).saturating_add(1);
        return Decision::Denied {
            retry_after: Duration::from_millis(leaves_at.saturating_sub(now)),
            reason: "window_full",
        };
    }
    window.record(now);
    let used = u32::try_from(count + 1).unwrap_or(max);
    Decision::Allowed { remaining: max.saturating_sub(used) }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str) -> Decision {
        self.check_at(key, self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const SEC: u64 = 1_000;

    fn limiter(max: u32, window_secs: u64) -> SlidingWindowLimiter {
        let cfg =
            LimiterConfig::with_default_sweep(max, Duration::from_secs(window_secs)).unwrap();
        SlidingWindowLimiter::new(cfg)
    }

    #[test]
    fn three_per_minute_scenario() {
        let l = limiter(3, 60);
        assert!(l.admit("k", 0));
        assert!(l.admit("k", SEC));
        assert!(l.admit("k", 2 * SEC));
        assert!(!l.admit("k", 3 * SEC));
        assert!(l.admit("k", 61 * SEC));
    }

    #[test]
    fn denial_does_not_record() {
        let l = limiter(1, 60);
        assert!(l.admit("k", 0));
        for t in 1..10 {
            assert!(!l.admit("k", t * SEC));
        }
        assert_eq!(l.window_len("k"), 1);
    }

    #[test]
    fn zero_limit_denies_without_allocating() {
        let l = limiter(0, 60);
        let d = l.check_at("k", 0);
        assert_eq!(d, Decision::Denied { retry_after: Duration::from_secs(60), reason: "limit_zero" });
        assert_eq!(l.tracked_keys(), 0);
    }

    #[test]
    fn remaining_and_retry_after() {
        let l = limiter(2, 10);
        assert_eq!(l.check_at("k", 0), Decision::Allowed { remaining: 1 });
        assert_eq!(l.check_at("k", 4 * SEC), Decision::Allowed { remaining: 0 });
        // Oldest stamp (t=0) counts until t=10s inclusive.
        let d = l.check_at("k", 5 * SEC);
        assert_eq!(d.retry_after(), Some(Duration::from_millis(5 * SEC + 1)));
        assert!(l.admit("k", 10 * SEC + 1));
    }

    #[test]
    fn keys_are_independent() {
        let l = limiter(1, 60);
        assert!(l.admit("a", 0));
        assert!(!l.admit("a", 1));
        assert!(l.admit("b", 1));
    }

    #[test]
    fn sweep_drops_idle_keys_only() {
        let l = limiter(5, 60);
        l.admit("idle", 0);
        l.admit("busy", 0);
        l.admit("busy", 50 * SEC);

        let report = l.sweep(70 * SEC);
        assert_eq!(report, SweepReport { scanned: 2, pruned_keys: 2, removed_keys: 1 });
        assert_eq!(l.tracked_keys(), 1);
        assert_eq!(l.window_len("busy"), 1);
        assert_eq!(l.window_len("idle"), 0);
    }

    #[test]
    fn trait_check_uses_clock() {
        let clock = ManualClock::new(0);
        let l = limiter(1, 1).with_clock(clock.clone());
        assert!(l.check("k").is_allowed());
        assert!(!l.check("k").is_allowed());
        clock.advance(Duration::from_millis(1_001));
        assert!(l.check("k").is_allowed());
    }
}
