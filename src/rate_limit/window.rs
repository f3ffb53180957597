use std::collections::VecDeque;

/// Admission timestamps (milliseconds) for one key, oldest first.
///
/// Insertion order is chronological order as long as callers pass a non-decreasing clock;
/// a clock that steps backwards only makes pruning more conservative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateWindow {
    stamps: VecDeque<u64>,
}

impl RateWindow {
    /// Empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop timestamps older than `window_millis` relative to `now`.
    ///
    /// Retains every `t` with `now - t <= window_millis`. Returns how many were dropped.
    pub fn prune(&mut self, now: u64, window_millis: u64) -> usize {
        let before = self.stamps.len();
        while let Some(&oldest) = self.stamps.front() {
            if now.saturating_sub(oldest) > window_millis {
                self.stamps.pop_front();
            } else {
                break;
            }
        }
        before - self.stamps.len()
    }

    /// Record an admission at `now`.
    pub fn record(&mut self, now: u64) {
        self.stamps.push_back(now);
    }

    /// Oldest retained timestamp.
    pub fn oldest(&self) -> Option<u64> {
        self.stamps.front().copied()
    }

    /// Number of retained timestamps.
    pub fn len(&self) -> usize {
        self.stamps.len()
    }

    /// `true` when nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.stamps.is_empty()
    }
}
