//! Ready-made limiter profiles.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tollgate::presets;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let api = Arc::new(presets::api_limiter());
//! let login = Arc::new(presets::login_limiter());
//! let _sweepers = (presets::spawn_sweeper(&api), presets::spawn_sweeper(&login));
//! assert!(api.admit("198.51.100.4", api.now_millis()));
//! # }
//! ```
//!
//! ## Available Presets
//!
//! - [`api`]: general API traffic, 100 requests per hour per key
//! - [`login`]: credential checks, 10 attempts per 5 minutes per key

use std::sync::Arc;
use std::time::Duration;

use crate::config::{LimiterConfig, DEFAULT_SWEEP_INTERVAL};
use crate::rate_limit::{SlidingWindowLimiter, Sweeper};

const API_MAX_REQUESTS: u32 = 100;
const API_WINDOW_SECS: u64 = 3600;
const LOGIN_MAX_REQUESTS: u32 = 10;
const LOGIN_WINDOW_SECS: u64 = 300;

/// 100 requests per key per hour, swept every minute.
pub fn api() -> LimiterConfig {
    preset(API_MAX_REQUESTS, API_WINDOW_SECS)
}

/// 10 attempts per key per five minutes, swept every minute.
pub fn login() -> LimiterConfig {
    preset(LOGIN_MAX_REQUESTS, LOGIN_WINDOW_SECS)
}

/// Limiter built from [`api`].
pub fn api_limiter() -> SlidingWindowLimiter {
    SlidingWindowLimiter::new(api())
}

/// Limiter built from [`login`].
pub fn login_limiter() -> SlidingWindowLimiter {
    SlidingWindowLimiter::new(login())
}

/// Start the background sweep at the limiter's configured interval.
///
/// Must be called inside a tokio runtime.
pub fn spawn_sweeper(limiter: &Arc<SlidingWindowLimiter>) -> Sweeper {
    Sweeper::spawn(limiter)
}

fn preset(max_requests: u32, window_secs: u64) -> LimiterConfig {
    match LimiterConfig::new(max_requests, Duration::from_secs(window_secs), DEFAULT_SWEEP_INTERVAL) {
        Ok(config) => config,
        // Constants above are non-zero.
        Err(_) => unreachable!("preset limiter constants are valid"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles() {
        let api = api();
        assert_eq!(api.max_requests(), 100);
        assert_eq!(api.window(), Duration::from_secs(3600));
        assert_eq!(api.sweep_interval(), Duration::from_secs(60));

        let login = login();
        assert_eq!(login.max_requests(), 10);
        assert_eq!(login.window(), Duration::from_secs(300));
    }

    #[test]
    fn login_limiter_stops_the_eleventh_attempt() {
        let limiter = login_limiter();
        for i in 0..10 {
            assert!(limiter.admit("203.0.113.5", i * 1_000));
        }
        assert!(!limiter.admit("203.0.113.5", 10_000));
        assert!(limiter.admit("203.0.113.5", 300_001));
    }
}
