//! Construction-time configuration for limiters and guards.
//!
//! Values are validated once when built and are immutable afterwards. Raw, serde-friendly
//! forms ([`LimiterSettings`], [`GuardSettings`]) convert into the validated types with
//! `TryFrom`.

use std::time::Duration;

use serde::Deserialize;

use crate::access::{Role, RoleHierarchy};

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Errors produced when validating configuration.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// The sliding window must cover a non-zero span.
    #[error("window must be > 0")]
    ZeroWindow,
    /// The sweep interval must be non-zero.
    #[error("sweep_interval must be > 0")]
    ZeroSweepInterval,
    /// A role appears more than once in the hierarchy.
    #[error("role '{0}' listed more than once in hierarchy")]
    DuplicateRole(Role),
    /// A role is absent from the hierarchy.
    #[error("role '{0}' missing from hierarchy")]
    MissingRole(Role),
    /// A role name could not be parsed.
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    /// The guard builder was not told how to treat audit store failures.
    #[error("audit failure policy must be chosen explicitly")]
    MissingAuditFailurePolicy,
    /// A required guard component was not supplied.
    #[error("missing guard component: {0}")]
    MissingComponent(&'static str),
    /// Settings document could not be parsed.
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Validated sliding-window limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    max_requests: u32,
    window: Duration,
    sweep_interval: Duration,
}

impl LimiterConfig {
    /// Create a config with validation.
    ///
    /// `max_requests = 0` is accepted and denies every request.
    pub fn new(
        max_requests: u32,
        window: Duration,
        sweep_interval: Duration,
    ) -> Result<Self, ConfigError> {
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        if sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(Self { max_requests, window, sweep_interval })
    }

    /// Shorthand using [`DEFAULT_SWEEP_INTERVAL`].
    pub fn with_default_sweep(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        Self::new(max_requests, window, DEFAULT_SWEEP_INTERVAL)
    }

    /// Maximum admissions per key inside one window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Trailing window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Window length in milliseconds, saturating.
    pub fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }

    /// Interval between background sweeps.
    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }
}

fn default_sweep_interval_seconds() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_secs()
}

/// Raw limiter settings as they appear in a settings document.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LimiterSettings {
    /// Maximum admissions per key inside one window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_seconds: u64,
    /// Sweep interval in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl TryFrom<LimiterSettings> for LimiterConfig {
    type Error = ConfigError;

    fn try_from(raw: LimiterSettings) -> Result<Self, Self::Error> {
        LimiterConfig::new(
            raw.max_requests,
            Duration::from_secs(raw.window_seconds),
            Duration::from_secs(raw.sweep_interval_seconds),
        )
    }
}

fn default_roles() -> Vec<String> {
    Role::ALL.iter().map(|r| r.to_string()).collect()
}

/// Raw guard settings: limiter plus role ordering (lowest first).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GuardSettings {
    /// Limiter settings.
    pub limiter: LimiterSettings,
    /// Role names ordered from least to most privileged.
    #[serde(default = "default_roles")]
    pub roles: Vec<String>,
}

impl GuardSettings {
    /// Parse and validate a JSON settings document.
    pub fn from_json(raw: &str) -> Result<(LimiterConfig, RoleHierarchy), ConfigError> {
        let settings: GuardSettings = serde_json::from_str(raw)?;
        settings.validate()
    }

    /// Validate into the construction-time types.
    pub fn validate(self) -> Result<(LimiterConfig, RoleHierarchy), ConfigError> {
        let limiter = LimiterConfig::try_from(self.limiter)?;
        let roles = self
            .roles
            .iter()
            .map(|name| name.parse::<Role>().map_err(|_| ConfigError::UnknownRole(name.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        let hierarchy = RoleHierarchy::new(roles)?;
        Ok((limiter, hierarchy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_window_and_sweep() {
        assert!(matches!(
            LimiterConfig::new(1, Duration::ZERO, Duration::from_secs(1)),
            Err(ConfigError::ZeroWindow)
        ));
        assert!(matches!(
            LimiterConfig::new(1, Duration::from_secs(1), Duration::ZERO),
            Err(ConfigError::ZeroSweepInterval)
        ));
    }

    #[test]
    fn zero_max_requests_is_valid() {
        let cfg = LimiterConfig::with_default_sweep(0, Duration::from_secs(1)).unwrap();
        assert_eq!(cfg.max_requests(), 0);
        assert_eq!(cfg.sweep_interval(), DEFAULT_SWEEP_INTERVAL);
    }

    #[test]
    fn parses_settings_with_defaults() {
        let (limiter, hierarchy) =
            GuardSettings::from_json(r#"{"limiter":{"max_requests":3,"window_seconds":60}}"#)
                .unwrap();
        assert_eq!(limiter.max_requests(), 3);
        assert_eq!(limiter.window_millis(), 60_000);
        assert_eq!(limiter.sweep_interval(), Duration::from_secs(60));
        assert_eq!(hierarchy, RoleHierarchy::default());
    }

    #[test]
    fn unknown_role_name_is_rejected() {
        let err = GuardSettings::from_json(
            r#"{"limiter":{"max_requests":3,"window_seconds":60},"roles":["user","root"]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRole(ref name) if name == "root"));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = GuardSettings::from_json("{").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
