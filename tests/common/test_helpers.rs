#![allow(dead_code)]

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tollgate::access::{Caller, Role};
use tollgate::audit::{AuditLog, MemoryAuditStore};
use tollgate::clock::ManualClock;
use tollgate::config::LimiterConfig;
use tollgate::error::OperationError;
use tollgate::guard::{AuditFailurePolicy, RequestGuard};
use tollgate::rate_limit::SlidingWindowLimiter;
use tollgate::telemetry::MemorySink;
use tracing_subscriber::fmt::MakeWriter;

/// A guard wired to in-memory parts that share one manual clock.
pub struct Harness {
    pub guard: RequestGuard<MemorySink>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub clock: ManualClock,
    pub store: MemoryAuditStore,
    pub events: MemorySink,
}

pub fn harness(max_requests: u32, policy: AuditFailurePolicy) -> Harness {
    let clock = ManualClock::new(1_000_000);
    let config = LimiterConfig::with_default_sweep(max_requests, Duration::from_secs(60))
        .expect("valid limiter config");
    let limiter = Arc::new(SlidingWindowLimiter::new(config).with_clock(clock.clone()));
    let (log, store) = AuditLog::in_memory_with_clock(Arc::new(clock.clone()));
    let events = MemorySink::new();
    let guard = RequestGuard::builder()
        .limiter(limiter.clone())
        .audit_log(Arc::new(log))
        .on_audit_failure(policy)
        .telemetry(events.clone())
        .build()
        .expect("guard builds");
    Harness { guard, limiter, clock, store, events }
}

pub fn admin(id: &str) -> Caller {
    Caller::new(id, Role::Admin, "192.0.2.1")
}

pub fn analyst(id: &str) -> Caller {
    Caller::new(id, Role::Analyst, "192.0.2.2")
}

pub fn user(id: &str) -> Caller {
    Caller::new(id, Role::User, "192.0.2.3")
}

/// Error returned by fake downstream lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    NotFound,
    Upstream(&'static str),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::NotFound => write!(f, "not found"),
            LookupError::Upstream(msg) => write!(f, "upstream error: {msg}"),
        }
    }
}

impl std::error::Error for LookupError {}

impl OperationError for LookupError {
    fn status_code(&self) -> u16 {
        match self {
            LookupError::NotFound => 404,
            LookupError::Upstream(_) => 500,
        }
    }
}

/// In-memory writer for asserting on `tracing` output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// A subscriber writing plain text into this buffer, for `tracing::subscriber::set_default`.
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
