//! Telemetry for guarded requests.
//!
//! The guard emits a [`GuardEvent`] at each step it takes. Events flow through
//! [`TelemetrySink`] implementations, which are plain `tower::Service<GuardEvent>`s and can
//! log, collect, or forward them.
//!
//! Sinks are called with [`emit_best_effort`]: a slow or failing sink loses the event and
//! nothing else. Telemetry is not the audit trail; security records go through
//! [`AuditLog`](crate::audit::AuditLog) only.
//!
//! ```rust
//! use tollgate::telemetry::{AdmissionEvent, GuardEvent, MemorySink};
//! use tower::Service;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let mut sink = MemorySink::new();
//! let event = GuardEvent::Admission(AdmissionEvent::Admitted { key: "10.0.0.1".into(), remaining: 9 });
//! sink.call(event.clone()).await.unwrap();
//! assert_eq!(sink.events(), vec![event]);
//! # }
//! ```

mod events;
mod sinks;

pub use events::{AccessEvent, AdmissionEvent, AuditEvent, GuardEvent, OperationEvent};
pub use sinks::{emit_best_effort, LogSink, MemorySink, NullSink, TelemetrySink};
