use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tracing::{error, warn};

use super::action::{ProtectedAction, WriteTiming};
use crate::access::{AccessGate, Caller, DenyReason};
use crate::audit::{AuditError, AuditLog, EntryId, NewAuditEntry};
use crate::config::ConfigError;
use crate::error::GuardError;
use crate::rate_limit::{Decision, RateLimiter};
use crate::telemetry::{
    emit_best_effort, AccessEvent, AdmissionEvent, AuditEvent, GuardEvent, NullSink,
    OperationEvent, TelemetrySink,
};

/// What to do when the audit store rejects an entry for an action that is *not*
/// security-relevant. Security-relevant actions always abort.
///
/// Entries that describe a denial or a failed operation never change the call's result:
/// the caller already gets an error. When one of those cannot be written, the loss is
/// logged at error level under `tollgate::audit` with the entry's details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditFailurePolicy {
    /// Fail the call with [`GuardError::AuditWrite`].
    Abort,
    /// Log the failure locally and let the call complete.
    LogAndContinue,
}

/// Runs protected operations behind the rate limiter, the access gate and the audit log.
///
/// Holds no request state of its own. Every call goes through the same fixed sequence:
///
/// 1. rate limit on `key`; a denial touches nothing else
/// 2. authorize the caller against the action's minimum role
/// 3. check the action's precondition
/// 4. run the operation, writing the audit entry before or after it per [`WriteTiming`]
///
/// There is no entry point that skips the audit step.
pub struct RequestGuard<S = NullSink> {
    limiter: Arc<dyn RateLimiter>,
    gate: AccessGate,
    audit: Arc<AuditLog>,
    on_audit_failure: AuditFailurePolicy,
    sink: S,
}

impl<S> fmt::Debug for RequestGuard<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestGuard")
            .field("limiter", &"<limiter>")
            .field("gate", &self.gate)
            .field("audit", &self.audit)
            .field("on_audit_failure", &self.on_audit_failure)
            .field("sink", &"<sink>")
            .finish()
    }
}

impl RequestGuard<NullSink> {
    /// Start building a guard. Limiter, audit log and audit failure policy are mandatory.
    pub fn builder() -> RequestGuardBuilder<NullSink> {
        RequestGuardBuilder::new()
    }
}

impl<S> RequestGuard<S>
where
    S: TelemetrySink + Sync,
    S::Future: Send + 'static,
{
    /// Run `operation` as `caller` under `action`, rate limited on `key`.
    ///
    /// The admission slot is consumed as soon as step 1 passes; dropping the returned future
    /// later does not give it back.
    pub async fn guard<T, E, F, Fut>(
        &self,
        key: &str,
        caller: &Caller,
        action: &ProtectedAction,
        operation: F,
    ) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        match self.limiter.check(key) {
            Decision::Allowed { remaining } => {
                self.emit(GuardEvent::Admission(AdmissionEvent::Admitted {
                    key: key.to_owned(),
                    remaining,
                }))
                .await;
            }
            Decision::Denied { retry_after, reason } => {
                warn!(
                    target: "tollgate::rate_limit",
                    key,
                    reason,
                    retry_after_ms = u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
                    action = %action.action(),
                    "rate limit exceeded"
                );
                self.emit(GuardEvent::Admission(AdmissionEvent::RateLimited {
                    key: key.to_owned(),
                    retry_after,
                }))
                .await;
                return Err(GuardError::RateLimited { retry_after });
            }
        }

        if let Some(required) = action.required() {
            let decision = self.gate.authorize(caller.role, required);
            if !decision.allowed {
                let reason = decision.reason.unwrap_or(DenyReason::Unauthenticated);
                return Err(self.deny(caller, action, reason).await);
            }
        }

        if let Some(precondition) = action.precondition_ref() {
            if let Err(reason) = precondition.check(caller) {
                warn!(
                    target: "tollgate::access",
                    actor = caller.actor_id(),
                    action = %action.action(),
                    %reason,
                    "precondition failed"
                );
                self.emit(GuardEvent::Access(AccessEvent::PreconditionFailed {
                    actor: caller.actor_id().to_owned(),
                    action: action.action().clone(),
                }))
                .await;
                if action.audits_denials() {
                    let details = with_outcome(action.details_ref(), &format!("denied: {reason}"));
                    self.record_refusal(caller, action, details).await;
                }
                return Err(GuardError::PreconditionFailed { reason });
            }
        }

        let before_effect = action.timing() == WriteTiming::BeforeEffect;
        if before_effect {
            if let Err(e) = self.record(caller, action, action.details_ref().map(str::to_owned)).await {
                if self.aborts_on_audit_failure(action) {
                    return Err(GuardError::AuditWrite(e));
                }
                self.continue_unaudited(caller, action);
            }
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(async move { operation().await }).catch_unwind().await;
        let duration = started.elapsed();

        match outcome {
            Ok(Ok(value)) => {
                self.emit(GuardEvent::Operation(OperationEvent::Succeeded {
                    action: action.action().clone(),
                    duration,
                }))
                .await;
                if !before_effect {
                    if let Err(e) =
                        self.record(caller, action, action.details_ref().map(str::to_owned)).await
                    {
                        if self.aborts_on_audit_failure(action) {
                            return Err(GuardError::AuditWrite(e));
                        }
                        self.continue_unaudited(caller, action);
                    }
                }
                Ok(value)
            }
            Ok(Err(err)) => {
                warn!(
                    target: "tollgate::access",
                    actor = caller.actor_id(),
                    action = %action.action(),
                    error = %err,
                    "guarded operation failed"
                );
                self.emit(GuardEvent::Operation(OperationEvent::Failed {
                    action: action.action().clone(),
                    duration,
                    panicked: false,
                }))
                .await;
                if action.records_failure() {
                    let details = with_outcome(action.details_ref(), &format!("failed: {err}"));
                    self.record_refusal(caller, action, details).await;
                }
                Err(GuardError::Operation(err))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    target: "tollgate::access",
                    actor = caller.actor_id(),
                    action = %action.action(),
                    panic = %message,
                    "guarded operation panicked"
                );
                self.emit(GuardEvent::Operation(OperationEvent::Failed {
                    action: action.action().clone(),
                    duration,
                    panicked: true,
                }))
                .await;
                if action.records_failure() {
                    let details =
                        with_outcome(action.details_ref(), &format!("failed: panicked: {message}"));
                    self.record_refusal(caller, action, details).await;
                }
                Err(GuardError::OperationPanicked { message })
            }
        }
    }

    /// The audit log, for administrative listings.
    pub fn audit_log(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn audit_failure_policy(&self) -> AuditFailurePolicy {
        self.on_audit_failure
    }

    async fn deny<E>(&self, caller: &Caller, action: &ProtectedAction, reason: DenyReason) -> GuardError<E> {
        warn!(
            target: "tollgate::access",
            actor = caller.actor_id(),
            action = %action.action(),
            %reason,
            "access denied"
        );
        self.emit(GuardEvent::Access(AccessEvent::Denied {
            actor: caller.actor_id().to_owned(),
            action: action.action().clone(),
            reason: reason.clone(),
        }))
        .await;
        if action.audits_denials() {
            let details = with_outcome(action.details_ref(), &format!("denied: {reason}"));
            self.record_refusal(caller, action, details).await;
        }
        match reason {
            DenyReason::Unauthenticated => GuardError::Unauthenticated,
            DenyReason::InsufficientRole { required } => GuardError::Forbidden { required },
        }
    }

    async fn record(
        &self,
        caller: &Caller,
        action: &ProtectedAction,
        details: Option<String>,
    ) -> Result<EntryId, AuditError> {
        let mut entry = NewAuditEntry::new(caller.actor_id(), action.action().clone())
            .source_address(caller.source_address.clone());
        if let Some(target) = action.target_ref() {
            entry = entry.target(target);
        }
        if let Some(details) = details {
            entry = entry.details(details);
        }

        let result = self.audit.append(entry).await;
        let event = match &result {
            Ok(id) => AuditEvent::Appended { entry_id: *id, action: action.action().clone() },
            Err(e) => AuditEvent::Failed { action: action.action().clone(), error: e.to_string() },
        };
        self.emit(GuardEvent::Audit(event)).await;
        result
    }

    /// Records a denial or failure entry. The call's error result stands either way.
    async fn record_refusal(&self, caller: &Caller, action: &ProtectedAction, details: String) {
        if let Err(e) = self.record(caller, action, Some(details.clone())).await {
            error!(
                target: "tollgate::audit",
                actor = caller.actor_id(),
                action = %action.action(),
                %details,
                error = %e,
                "audit store unavailable; refusal entry lost"
            );
        }
    }

    fn aborts_on_audit_failure(&self, action: &ProtectedAction) -> bool {
        self.on_audit_failure == AuditFailurePolicy::Abort || action.action().is_security_relevant()
    }

    fn continue_unaudited(&self, caller: &Caller, action: &ProtectedAction) {
        error!(
            target: "tollgate::audit",
            actor = caller.actor_id(),
            action = %action.action(),
            "audit store unavailable; continuing without an entry"
        );
    }

    async fn emit(&self, event: GuardEvent) {
        emit_best_effort(self.sink.clone(), event).await;
    }
}

fn with_outcome(details: Option<&str>, outcome: &str) -> String {
    match details {
        Some(details) => format!("{details}; {outcome}"),
        None => outcome.to_owned(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

/// Builder for [`RequestGuard`].
pub struct RequestGuardBuilder<S = NullSink> {
    limiter: Option<Arc<dyn RateLimiter>>,
    gate: AccessGate,
    audit: Option<Arc<AuditLog>>,
    on_audit_failure: Option<AuditFailurePolicy>,
    sink: S,
}

impl RequestGuardBuilder<NullSink> {
    /// Empty builder with the default role hierarchy and no telemetry.
    pub fn new() -> Self {
        Self { limiter: None, gate: AccessGate::default(), audit: None, on_audit_failure: None, sink: NullSink }
    }
}

impl Default for RequestGuardBuilder<NullSink> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> RequestGuardBuilder<S> {
    /// Limiter consulted in step 1.
    pub fn limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Gate with a custom role hierarchy.
    pub fn gate(mut self, gate: AccessGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn audit_log(mut self, audit: Arc<AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// How to treat audit store failures for non-security-relevant actions.
    pub fn on_audit_failure(mut self, policy: AuditFailurePolicy) -> Self {
        self.on_audit_failure = Some(policy);
        self
    }

    /// Send guard events to `sink`.
    pub fn telemetry<S2>(self, sink: S2) -> RequestGuardBuilder<S2> {
        RequestGuardBuilder {
            limiter: self.limiter,
            gate: self.gate,
            audit: self.audit,
            on_audit_failure: self.on_audit_failure,
            sink,
        }
    }

    /// Validate and build.
    pub fn build(self) -> Result<RequestGuard<S>, ConfigError> {
        let limiter = self.limiter.ok_or(ConfigError::MissingComponent("limiter"))?;
        let audit = self.audit.ok_or(ConfigError::MissingComponent("audit_log"))?;
        let on_audit_failure = self.on_audit_failure.ok_or(ConfigError::MissingAuditFailurePolicy)?;
        Ok(RequestGuard { limiter, gate: self.gate, audit, on_audit_failure, sink: self.sink })
    }
}
