use crate::rate_limit::{Decision, RateLimiter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tower_layer::Layer;
use tower_service::Service;

/// Errors surfaced by [`RateLimitService`].
#[derive(thiserror::Error, Debug)]
pub enum RateLimitError<E> {
    /// The request's key has no quota left in the current window.
    #[error("rate limit exceeded for '{key}'; retry after {retry_after:?}")]
    RateLimited {
        /// Key the request was counted against.
        key: String,
        /// Wait before the key regains quota.
        retry_after: Duration,
    },
    /// The wrapped service failed.
    #[error("{0}")]
    Inner(E),
}

impl<E> RateLimitError<E> {
    /// Check if this error is a rate-limit rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Get the inner error if this is an Inner variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            _ => None,
        }
    }
}

/// A layer that enforces per-key rate limits using a [`RateLimiter`].
///
/// `key_fn` maps each request to its rate-limit key (client address, user id, ...).
pub struct RateLimitLayer<L, K> {
    limiter: Arc<L>,
    key_fn: Arc<K>,
}

impl<L, K> Clone for RateLimitLayer<L, K> {
    fn clone(&self) -> Self {
        Self { limiter: self.limiter.clone(), key_fn: self.key_fn.clone() }
    }
}

impl<L, K> RateLimitLayer<L, K> {
    /// Create a new rate limit layer around a shared limiter.
    pub fn new(limiter: Arc<L>, key_fn: K) -> Self {
        Self { limiter, key_fn: Arc::new(key_fn) }
    }
}

impl<S, L, K> Layer<S> for RateLimitLayer<L, K>
where
    L: RateLimiter + 'static,
{
    type Service = RateLimitService<S, L, K>;

    fn layer(&self, service: S) -> Self::Service {
        RateLimitService {
            inner: service,
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

/// Middleware service that enforces rate limits.
pub struct RateLimitService<S, L, K> {
    inner: S,
    limiter: Arc<L>,
    key_fn: Arc<K>,
}

impl<S: Clone, L, K> Clone for RateLimitService<S, L, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: self.limiter.clone(),
            key_fn: self.key_fn.clone(),
        }
    }
}

impl<S, L, K, Req> Service<Req> for RateLimitService<S, L, K>
where
    S: Service<Req> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Response: Send + 'static,
    S::Error: Send + 'static,
    L: RateLimiter + 'static,
    K: Fn(&Req) -> String + Send + Sync + 'static,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = RateLimitError<S::Error>;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(RateLimitError::Inner)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        // Counted now, not when the future is polled: a dropped future keeps its slot.
        let key = (self.key_fn)(&req);
        let decision = self.limiter.check(&key);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match decision {
                Decision::Allowed { .. } => inner.call(req).await.map_err(RateLimitError::Inner),
                Decision::Denied { retry_after, reason } => {
                    tracing::warn!(target: "tollgate::rate_limit", key = %key, reason, "rate limit exceeded");
                    Err(RateLimitError::RateLimited { key, retry_after })
                }
            }
        })
    }
}
