use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::sliding::SlidingWindowLimiter;

/// Background task that periodically sweeps a [`SlidingWindowLimiter`].
///
/// Holds only a weak reference: the task ends on its own once the limiter is dropped.
/// Dropping the handle aborts the task; [`Sweeper::shutdown`] stops it gracefully.
#[derive(Debug)]
pub struct Sweeper {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn using the limiter's configured sweep interval. Requires a tokio runtime.
    pub fn spawn(limiter: &Arc<SlidingWindowLimiter>) -> Self {
        let interval = limiter.config().sweep_interval();
        Self::spawn_with_interval(limiter, interval)
    }

    /// Spawn with an explicit interval. A zero interval is bumped to one millisecond.
    pub fn spawn_with_interval(limiter: &Arc<SlidingWindowLimiter>, interval: Duration) -> Self {
        let limiter = Arc::downgrade(limiter);
        let interval = interval.max(Duration::from_millis(1));
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(limiter, interval, stop_rx));
        Self { stop: Some(stop), task }
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let _ = (&mut self.task).await;
    }

    /// `true` once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    limiter: Weak<SlidingWindowLimiter>,
    interval: Duration,
    mut stop: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // Late ticks are not replayed in a burst; the next sweep simply happens later.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                let Some(limiter) = limiter.upgrade() else { break };
                limiter.sweep_now();
            }
        }
    }
    debug!(target: "tollgate::rate_limit", "sweeper stopped");
}
