use crate::error::{RobotError, RobotResult};
use crate::metrics::Metrics;
use crate::ui::scheduler::UiScheduler;
use crate::ui::task::block_on_runtime;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Blocks a calling thread until the UI event queue has drained.
///
/// Subscribes to the scheduler's pending-event count instead of polling.
/// Events posted while handling other events (listener callbacks, repaints)
/// are counted before their parent finishes, so returning normally means every
/// consequence of previously dispatched input is visible to a following query.
#[derive(Clone)]
pub struct IdleBarrier {
    scheduler: Arc<dyn UiScheduler>,
    runtime: tokio::runtime::Handle,
    timeout: Duration,
    metrics: Arc<Metrics>,
}

impl IdleBarrier {
    pub fn new(
        scheduler: Arc<dyn UiScheduler>,
        runtime: tokio::runtime::Handle,
        timeout: Duration,
    ) -> Self {
        Self {
            scheduler,
            runtime,
            timeout,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Whether the queue is empty right now.
    pub fn is_idle(&self) -> bool {
        *self.scheduler.idle_watch().borrow() == 0
    }

    /// Wait for idle using the configured timeout.
    pub fn wait_for_idle(&self) -> RobotResult<()> {
        self.wait_for_idle_timeout(self.timeout)
    }

    /// Wait for idle, giving up after `timeout`.
    ///
    /// May be called from inside a tokio runtime; async callers can also use
    /// [`wait_for_idle_async`](Self::wait_for_idle_async).
    ///
    /// # Errors
    /// - [`RobotError::WaitOnUiThread`] when called from the UI thread
    /// - [`RobotError::Timeout`] when events are still pending after `timeout`
    pub fn wait_for_idle_timeout(&self, timeout: Duration) -> RobotResult<()> {
        if self.scheduler.is_ui_thread() {
            return Err(RobotError::WaitOnUiThread("wait for idle"));
        }
        block_on_runtime(&self.runtime, self.wait_inner(timeout))
    }

    /// Async counterpart of [`wait_for_idle`](Self::wait_for_idle).
    pub async fn wait_for_idle_async(&self) -> RobotResult<()> {
        self.wait_for_idle_timeout_async(self.timeout).await
    }

    /// Async counterpart of [`wait_for_idle_timeout`](Self::wait_for_idle_timeout).
    pub async fn wait_for_idle_timeout_async(&self, timeout: Duration) -> RobotResult<()> {
        if self.scheduler.is_ui_thread() {
            return Err(RobotError::WaitOnUiThread("wait for idle"));
        }
        self.wait_inner(timeout).await
    }

    async fn wait_inner(&self, timeout: Duration) -> RobotResult<()> {
        let started = Instant::now();
        let mut pending = self.scheduler.idle_watch();

        let reached = tokio::time::timeout(timeout, async {
            pending.wait_for(|count| *count == 0).await.map(|_| ())
        })
        .await;

        match reached {
            Ok(Ok(())) => {
                let waited = started.elapsed();
                self.metrics.record_idle_wait(waited);
                tracing::trace!("UI thread idle after {:?}", waited);
                Ok(())
            }
            Ok(Err(_)) => {
                self.metrics.record_unavailable();
                Err(RobotError::UiThreadUnavailable)
            }
            Err(_) => {
                self.metrics.record_timeout();
                tracing::warn!(
                    "UI thread still busy after {:?} ({} event(s) pending)",
                    timeout,
                    *self.scheduler.idle_watch().borrow()
                );
                Err(RobotError::Timeout {
                    operation: "UI thread to become idle",
                    after: timeout,
                })
            }
        }
    }
}
