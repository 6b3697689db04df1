// Robot metrics module
//
// Provides lightweight counters for monitoring how a test session used the UI thread

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Robot session metrics
///
/// Uses atomic operations for thread-safe tracking without locks. Counters
/// are bumped by the bridge, the idle barrier, the input source and the
/// drivers, and logged on shutdown.
#[derive(Debug)]
pub struct Metrics {
    /// Tasks submitted through the bridge
    pub tasks_executed: AtomicU64,

    /// Queries submitted through the bridge
    pub queries_executed: AtomicU64,

    /// Submissions whose body failed or panicked
    pub execution_failures: AtomicU64,

    /// Bridge or idle waits that timed out
    pub timeouts: AtomicU64,

    /// Submissions rejected because the UI thread was gone
    pub unavailable: AtomicU64,

    /// Idle waits completed
    pub idle_waits: AtomicU64,

    /// Total time spent waiting for idle, in microseconds
    pub total_idle_wait_us: AtomicU64,

    /// Synthetic input events dispatched
    pub input_events: AtomicU64,

    /// Driver actions performed successfully
    pub actions_performed: AtomicU64,

    /// Driver actions rejected by a precondition or postcondition
    pub actions_failed: AtomicU64,

    /// Session start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            tasks_executed: AtomicU64::new(0),
            queries_executed: AtomicU64::new(0),
            execution_failures: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            unavailable: AtomicU64::new(0),
            idle_waits: AtomicU64::new(0),
            total_idle_wait_us: AtomicU64::new(0),
            input_events: AtomicU64::new(0),
            actions_performed: AtomicU64::new(0),
            actions_failed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_task(&self) {
        self.tasks_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query(&self) {
        self.queries_executed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.execution_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed idle wait and how long it blocked
    pub fn record_idle_wait(&self, waited: Duration) {
        self.idle_waits.fetch_add(1, Ordering::Relaxed);
        self.total_idle_wait_us
            .fetch_add(waited.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_input_event(&self) {
        self.input_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_action(&self, succeeded: bool) {
        if succeeded {
            self.actions_performed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.actions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Average idle wait in milliseconds
    pub fn avg_idle_wait_ms(&self) -> f64 {
        let total = self.total_idle_wait_us.load(Ordering::Relaxed);
        let count = self.idle_waits.load(Ordering::Relaxed);
        if count > 0 {
            total as f64 / count as f64 / 1000.0
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Robot Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Bridge: {} tasks, {} queries, {} failures, {} timeouts, {} unavailable",
            self.tasks_executed.load(Ordering::Relaxed),
            self.queries_executed.load(Ordering::Relaxed),
            self.execution_failures.load(Ordering::Relaxed),
            self.timeouts.load(Ordering::Relaxed),
            self.unavailable.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Idle waits: {} (avg: {:.2}ms)",
            self.idle_waits.load(Ordering::Relaxed),
            self.avg_idle_wait_ms()
        );
        tracing::info!(
            "Input events: {}, actions: {} performed, {} failed",
            self.input_events.load(Ordering::Relaxed),
            self.actions_performed.load(Ordering::Relaxed),
            self.actions_failed.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
