// ExecutionBridge - Runs tasks and queries on the UI thread for any calling thread
//
// The bridge is the only sanctioned way for a test thread to read or mutate
// widget state. It provides:
// - Blocking submission with a bounded wait (execute / query)
// - Awaitable submission for callers already inside an async runtime
// - In-place execution when called from the UI thread itself, which is what
//   keeps nested synchronous sub-queries from deadlocking

use crate::error::{RobotError, RobotResult};
use crate::metrics::Metrics;
use crate::ui::scheduler::UiScheduler;
use crate::ui::task::{Completion, TaskAsQuery, UiQuery, UiTask, completion, run_and_settle};
use std::sync::Arc;
use std::time::Duration;

/// Marshals [`UiTask`]s and [`UiQuery`]s onto the UI thread and hands their
/// outcome back to the caller.
///
/// # Example
/// ```ignore
/// let runtime = tokio::runtime::Runtime::new()?;
/// let ui = UiThread::spawn("ui-thread")?;
/// let bridge = ExecutionBridge::new(Arc::new(ui), runtime.handle().clone(), Duration::from_secs(30));
///
/// // From a test thread, read widget state safely
/// let text = bridge.query(query(move || Ok(tree.snapshot(id)?.text)))?;
/// ```
///
/// Cloning is cheap and every clone targets the same scheduler.
#[derive(Clone)]
pub struct ExecutionBridge {
    /// UI event loop that runs the submitted bodies
    scheduler: Arc<dyn UiScheduler>,

    /// Runtime driving the timers of bounded blocking waits
    runtime: tokio::runtime::Handle,

    /// Bound applied to each blocking wait
    timeout: Duration,

    metrics: Arc<Metrics>,
}

impl ExecutionBridge {
    /// Create a bridge.
    ///
    /// # Arguments
    /// * `scheduler` - The UI thread to marshal onto
    /// * `runtime` - Handle to a multi-thread tokio runtime used for timed waits
    /// * `timeout` - Maximum time a caller blocks waiting for one submission
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

    /// Share a metrics sink with other robot components.
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The scheduler this bridge posts to.
    pub fn scheduler(&self) -> &Arc<dyn UiScheduler> {
        &self.scheduler
    }

    /// The runtime handle used for bounded waits.
    pub fn runtime(&self) -> &tokio::runtime::Handle {
        &self.runtime
    }

    /// Bound applied to each blocking wait.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a task on the UI thread and block until it has fully completed.
    ///
    /// # Errors
    /// - [`RobotError::UnexpectedExecution`] if the body returned an error or panicked
    /// - [`RobotError::Timeout`] if the UI thread did not finish within the bound
    /// - [`RobotError::UiThreadUnavailable`] if the UI thread is not accepting work
    pub fn execute<T: UiTask>(&self, task: T) -> RobotResult<()> {
        self.metrics.record_task();
        self.run_blocking(TaskAsQuery(task), "UI task")
    }

    /// Run a query on the UI thread and block until its result is available.
    ///
    /// Same error contract as [`execute`](Self::execute).
    pub fn query<Q: UiQuery>(&self, query: Q) -> RobotResult<Q::Output> {
        self.metrics.record_query();
        self.run_blocking(query, "UI query")
    }

    /// Async counterpart of [`execute`](Self::execute).
    pub async fn execute_async<T: UiTask>(&self, task: T) -> RobotResult<()> {
        self.metrics.record_task();
        self.run_async(TaskAsQuery(task), "UI task").await
    }

    /// Async counterpart of [`query`](Self::query).
    pub async fn query_async<Q: UiQuery>(&self, query: Q) -> RobotResult<Q::Output> {
        self.metrics.record_query();
        self.run_async(query, "UI query").await
    }

    /// Post a query without waiting and return its completion.
    ///
    /// Called from the UI thread, the body runs in place and the returned
    /// completion is already settled.
    pub fn submit<Q: UiQuery>(&self, query: Q) -> RobotResult<Completion<Q::Output>> {
        let (settle, completion) = completion();
        if self.scheduler.is_ui_thread() {
            run_and_settle(query, settle);
        } else {
            self.scheduler
                .post(Box::new(move || run_and_settle(query, settle)))?;
        }
        Ok(completion)
    }

    fn run_blocking<Q: UiQuery>(&self, query: Q, operation: &'static str) -> RobotResult<Q::Output> {
        if self.scheduler.is_ui_thread() {
            return self.observe(self.run_in_place(query));
        }
        let completion = self.submit(query)?;
        tracing::trace!("{} posted, waiting up to {:?}", operation, self.timeout);
        self.observe(completion.wait_blocking(&self.runtime, operation, self.timeout))
    }

    async fn run_async<Q: UiQuery>(&self, query: Q, operation: &'static str) -> RobotResult<Q::Output> {
        if self.scheduler.is_ui_thread() {
            return self.observe(self.run_in_place(query));
        }
        let completion = self.submit(query)?;
        self.observe(completion.wait_timeout(operation, self.timeout).await)
    }

    fn run_in_place<Q: UiQuery>(&self, query: Q) -> RobotResult<Q::Output> {
        tracing::trace!("Already on the UI thread, running in place");
        let (settle, mut completion) = completion();
        run_and_settle(query, settle);
        completion
            .try_take()
            .unwrap_or(Err(RobotError::UiThreadUnavailable))
    }

    fn observe<T>(&self, outcome: RobotResult<T>) -> RobotResult<T> {
        match &outcome {
            Ok(_) => {}
            Err(RobotError::Timeout { .. }) => self.metrics.record_timeout(),
            Err(RobotError::UiThreadUnavailable) => self.metrics.record_unavailable(),
            Err(_) => self.metrics.record_failure(),
        }
        outcome
    }
}
