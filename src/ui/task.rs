// Task / Query abstraction and the single-resolution completion used to hand
// their outcome back across the thread boundary.

use crate::error::{RobotError, RobotResult};
use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::oneshot;

/// A unit of work posted to the UI thread's serial queue.
pub type UiJob = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a submitted task or query.
///
/// Only the UI thread moves a submission forward:
/// `Pending -> Running -> Completed | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Failed,
        }
    }

    /// Whether the submission has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Shared view of a submission's [`TaskState`].
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(TaskState::Pending as u8)))
    }

    fn set(&self, state: TaskState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Current state.
    pub fn get(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::SeqCst))
    }
}

/// UI-thread work that produces no value.
///
/// Implementors put the UI-thread-only logic in [`run`](Self::run). Errors are
/// returned, not thrown; the bridge re-raises them on the calling thread.
pub trait UiTask: Send + 'static {
    fn run(self) -> anyhow::Result<()>;
}

/// UI-thread work that produces a typed value.
pub trait UiQuery: Send + 'static {
    type Output: Send + 'static;

    fn run(self) -> anyhow::Result<Self::Output>;
}

/// Closure-backed [`UiTask`], built with [`task`].
pub struct FnTask<F>(F);

/// Closure-backed [`UiQuery`], built with [`query`].
pub struct FnQuery<F>(F);

/// Wrap a closure as a [`UiTask`].
///
/// ```ignore
/// bridge.execute(task(move || {
///     tree.update(id, "text", |w| w.text = "hello".into())?;
///     Ok(())
/// }))?;
/// ```
pub fn task<F>(body: F) -> FnTask<F>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    FnTask(body)
}

/// Wrap a closure as a [`UiQuery`].
pub fn query<F, T>(body: F) -> FnQuery<F>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    FnQuery(body)
}

impl<F> UiTask for FnTask<F>
where
    F: FnOnce() -> anyhow::Result<()> + Send + 'static,
{
    fn run(self) -> anyhow::Result<()> {
        (self.0)()
    }
}

impl<F, T> UiQuery for FnQuery<F>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    type Output = T;

    fn run(self) -> anyhow::Result<T> {
        (self.0)()
    }
}

/// Adapter letting the bridge treat every task as a unit-valued query.
pub(crate) struct TaskAsQuery<T>(pub(crate) T);

impl<T: UiTask> UiQuery for TaskAsQuery<T> {
    type Output = ();

    fn run(self) -> anyhow::Result<()> {
        self.0.run()
    }
}

/// Settling half of a completion, owned by the UI-thread side.
///
/// Consumed on resolution, so a completion is settled at most once.
pub struct Settle<T> {
    tx: oneshot::Sender<anyhow::Result<T>>,
    state: StateCell,
}

/// Waiting half of a completion, owned by the calling thread.
///
/// Consumed by every wait, so the outcome is observed by at most one waiter.
pub struct Completion<T> {
    rx: oneshot::Receiver<anyhow::Result<T>>,
    state: StateCell,
}

/// Create a linked settle/completion pair in the `Pending` state.
pub fn completion<T>() -> (Settle<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    let state = StateCell::new();
    (
        Settle {
            tx,
            state: state.clone(),
        },
        Completion { rx, state },
    )
}

impl<T> Settle<T> {
    /// Mark the submission as running.
    pub fn start(&self) {
        self.state.set(TaskState::Running);
    }

    /// Settle with an outcome. Returns `false` if the waiter has gone away.
    pub fn resolve(self, outcome: anyhow::Result<T>) -> bool {
        let terminal = if outcome.is_ok() {
            TaskState::Completed
        } else {
            TaskState::Failed
        };
        self.state.set(terminal);
        self.tx.send(outcome).is_ok()
    }
}

impl<T> Completion<T> {
    /// Current state of the submission.
    pub fn state(&self) -> TaskState {
        self.state.get()
    }

    /// Shared state cell, usable after the completion is consumed.
    pub fn state_cell(&self) -> StateCell {
        self.state.clone()
    }

    /// Block the current thread until settled or `timeout` elapses.
    ///
    /// The timer runs on `runtime`, which must be a multi-thread runtime.
    /// Safe to call from inside another tokio runtime, of either flavor.
    pub fn wait_blocking(
        self,
        runtime: &Handle,
        operation: &'static str,
        timeout: Duration,
    ) -> RobotResult<T>
    where
        T: Send,
    {
        block_on_runtime(runtime, self.wait_timeout(operation, timeout))
    }

    /// Await the outcome with a bounded wait.
    pub async fn wait_timeout(self, operation: &'static str, timeout: Duration) -> RobotResult<T> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(received) => settle_outcome(received),
            Err(_) => {
                tracing::warn!("{} did not complete within {:?}", operation, timeout);
                Err(RobotError::Timeout {
                    operation,
                    after: timeout,
                })
            }
        }
    }

    /// Await the outcome without a time bound.
    pub async fn wait(self) -> RobotResult<T> {
        settle_outcome(self.rx.await)
    }

    /// Take the outcome without waiting, if it has already been settled.
    pub fn try_take(&mut self) -> Option<RobotResult<T>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(settle_outcome(Ok(outcome))),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(RobotError::UiThreadUnavailable)),
        }
    }
}

/// Block the calling thread on `future`, with its timers driven by `runtime`.
///
/// - Outside any runtime: plain `block_on`.
/// - Inside a multi-thread runtime: the worker is handed off with
///   `block_in_place` first.
/// - Inside a current-thread runtime: the wait runs on a scoped helper
///   thread, so the caller's runtime stays parked instead of panicking.
pub(crate) fn block_on_runtime<F>(runtime: &Handle, future: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    let Ok(current) = Handle::try_current() else {
        return runtime.block_on(future);
    };
    match current.runtime_flavor() {
        RuntimeFlavor::CurrentThread => thread::scope(|scope| {
            match scope.spawn(|| runtime.block_on(future)).join() {
                Ok(output) => output,
                Err(payload) => resume_unwind(payload),
            }
        }),
        _ => tokio::task::block_in_place(|| runtime.block_on(future)),
    }
}

fn settle_outcome<T>(
    received: Result<anyhow::Result<T>, oneshot::error::RecvError>,
) -> RobotResult<T> {
    match received {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(RobotError::UnexpectedExecution { source }),
        // Settle half dropped unresolved: the job never ran
        Err(_) => Err(RobotError::UiThreadUnavailable),
    }
}

/// Run a query body, capturing both errors and panics, and settle with the result.
///
/// This is what actually executes on the UI thread (or in place, for
/// re-entrant calls). A panic never escapes into the UI loop.
pub fn run_and_settle<Q: UiQuery>(body: Q, settle: Settle<Q::Output>) {
    settle.start();
    let outcome = match catch_unwind(AssertUnwindSafe(|| body.run())) {
        Ok(outcome) => outcome,
        Err(payload) => Err(anyhow::anyhow!(
            "UI-thread body panicked: {}",
            panic_message(payload.as_ref())
        )),
    };
    if let Err(e) = &outcome {
        tracing::debug!("UI-thread body failed: {:#}", e);
    }
    if !settle.resolve(outcome) {
        tracing::debug!("Completion dropped before the UI-thread body finished");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
