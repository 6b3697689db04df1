// UI module - UI-thread marshalling
//
// This module contains:
// - UiScheduler / UiThread: the serial event loop all widget access runs on
// - Task / Query abstraction with single-resolution completions
// - ExecutionBridge: submit-and-wait from any calling thread
// - IdleBarrier: wait until the UI event queue has drained
// - ThreadViolationDetector: MutationGuard catching off-thread mutation

pub mod bridge;
pub mod guard;
pub mod idle;
pub mod scheduler;
#[cfg(feature = "slint")]
pub mod slint_scheduler;
pub mod task;

pub use bridge::ExecutionBridge;
pub use guard::{MutationGuard, ThreadViolation, ThreadViolationDetector};
pub use idle::IdleBarrier;
pub use scheduler::{UiScheduler, UiThread};
#[cfg(feature = "slint")]
pub use slint_scheduler::SlintScheduler;
pub use task::{Completion, TaskState, UiJob, UiQuery, UiTask, completion, query, task};
