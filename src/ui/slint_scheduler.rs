// Slint-backed UI scheduler
//
// Lets the robot drive a real Slint application: jobs are queued with
// `slint::invoke_from_event_loop`, which runs them on Slint's single event
// loop thread in posting order.

use crate::error::{RobotError, RobotResult};
use crate::ui::scheduler::{UiScheduler, run_job};
use crate::ui::task::UiJob;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tokio::sync::watch;

/// [`UiScheduler`] running jobs on the Slint event loop.
///
/// Must be created on the thread that runs (or will run) `slint::run_event_loop`.
#[derive(Clone)]
pub struct SlintScheduler {
    event_loop_thread: ThreadId,
    pending: Arc<watch::Sender<usize>>,
}

impl SlintScheduler {
    /// Bind to the current thread as the Slint event loop thread.
    pub fn for_current_thread() -> Self {
        let (pending, _) = watch::channel(0usize);
        Self {
            event_loop_thread: thread::current().id(),
            pending: Arc::new(pending),
        }
    }
}

impl UiScheduler for SlintScheduler {
    fn post(&self, job: UiJob) -> RobotResult<()> {
        self.pending.send_modify(|n| *n += 1);
        let pending = Arc::clone(&self.pending);
        let queued = slint::invoke_from_event_loop(move || run_job("slint", job, &pending));

        if let Err(e) = queued {
            self.pending.send_modify(|n| *n = n.saturating_sub(1));
            tracing::warn!("Failed to queue job to Slint event loop: {:?}", e);
            return Err(RobotError::UiThreadUnavailable);
        }
        Ok(())
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.event_loop_thread
    }

    fn idle_watch(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }
}
