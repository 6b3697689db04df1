// UI scheduler - the single serial event loop every widget access goes through
//
// The robot never reaches the UI thread through ambient static state. A
// scheduler handle is created once and passed explicitly to the bridge, the
// idle barrier and the input source, so tests can substitute their own.

use crate::error::{RobotError, RobotResult};
use crate::ui::task::UiJob;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::sync::{mpsc, watch};

/// Access to a single-threaded UI event loop.
///
/// Implementations must run posted jobs one at a time, in posting order, on
/// one dedicated thread, and must keep the idle watch equal to the number of
/// jobs posted but not yet finished.
pub trait UiScheduler: Send + Sync {
    /// Append a job to the UI event queue.
    fn post(&self, job: UiJob) -> RobotResult<()>;

    /// Whether the calling thread is the UI thread.
    fn is_ui_thread(&self) -> bool;

    /// Receiver of the pending-event count; zero means idle.
    fn idle_watch(&self) -> watch::Receiver<usize>;
}

enum UiEvent {
    Run(UiJob),
    Shutdown,
}

/// The built-in UI thread: a named std thread draining an unbounded queue.
///
/// Cloning is cheap; all clones address the same thread. The loop stops on
/// [`shutdown`](Self::shutdown) or when the last handle is dropped.
#[derive(Clone)]
pub struct UiThread {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    thread_id: ThreadId,
    event_tx: mpsc::UnboundedSender<UiEvent>,
    pending: Arc<watch::Sender<usize>>,
    closing: AtomicBool,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl UiThread {
    /// Start a new UI thread with the given name.
    pub fn spawn(name: impl Into<String>) -> RobotResult<Self> {
        let name = name.into();
        let (event_tx, event_rx) = mpsc::unbounded_channel::<UiEvent>();
        let (pending, _) = watch::channel(0usize);
        let pending = Arc::new(pending);

        let loop_pending = Arc::clone(&pending);
        let loop_name = name.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run_event_loop(&loop_name, event_rx, &loop_pending))
            .map_err(|e| {
                tracing::error!("Failed to spawn UI thread '{}': {}", name, e);
                RobotError::UiThreadUnavailable
            })?;

        let thread_id = join.thread().id();
        tracing::debug!("UI thread '{}' started ({:?})", name, thread_id);

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                thread_id,
                event_tx,
                pending,
                closing: AtomicBool::new(false),
                join: Mutex::new(Some(join)),
            }),
        })
    }

    /// Name of the UI thread.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the loop still accepts work.
    pub fn is_running(&self) -> bool {
        !self.inner.closing.load(Ordering::Acquire) && !self.inner.event_tx.is_closed()
    }

    /// Stop the loop after every already-queued event has run.
    ///
    /// Queued jobs run to completion, including follow-ups they post from
    /// the UI thread while the queue drains. Work posted from any other
    /// thread after this call is rejected with
    /// [`RobotError::UiThreadUnavailable`]. Joins the thread unless called
    /// from the UI thread itself.
    pub fn shutdown(&self) {
        self.inner.closing.store(true, Ordering::Release);
        if self.inner.event_tx.send(UiEvent::Shutdown).is_err() {
            return;
        }
        if self.is_ui_thread() {
            return;
        }
        let join = self
            .inner
            .join
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(join) = join {
            if join.join().is_err() {
                tracing::error!("UI thread '{}' terminated abnormally", self.inner.name);
            }
        }
    }
}

impl UiScheduler for UiThread {
    fn post(&self, job: UiJob) -> RobotResult<()> {
        if self.inner.closing.load(Ordering::Acquire) && !self.is_ui_thread() {
            tracing::warn!("Rejected post to UI thread '{}' - shutting down", self.inner.name);
            return Err(RobotError::UiThreadUnavailable);
        }
        // Count before sending so the idle watch never reads zero while queued
        self.inner.pending.send_modify(|n| *n += 1);
        if self.inner.event_tx.send(UiEvent::Run(job)).is_err() {
            self.inner
                .pending
                .send_modify(|n| *n = n.saturating_sub(1));
            tracing::warn!("Failed to post to UI thread '{}' - loop has stopped", self.inner.name);
            return Err(RobotError::UiThreadUnavailable);
        }
        Ok(())
    }

    fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.inner.thread_id
    }

    fn idle_watch(&self) -> watch::Receiver<usize> {
        self.inner.pending.subscribe()
    }
}

/// Run one job, keeping the loop alive if it panics, then mark it finished.
pub(crate) fn run_job(name: &str, job: UiJob, pending: &watch::Sender<usize>) {
    if catch_unwind(AssertUnwindSafe(job)).is_err() {
        tracing::error!("UI job panicked on '{}'; event loop continues", name);
    }
    pending.send_modify(|n| *n = n.saturating_sub(1));
}

fn run_event_loop(
    name: &str,
    mut event_rx: mpsc::UnboundedReceiver<UiEvent>,
    pending: &watch::Sender<usize>,
) {
    while let Some(event) = event_rx.blocking_recv() {
        match event {
            UiEvent::Run(job) => run_job(name, job, pending),
            UiEvent::Shutdown => break,
        }
    }

    // Finish queued work; jobs may still post follow-ups from this thread
    let mut drained = 0usize;
    while let Ok(event) = event_rx.try_recv() {
        if let UiEvent::Run(job) = event {
            run_job(name, job, pending);
            drained += 1;
        }
    }

    event_rx.close();
    let mut dropped = 0usize;
    while let Ok(event) = event_rx.try_recv() {
        if matches!(event, UiEvent::Run(_)) {
            dropped += 1;
        }
    }
    pending.send_replace(0);

    if drained > 0 {
        tracing::debug!("UI thread '{}' ran {} event(s) queued behind shutdown", name, drained);
    }
    if dropped > 0 {
        tracing::warn!("UI thread '{}' dropped {} late event(s) on shutdown", name, dropped);
    }
    tracing::debug!("UI thread '{}' terminated", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_jobs_run_on_ui_thread() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let on_ui = Arc::new(AtomicBool::new(false));

        let ui_handle = ui.clone();
        let flag = on_ui.clone();
        ui.post(Box::new(move || flag.store(ui_handle.is_ui_thread(), Ordering::SeqCst)))
            .unwrap();
        ui.shutdown();

        assert!(on_ui.load(Ordering::SeqCst));
        assert!(!ui.is_ui_thread());
    }

    #[test]
    fn test_post_after_shutdown_is_rejected() {
        let ui = UiThread::spawn("test-ui").unwrap();
        ui.shutdown();

        let result = ui.post(Box::new(|| {}));
        assert!(matches!(result, Err(RobotError::UiThreadUnavailable)));
        assert!(!ui.is_running());
        assert_eq!(*ui.idle_watch().borrow(), 0);
    }

    #[test]
    fn test_panicking_job_does_not_stop_loop() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        ui.post(Box::new(|| panic!("bad job"))).unwrap();
        let c = counter.clone();
        ui.post(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }))
        .unwrap();
        ui.shutdown();

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_count_tracks_queue() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let idle = ui.idle_watch();

        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        ui.post(Box::new(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        }))
        .unwrap();
        ui.post(Box::new(|| {})).unwrap();
        assert_eq!(*idle.borrow(), 2);

        release_tx.send(()).unwrap();
        ui.shutdown();
        assert_eq!(*idle.borrow(), 0);
    }

    #[test]
    fn test_run_job_survives_panic_and_clears_pending() {
        let (pending, idle) = watch::channel(1usize);
        run_job("test-ui", Box::new(|| panic!("bad job")), &pending);
        assert_eq!(*idle.borrow(), 0);
    }

    #[test]
    fn test_follow_up_posted_during_shutdown_still_runs() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let follow_up_ran = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = std::sync::mpsc::channel::<()>();

        let handle = ui.clone();
        let flag = follow_up_ran.clone();
        ui.post(Box::new(move || {
            let _ = started_tx.send(());
            // Give the test thread time to queue the shutdown marker
            thread::sleep(Duration::from_millis(50));
            let posted = handle.post(Box::new(move || flag.store(true, Ordering::SeqCst)));
            assert!(posted.is_ok());
        }))
        .unwrap();

        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        ui.shutdown();

        assert!(follow_up_ran.load(Ordering::SeqCst));
        assert_eq!(*ui.idle_watch().borrow(), 0);
    }

    #[test]
    fn test_post_from_other_thread_rejected_once_closing() {
        let ui = UiThread::spawn("test-ui").unwrap();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        ui.post(Box::new(move || {
            let _ = release_rx.recv_timeout(Duration::from_secs(5));
        }))
        .unwrap();

        let closer = ui.clone();
        let shutdown = thread::spawn(move || closer.shutdown());
        while ui.is_running() {
            thread::yield_now();
        }

        let result = ui.post(Box::new(|| {}));
        assert!(matches!(result, Err(RobotError::UiThreadUnavailable)));

        release_tx.send(()).unwrap();
        shutdown.join().unwrap();
    }
}
