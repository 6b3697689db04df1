// Thread-violation detector
//
// Installed once per test process. The widget tree calls the guard on every
// mutation; when the detector is uninstalled the check is a no-op.

use crate::error::{RobotError, RobotResult};
use crate::models::{DetectorMode, Widget};
use crate::ui::scheduler::UiScheduler;
use std::sync::{Arc, Mutex, RwLock};
use std::thread;

/// Capability checked on the widget mutation path.
pub trait MutationGuard: Send + Sync {
    /// Called before `property` of `widget` is mutated.
    ///
    /// An error aborts the mutation before anything is applied.
    fn check_current_thread(&self, widget: &Widget, property: &'static str) -> RobotResult<()>;
}

/// A mutation observed outside the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadViolation {
    pub widget: String,
    pub property: &'static str,
    pub thread: String,
}

impl ThreadViolation {
    fn into_error(self) -> RobotError {
        RobotError::ThreadViolation {
            widget: self.widget,
            property: self.property,
            thread: self.thread,
        }
    }
}

/// Detects widget mutation performed off the UI thread.
///
/// State machine: `Off -> Strict | Lenient -> Off`, changed only through
/// [`install`](Self::install) and [`uninstall`](Self::uninstall).
pub struct ThreadViolationDetector {
    scheduler: Arc<dyn UiScheduler>,
    mode: RwLock<DetectorMode>,
    violations: Mutex<Vec<ThreadViolation>>,
}

impl ThreadViolationDetector {
    /// Create an uninstalled detector bound to a UI scheduler.
    pub fn new(scheduler: Arc<dyn UiScheduler>) -> Self {
        Self {
            scheduler,
            mode: RwLock::new(DetectorMode::Off),
            violations: Mutex::new(Vec::new()),
        }
    }

    /// Install with the given policy. Installing `Off` is the same as uninstalling.
    pub fn install(&self, mode: DetectorMode) {
        let mut current = self.mode.write().unwrap_or_else(|p| p.into_inner());
        if *current != mode {
            tracing::info!("Thread-violation detector: {:?} -> {:?}", *current, mode);
        }
        *current = mode;
    }

    /// Remove the detector from the mutation path.
    pub fn uninstall(&self) {
        self.install(DetectorMode::Off);
    }

    /// Current policy.
    pub fn mode(&self) -> DetectorMode {
        *self.mode.read().unwrap_or_else(|p| p.into_inner())
    }

    /// Whether a policy other than `Off` is installed.
    pub fn is_installed(&self) -> bool {
        self.mode() != DetectorMode::Off
    }

    /// Violations recorded so far, in detection order.
    pub fn violations(&self) -> Vec<ThreadViolation> {
        self.violations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Forget recorded violations.
    pub fn clear_violations(&self) {
        self.violations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clear();
    }
}

impl MutationGuard for ThreadViolationDetector {
    fn check_current_thread(&self, widget: &Widget, property: &'static str) -> RobotResult<()> {
        let mode = self.mode();
        if mode == DetectorMode::Off || self.scheduler.is_ui_thread() {
            return Ok(());
        }

        let current = thread::current();
        let violation = ThreadViolation {
            widget: widget.describe(),
            property,
            thread: current
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{:?}", current.id())),
        };
        self.violations
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(violation.clone());

        match mode {
            DetectorMode::Strict => {
                tracing::error!(
                    "Thread violation: {} '{}' mutated on {}",
                    violation.widget,
                    violation.property,
                    violation.thread
                );
                Err(violation.into_error())
            }
            _ => {
                tracing::warn!(
                    "Thread violation: {} '{}' mutated on {}",
                    violation.widget,
                    violation.property,
                    violation.thread
                );
                Ok(())
            }
        }
    }
}
