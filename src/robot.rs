// Robot - Wires the UI thread, bridge, idle barrier, detector and drivers together
//
// This is the explicit context handed to tests. Nothing here is a hidden
// global: a test process creates one Robot during suite setup and passes it
// (or clones of its parts) to whatever needs UI access.

use crate::error::RobotResult;
use crate::metrics::Metrics;
use crate::models::{DetectorMode, RobotSettings, Widget, WidgetId};
use crate::services::{Driver, InputSource, Locator, SimulatedInput};
use crate::state::WidgetTree;
use crate::ui::{
    ExecutionBridge, IdleBarrier, ThreadViolationDetector, UiQuery, UiScheduler, UiTask, UiThread,
    query,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Functional-testing robot over the simulated widget toolkit
///
/// # Example
/// ```ignore
/// let robot = Robot::launch(RobotSettings::default())?;
/// let toggle = robot.add_widget(Widget::new("bold", WidgetKind::ToggleButton), None)?;
///
/// robot.input().dispatch(InputEvent::click(toggle))?;
/// robot.wait_for_idle()?;
/// assert!(robot.driver().snapshot(toggle)?.selected);
///
/// robot.shutdown();
/// ```
pub struct Robot {
    /// Owned runtime for bounded waits; `None` when an external handle was supplied
    runtime: Option<tokio::runtime::Runtime>,
    ui: UiThread,
    tree: Arc<WidgetTree>,
    detector: Arc<ThreadViolationDetector>,
    bridge: ExecutionBridge,
    idle: IdleBarrier,
    input: Arc<SimulatedInput>,
    locator: Locator,
    driver: Driver,
    metrics: Arc<Metrics>,
    settings: RobotSettings,
}

impl Robot {
    /// Start a robot with its own UI thread and timer runtime.
    ///
    /// # Errors
    /// Fails if the runtime or the UI thread cannot be started.
    pub fn launch(settings: RobotSettings) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .worker_threads(1)
            .thread_name("guirobot-timer")
            .build()
            .context("Failed to build robot timer runtime")?;
        let handle = runtime.handle().clone();
        let mut robot = Self::launch_with_runtime(settings, handle)?;
        robot.runtime = Some(runtime);
        Ok(robot)
    }

    /// Start a robot using an existing multi-thread tokio runtime for waits.
    pub fn launch_with_runtime(
        settings: RobotSettings,
        runtime: tokio::runtime::Handle,
    ) -> Result<Self> {
        let ui = UiThread::spawn(settings.ui_thread_name.clone())
            .context("Failed to start the UI thread")?;
        let scheduler: Arc<dyn UiScheduler> = Arc::new(ui.clone());
        let metrics = Arc::new(Metrics::new());

        let detector = Arc::new(ThreadViolationDetector::new(Arc::clone(&scheduler)));
        detector.install(settings.detector);
        let tree = Arc::new(WidgetTree::with_guard(detector.clone()));

        let bridge = ExecutionBridge::new(
            Arc::clone(&scheduler),
            runtime.clone(),
            settings.execution_timeout(),
        )
        .with_metrics(Arc::clone(&metrics));
        let idle = IdleBarrier::new(Arc::clone(&scheduler), runtime, settings.idle_timeout())
            .with_metrics(Arc::clone(&metrics));
        let input = Arc::new(
            SimulatedInput::new(Arc::clone(&scheduler), Arc::clone(&tree))
                .with_delay(settings.delay_between_events())
                .with_metrics(Arc::clone(&metrics)),
        );
        let locator = Locator::new(bridge.clone(), Arc::clone(&tree));
        let driver = Driver::new(
            bridge.clone(),
            idle.clone(),
            input.clone() as Arc<dyn InputSource>,
            Arc::clone(&tree),
        )
        .allow_click_on_disabled(settings.click_on_disabled_allowed)
        .with_metrics(Arc::clone(&metrics));

        tracing::info!(
            "Robot launched: ui_thread={}, detector={:?}, execution_timeout={:?}, idle_timeout={:?}",
            ui.name(),
            settings.detector,
            settings.execution_timeout(),
            settings.idle_timeout()
        );

        Ok(Self {
            runtime: None,
            ui,
            tree,
            detector,
            bridge,
            idle,
            input,
            locator,
            driver,
            metrics,
            settings,
        })
    }

    pub fn settings(&self) -> &RobotSettings {
        &self.settings
    }

    pub fn ui_thread(&self) -> &UiThread {
        &self.ui
    }

    pub fn tree(&self) -> &Arc<WidgetTree> {
        &self.tree
    }

    pub fn detector(&self) -> &Arc<ThreadViolationDetector> {
        &self.detector
    }

    pub fn bridge(&self) -> &ExecutionBridge {
        &self.bridge
    }

    pub fn idle(&self) -> &IdleBarrier {
        &self.idle
    }

    pub fn input(&self) -> &Arc<SimulatedInput> {
        &self.input
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Change the detector policy for the rest of the session.
    pub fn install_detector(&self, mode: DetectorMode) {
        self.detector.install(mode);
    }

    /// Add a widget on the UI thread and return its id.
    pub fn add_widget(&self, widget: Widget, parent: Option<WidgetId>) -> RobotResult<WidgetId> {
        let tree = Arc::clone(&self.tree);
        self.bridge
            .query(query(move || Ok(tree.add(widget, parent))))?
    }

    /// Run a task on the UI thread. See [`ExecutionBridge::execute`].
    pub fn execute<T: UiTask>(&self, task: T) -> RobotResult<()> {
        self.bridge.execute(task)
    }

    /// Run a query on the UI thread. See [`ExecutionBridge::query`].
    pub fn query<Q: UiQuery>(&self, query: Q) -> RobotResult<Q::Output> {
        self.bridge.query(query)
    }

    /// Block until the UI event queue has drained.
    pub fn wait_for_idle(&self) -> RobotResult<()> {
        self.idle.wait_for_idle()
    }

    /// Async counterpart of [`wait_for_idle`](Self::wait_for_idle).
    pub async fn wait_for_idle_async(&self) -> RobotResult<()> {
        self.idle.wait_for_idle_async().await
    }

    /// Stop the UI thread, log the session metrics and release the runtime.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.ui.is_running() {
            self.ui.shutdown();
            self.metrics.log_summary();
            tracing::info!("Robot shutdown complete");
        }
        if let Some(runtime) = self.runtime.take() {
            // A runtime cannot be shut down with a blocking wait from async code
            if tokio::runtime::Handle::try_current().is_ok() {
                runtime.shutdown_background();
            } else {
                runtime.shutdown_timeout(Duration::from_secs(1));
            }
        }
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        self.stop();
    }
}
