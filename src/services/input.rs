use crate::error::RobotResult;
use crate::metrics::Metrics;
use crate::models::{Widget, WidgetId, WidgetKind};
use crate::state::WidgetTree;
use crate::ui::scheduler::UiScheduler;
use std::sync::Arc;
use std::time::Duration;

/// Keys the simulated keyboard can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Char(char),
}

/// A synthetic input event aimed at one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Mouse click; `item` addresses a tab or list entry inside the widget.
    Click {
        target: WidgetId,
        item: Option<usize>,
    },
    /// Key press delivered to `target`.
    KeyPress { target: WidgetId, key: Key },
}

impl InputEvent {
    pub fn click(target: WidgetId) -> Self {
        Self::Click { target, item: None }
    }

    pub fn click_item(target: WidgetId, item: usize) -> Self {
        Self::Click {
            target,
            item: Some(item),
        }
    }

    pub fn key(target: WidgetId, key: Key) -> Self {
        Self::KeyPress { target, key }
    }

    pub fn target(&self) -> WidgetId {
        match self {
            Self::Click { target, .. } | Self::KeyPress { target, .. } => *target,
        }
    }
}

/// Something able to inject input indistinguishable from a real user.
///
/// Dispatch only enqueues the event; its consequences become visible after
/// the UI thread has processed it (see
/// [`IdleBarrier`](crate::ui::IdleBarrier)).
pub trait InputSource: Send + Sync {
    fn dispatch(&self, event: InputEvent) -> RobotResult<()>;
}

/// Input source for the simulated toolkit.
///
/// Each event is posted to the UI queue. When handled it mutates the target
/// widget the way the toolkit would, then posts a follow-up repaint.
#[derive(Clone)]
pub struct SimulatedInput {
    scheduler: Arc<dyn UiScheduler>,
    tree: Arc<WidgetTree>,
    delay_between_events: Duration,
    metrics: Arc<Metrics>,
}

impl SimulatedInput {
    pub fn new(scheduler: Arc<dyn UiScheduler>, tree: Arc<WidgetTree>) -> Self {
        Self {
            scheduler,
            tree,
            delay_between_events: Duration::ZERO,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Pause after every dispatched event.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_between_events = delay;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl InputSource for SimulatedInput {
    fn dispatch(&self, event: InputEvent) -> RobotResult<()> {
        tracing::trace!("Dispatching {:?}", event);
        let tree = Arc::clone(&self.tree);
        let scheduler = Arc::clone(&self.scheduler);

        self.scheduler.post(Box::new(move || {
            let target = event.target();
            match handle_event(&tree, &event) {
                Ok(true) => {
                    let repaint_tree = Arc::clone(&tree);
                    let repaint = scheduler.post(Box::new(move || {
                        if let Err(e) = repaint_tree.update(target, "repaints", |w| w.repaints += 1) {
                            tracing::warn!("Repaint of {} failed: {}", target, e);
                        }
                    }));
                    if repaint.is_err() {
                        tracing::debug!("UI thread stopped before repaint of {}", target);
                    }
                }
                Ok(false) => tracing::trace!("{:?} ignored by {}", event, target),
                Err(e) => tracing::warn!("Input event {:?} failed: {}", event, e),
            }
        }))?;

        self.metrics.record_input_event();
        if !self.delay_between_events.is_zero() {
            std::thread::sleep(self.delay_between_events);
        }
        Ok(())
    }
}

/// Apply one event to the tree. Runs on the UI thread.
///
/// Returns whether the target reacted (and therefore needs a repaint).
fn handle_event(tree: &WidgetTree, event: &InputEvent) -> RobotResult<bool> {
    let target = event.target();
    let widget = tree.snapshot(target)?;
    if !widget.enabled || !tree.is_showing(target) {
        return Ok(false);
    }

    match event {
        InputEvent::Click { item, .. } => {
            if widget.kind.is_focusable() && !widget.focused {
                tree.focus(target)?;
            }
            click(tree, &widget, *item)
        }
        InputEvent::KeyPress { key, .. } => key_press(tree, &widget, *key),
    }
}

fn click(tree: &WidgetTree, widget: &Widget, item: Option<usize>) -> RobotResult<bool> {
    let id = widget.id;
    match widget.kind {
        kind if kind.is_toggleable() => {
            tree.update(id, "selected", |w| w.selected = !w.selected)?;
            Ok(true)
        }
        kind if kind.has_items() => match item {
            Some(index) if index < widget.items.len() => {
                tree.update(id, "selectedIndex", |w| w.selected_index = Some(index))?;
                Ok(true)
            }
            _ => Ok(widget.kind.is_focusable()),
        },
        WidgetKind::Button | WidgetKind::TextField | WidgetKind::Slider => Ok(true),
        _ => Ok(false),
    }
}

fn key_press(tree: &WidgetTree, widget: &Widget, key: Key) -> RobotResult<bool> {
    let id = widget.id;
    match (widget.kind, key) {
        (WidgetKind::Slider, Key::Left | Key::Down) => {
            tree.update(id, "value", |w| w.value = (w.value - 1).max(w.minimum))?;
        }
        (WidgetKind::Slider, Key::Right | Key::Up) => {
            tree.update(id, "value", |w| w.value = (w.value + 1).min(w.maximum))?;
        }
        (WidgetKind::Slider, Key::Home) => {
            tree.update(id, "value", |w| w.value = w.minimum)?;
        }
        (WidgetKind::Slider, Key::End) => {
            tree.update(id, "value", |w| w.value = w.maximum)?;
        }
        (WidgetKind::TextField, Key::Char(ch)) => {
            tree.update(id, "text", |w| w.text.push(ch))?;
        }
        (WidgetKind::TextField, Key::Backspace) => {
            tree.update(id, "text", |w| {
                w.text.pop();
            })?;
        }
        (WidgetKind::ToggleButton | WidgetKind::CheckBox, Key::Char(' ')) => {
            tree.update(id, "selected", |w| w.selected = !w.selected)?;
        }
        (WidgetKind::ComboBox, Key::Down) | (WidgetKind::TabbedPane, Key::Right) => {
            tree.update(id, "selectedIndex", |w| {
                let last = w.items.len().saturating_sub(1);
                w.selected_index = w.selected_index.map(|i| (i + 1).min(last));
            })?;
        }
        (WidgetKind::ComboBox, Key::Up) | (WidgetKind::TabbedPane, Key::Left) => {
            tree.update(id, "selectedIndex", |w| {
                w.selected_index = w.selected_index.map(|i| i.saturating_sub(1));
            })?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}
