use crate::error::{RobotError, RobotResult};
use crate::metrics::Metrics;
use crate::models::{Widget, WidgetId, WidgetKind};
use crate::services::input::{InputEvent, InputSource, Key};
use crate::state::WidgetTree;
use crate::ui::bridge::ExecutionBridge;
use crate::ui::idle::IdleBarrier;
use crate::ui::task::{UiQuery, query};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Intent-level operations a driver can perform on a widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click,
    Toggle,
    SelectIndex(usize),
    SelectItem(String),
    SlideTo(i64),
    EnterText(String),
    DeleteText,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::Toggle => write!(f, "toggle"),
            Self::SelectIndex(index) => write!(f, "select index {}", index),
            Self::SelectItem(item) => write!(f, "select item '{}'", item),
            Self::SlideTo(value) => write!(f, "slide to {}", value),
            Self::EnterText(text) => write!(f, "enter text '{}'", text),
            Self::DeleteText => write!(f, "delete text"),
        }
    }
}

/// Per-widget-kind behavior plugged into the generic driver pipeline.
///
/// The pipeline always runs: precondition, input injection, idle wait,
/// postcondition. A strategy only decides what each step means for its kind.
pub trait DriverStrategy: Send + Sync {
    /// Whether this strategy knows how to perform `action`.
    fn supports(&self, action: &Action) -> bool;

    /// Kind-specific checks before anything is dispatched.
    fn precondition(&self, _widget: &Widget, _action: &Action) -> RobotResult<()> {
        Ok(())
    }

    /// Input events that carry out `action`.
    fn inputs(&self, widget: &Widget, action: &Action) -> RobotResult<Vec<InputEvent>>;

    /// Checks once the UI thread is idle again.
    fn postcondition(&self, _before: &Widget, _after: &Widget, _action: &Action) -> RobotResult<()> {
        Ok(())
    }
}

/// Plain buttons: click only.
pub struct ButtonStrategy;

impl DriverStrategy for ButtonStrategy {
    fn supports(&self, action: &Action) -> bool {
        matches!(action, Action::Click)
    }

    fn inputs(&self, widget: &Widget, _action: &Action) -> RobotResult<Vec<InputEvent>> {
        Ok(vec![InputEvent::click(widget.id)])
    }
}

/// Toggle buttons and check boxes.
pub struct ToggleStrategy;

impl DriverStrategy for ToggleStrategy {
    fn supports(&self, action: &Action) -> bool {
        matches!(action, Action::Click | Action::Toggle)
    }

    fn inputs(&self, widget: &Widget, _action: &Action) -> RobotResult<Vec<InputEvent>> {
        Ok(vec![InputEvent::click(widget.id)])
    }

    fn postcondition(&self, before: &Widget, after: &Widget, _action: &Action) -> RobotResult<()> {
        if after.selected == before.selected {
            return Err(RobotError::assertion_failed(
                "selected",
                !before.selected,
                after.selected,
            ));
        }
        Ok(())
    }
}

/// Sliders, moved with arrow keys one step at a time.
pub struct SliderStrategy;

impl DriverStrategy for SliderStrategy {
    fn supports(&self, action: &Action) -> bool {
        matches!(action, Action::SlideTo(_))
    }

    fn precondition(&self, widget: &Widget, action: &Action) -> RobotResult<()> {
        if let Action::SlideTo(value) = action {
            if *value < widget.minimum || *value > widget.maximum {
                return Err(RobotError::action_failed(format!(
                    "Value <{}> is not within the boundaries <{}> and <{}> of {}",
                    value,
                    widget.minimum,
                    widget.maximum,
                    widget.describe()
                )));
            }
        }
        Ok(())
    }

    fn inputs(&self, widget: &Widget, action: &Action) -> RobotResult<Vec<InputEvent>> {
        let Action::SlideTo(target) = action else {
            return Ok(Vec::new());
        };
        let delta = target - widget.value;
        let key = if delta >= 0 { Key::Right } else { Key::Left };

        let mut events = vec![InputEvent::click(widget.id)];
        events.extend((0..delta.unsigned_abs()).map(|_| InputEvent::key(widget.id, key)));
        Ok(events)
    }

    fn postcondition(&self, _before: &Widget, after: &Widget, action: &Action) -> RobotResult<()> {
        if let Action::SlideTo(target) = action {
            if after.value != *target {
                return Err(RobotError::assertion_failed("value", target, after.value));
            }
        }
        Ok(())
    }
}

/// Tabbed panes and combo boxes: widgets with an item list.
pub struct ItemListStrategy;

impl ItemListStrategy {
    fn resolve_index(widget: &Widget, action: &Action) -> RobotResult<usize> {
        match action {
            Action::SelectIndex(_) if widget.items.is_empty() => Err(RobotError::action_failed(
                format!("{} has no items to select", widget.describe()),
            )),
            Action::SelectIndex(index) => {
                if *index >= widget.items.len() {
                    return Err(RobotError::action_failed(format!(
                        "Item index ({}) should be between [0] and [{}] (inclusive) for {}",
                        index,
                        widget.items.len() - 1,
                        widget.describe()
                    )));
                }
                Ok(*index)
            }
            Action::SelectItem(item) => widget
                .items
                .iter()
                .position(|candidate| candidate == item)
                .ok_or_else(|| {
                    RobotError::action_failed(format!(
                        "Unable to find item '{}' among {:?} of {}",
                        item,
                        widget.items,
                        widget.describe()
                    ))
                }),
            other => Err(RobotError::action_failed(format!(
                "Cannot {} on {}",
                other,
                widget.describe()
            ))),
        }
    }
}

impl DriverStrategy for ItemListStrategy {
    fn supports(&self, action: &Action) -> bool {
        matches!(action, Action::SelectIndex(_) | Action::SelectItem(_))
    }

    fn precondition(&self, widget: &Widget, action: &Action) -> RobotResult<()> {
        Self::resolve_index(widget, action).map(|_| ())
    }

    fn inputs(&self, widget: &Widget, action: &Action) -> RobotResult<Vec<InputEvent>> {
        let index = Self::resolve_index(widget, action)?;
        Ok(vec![InputEvent::click_item(widget.id, index)])
    }

    fn postcondition(&self, before: &Widget, after: &Widget, action: &Action) -> RobotResult<()> {
        let expected = Self::resolve_index(before, action)?;
        if after.selected_index != Some(expected) {
            return Err(RobotError::assertion_failed(
                "selectedIndex",
                expected,
                after
                    .selected_index
                    .map_or_else(|| "none".to_string(), |i| i.to_string()),
            ));
        }
        Ok(())
    }
}

/// Text fields: type or erase character by character.
pub struct TextStrategy;

impl DriverStrategy for TextStrategy {
    fn supports(&self, action: &Action) -> bool {
        matches!(action, Action::EnterText(_) | Action::DeleteText)
    }

    fn inputs(&self, widget: &Widget, action: &Action) -> RobotResult<Vec<InputEvent>> {
        let mut events = vec![InputEvent::click(widget.id)];
        match action {
            Action::EnterText(text) => {
                events.extend(text.chars().map(|ch| InputEvent::key(widget.id, Key::Char(ch))));
            }
            Action::DeleteText => {
                events.extend(
                    widget
                        .text
                        .chars()
                        .map(|_| InputEvent::key(widget.id, Key::Backspace)),
                );
            }
            _ => {}
        }
        Ok(events)
    }

    fn postcondition(&self, before: &Widget, after: &Widget, action: &Action) -> RobotResult<()> {
        let expected = match action {
            Action::EnterText(text) => format!("{}{}", before.text, text),
            _ => String::new(),
        };
        if after.text != expected {
            return Err(RobotError::assertion_failed("text", expected, &after.text));
        }
        Ok(())
    }
}

/// Snapshot plus showing flag, read on the UI thread.
fn inspect_query(
    tree: Arc<WidgetTree>,
    id: WidgetId,
) -> impl UiQuery<Output = RobotResult<(Widget, bool)>> {
    query(move || {
        Ok(tree
            .snapshot(id)
            .map(|widget| (widget, tree.is_showing(id))))
    })
}

/// Default strategy map, keyed by widget kind.
pub fn default_strategies() -> HashMap<WidgetKind, Arc<dyn DriverStrategy>> {
    let toggle: Arc<dyn DriverStrategy> = Arc::new(ToggleStrategy);
    let items: Arc<dyn DriverStrategy> = Arc::new(ItemListStrategy);

    let mut strategies: HashMap<WidgetKind, Arc<dyn DriverStrategy>> = HashMap::new();
    strategies.insert(WidgetKind::Button, Arc::new(ButtonStrategy));
    strategies.insert(WidgetKind::ToggleButton, Arc::clone(&toggle));
    strategies.insert(WidgetKind::CheckBox, toggle);
    strategies.insert(WidgetKind::Slider, Arc::new(SliderStrategy));
    strategies.insert(WidgetKind::TabbedPane, Arc::clone(&items));
    strategies.insert(WidgetKind::ComboBox, items);
    strategies.insert(WidgetKind::TextField, Arc::new(TextStrategy));
    strategies
}

/// Generic driver: one pipeline for every widget kind.
///
/// 1. Query a snapshot and check it is showing, enabled and the strategy's preconditions
/// 2. Dispatch the strategy's input events
/// 3. Wait for the UI thread to become idle
/// 4. Query a fresh snapshot and check the strategy's postcondition
#[derive(Clone)]
pub struct Driver {
    bridge: ExecutionBridge,
    idle: IdleBarrier,
    input: Arc<dyn InputSource>,
    tree: Arc<WidgetTree>,
    strategies: HashMap<WidgetKind, Arc<dyn DriverStrategy>>,
    click_on_disabled_allowed: bool,
    metrics: Arc<Metrics>,
}

impl Driver {
    pub fn new(
        bridge: ExecutionBridge,
        idle: IdleBarrier,
        input: Arc<dyn InputSource>,
        tree: Arc<WidgetTree>,
    ) -> Self {
        Self {
            bridge,
            idle,
            input,
            tree,
            strategies: default_strategies(),
            click_on_disabled_allowed: false,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Replace or add the strategy for a widget kind.
    pub fn with_strategy(mut self, kind: WidgetKind, strategy: Arc<dyn DriverStrategy>) -> Self {
        self.strategies.insert(kind, strategy);
        self
    }

    /// Skip the enabled check, letting input reach disabled widgets.
    pub fn allow_click_on_disabled(mut self, allowed: bool) -> Self {
        self.click_on_disabled_allowed = allowed;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Perform `action` on widget `id` and return its state afterwards.
    ///
    /// # Errors
    /// - [`RobotError::ActionFailed`] if the action could not be attempted
    /// - [`RobotError::AssertionFailed`] if the widget did not end up as expected
    /// - any bridge or idle-wait error
    pub fn perform(&self, id: WidgetId, action: Action) -> RobotResult<Widget> {
        let result = self.run_pipeline(id, &action);
        self.finish(id, &action, result)
    }

    /// Async counterpart of [`perform`](Self::perform).
    pub async fn perform_async(&self, id: WidgetId, action: Action) -> RobotResult<Widget> {
        let result = self.run_pipeline_async(id, &action).await;
        self.finish(id, &action, result)
    }

    fn run_pipeline(&self, id: WidgetId, action: &Action) -> RobotResult<Widget> {
        let (before, showing) = self.bridge.query(inspect_query(Arc::clone(&self.tree), id))??;
        let strategy = self.prepare(&before, showing, action)?;
        self.dispatch_inputs(strategy, &before, action)?;
        self.idle.wait_for_idle()?;

        let (after, _) = self.bridge.query(inspect_query(Arc::clone(&self.tree), id))??;
        strategy.postcondition(&before, &after, action)?;
        Ok(after)
    }

    async fn run_pipeline_async(&self, id: WidgetId, action: &Action) -> RobotResult<Widget> {
        let (before, showing) = self.bridge.query_async(inspect_query(Arc::clone(&self.tree), id)).await??;
        let strategy = self.prepare(&before, showing, action)?;
        self.dispatch_inputs(strategy, &before, action)?;
        self.idle.wait_for_idle_async().await?;

        let (after, _) = self.bridge.query_async(inspect_query(Arc::clone(&self.tree), id)).await??;
        strategy.postcondition(&before, &after, action)?;
        Ok(after)
    }

    /// Generic and strategy preconditions. Nothing has been dispatched yet.
    fn prepare(
        &self,
        before: &Widget,
        showing: bool,
        action: &Action,
    ) -> RobotResult<&Arc<dyn DriverStrategy>> {
        let strategy = self.strategies.get(&before.kind).ok_or_else(|| {
            RobotError::action_failed(format!("No driver available for {}", before.describe()))
        })?;
        if !strategy.supports(action) {
            return Err(RobotError::action_failed(format!(
                "Cannot {} on {}",
                action,
                before.describe()
            )));
        }
        if !showing {
            return Err(RobotError::action_failed(format!(
                "Expecting component {} to be showing on the screen",
                before.describe()
            )));
        }
        if !before.enabled && !self.click_on_disabled_allowed {
            return Err(RobotError::action_failed(format!(
                "Expecting component {} to be enabled",
                before.describe()
            )));
        }
        strategy.precondition(before, action)?;
        Ok(strategy)
    }

    fn dispatch_inputs(
        &self,
        strategy: &Arc<dyn DriverStrategy>,
        before: &Widget,
        action: &Action,
    ) -> RobotResult<()> {
        for event in strategy.inputs(before, action)? {
            self.input.dispatch(event)?;
        }
        Ok(())
    }

    fn finish(&self, id: WidgetId, action: &Action, result: RobotResult<Widget>) -> RobotResult<Widget> {
        self.metrics.record_action(result.is_ok());
        match &result {
            Ok(_) => tracing::debug!("Performed '{}' on {}", action, id),
            Err(e) => tracing::debug!("'{}' on {} failed: {}", action, id, e),
        }
        result
    }

    /// Current state of `id`, read on the UI thread.
    pub fn snapshot(&self, id: WidgetId) -> RobotResult<Widget> {
        self.bridge
            .query(inspect_query(Arc::clone(&self.tree), id))?
            .map(|(widget, _)| widget)
    }

    /// Async counterpart of [`snapshot`](Self::snapshot).
    pub async fn snapshot_async(&self, id: WidgetId) -> RobotResult<Widget> {
        self.bridge
            .query_async(inspect_query(Arc::clone(&self.tree), id))
            .await?
            .map(|(widget, _)| widget)
    }

    pub fn click(&self, id: WidgetId) -> RobotResult<Widget> {
        self.perform(id, Action::Click)
    }

    pub fn toggle(&self, id: WidgetId) -> RobotResult<Widget> {
        self.perform(id, Action::Toggle)
    }

    pub fn select_index(&self, id: WidgetId, index: usize) -> RobotResult<Widget> {
        self.perform(id, Action::SelectIndex(index))
    }

    pub fn select_item(&self, id: WidgetId, item: impl Into<String>) -> RobotResult<Widget> {
        self.perform(id, Action::SelectItem(item.into()))
    }

    pub fn slide_to(&self, id: WidgetId, value: i64) -> RobotResult<Widget> {
        self.perform(id, Action::SlideTo(value))
    }

    pub fn enter_text(&self, id: WidgetId, text: impl Into<String>) -> RobotResult<Widget> {
        self.perform(id, Action::EnterText(text.into()))
    }

    pub fn delete_text(&self, id: WidgetId) -> RobotResult<Widget> {
        self.perform(id, Action::DeleteText)
    }

    /// Assert the enabled state of `id`.
    pub fn require_enabled(&self, id: WidgetId, expected: bool) -> RobotResult<()> {
        let actual = self.snapshot(id)?.enabled;
        if actual != expected {
            return Err(RobotError::assertion_failed("enabled", expected, actual));
        }
        Ok(())
    }

    /// Assert the text of `id`.
    pub fn require_text(&self, id: WidgetId, expected: &str) -> RobotResult<()> {
        let actual = self.snapshot(id)?.text;
        if actual != expected {
            return Err(RobotError::assertion_failed("text", expected, actual));
        }
        Ok(())
    }

    /// Assert the toggle state of `id`.
    pub fn require_selected(&self, id: WidgetId, expected: bool) -> RobotResult<()> {
        let actual = self.snapshot(id)?.selected;
        if actual != expected {
            return Err(RobotError::assertion_failed("selected", expected, actual));
        }
        Ok(())
    }
}
