use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a widget inside a [`WidgetTree`](crate::state::WidgetTree).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WidgetId(pub u64);

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Widget kinds understood by the simulated toolkit.
///
/// The kind doubles as the capability tag drivers are keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetKind {
    Window,
    Panel,
    Label,
    Button,
    ToggleButton,
    CheckBox,
    Slider,
    TabbedPane,
    ComboBox,
    TextField,
}

impl WidgetKind {
    /// Whether clicking flips the `selected` flag.
    pub fn is_toggleable(self) -> bool {
        matches!(self, Self::ToggleButton | Self::CheckBox)
    }

    /// Whether the widget exposes an item list with a selected index.
    pub fn has_items(self) -> bool {
        matches!(self, Self::TabbedPane | Self::ComboBox)
    }

    /// Whether the widget can take keyboard focus.
    pub fn is_focusable(self) -> bool {
        !matches!(self, Self::Window | Self::Panel | Self::Label)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// State of a single widget in the simulated toolkit.
///
/// Only the UI thread mutates a live widget; everything handed to calling
/// threads is a cloned snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: WidgetId,
    pub name: String,
    pub kind: WidgetKind,
    pub parent: Option<WidgetId>,

    pub enabled: bool,
    pub visible: bool,
    pub focused: bool,

    /// Label text, button caption or text-field content
    pub text: String,

    /// Toggle state for toggle buttons and check boxes
    pub selected: bool,

    /// Slider value and bounds
    pub value: i64,
    pub minimum: i64,
    pub maximum: i64,

    /// Tab titles or combo box entries
    pub items: Vec<String>,
    pub selected_index: Option<usize>,

    /// Number of repaints processed, bumped by the UI thread after each input
    pub repaints: u64,
}

impl Widget {
    /// Create a widget with toolkit defaults: enabled, visible, empty.
    pub fn new(name: impl Into<String>, kind: WidgetKind) -> Self {
        Self {
            id: WidgetId(0),
            name: name.into(),
            kind,
            parent: None,
            enabled: true,
            visible: true,
            focused: false,
            text: String::new(),
            selected: false,
            value: 0,
            minimum: 0,
            maximum: 100,
            items: Vec::new(),
            selected_index: None,
            repaints: 0,
        }
    }

    /// Builder: set the text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Builder: set slider bounds and initial value.
    pub fn with_range(mut self, minimum: i64, maximum: i64, value: i64) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self.value = value.clamp(minimum, maximum);
        self
    }

    /// Builder: set item list, selecting the first entry if any.
    pub fn with_items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items = items.into_iter().map(Into::into).collect();
        self.selected_index = if self.items.is_empty() { None } else { Some(0) };
        self
    }

    /// Builder: set the enabled flag.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder: set the visible flag.
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Builder: set the toggle state.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Text of the currently selected item, if any.
    pub fn selected_item(&self) -> Option<&str> {
        self.selected_index
            .and_then(|index| self.items.get(index))
            .map(String::as_str)
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        format!("{}[name='{}', id={}]", self.kind, self.name, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widget_defaults() {
        let widget = Widget::new("ok", WidgetKind::Button);
        assert!(widget.enabled);
        assert!(widget.visible);
        assert!(!widget.focused);
        assert_eq!(widget.selected_index, None);
    }

    #[test]
    fn test_with_range_clamps_value() {
        let slider = Widget::new("volume", WidgetKind::Slider).with_range(0, 10, 42);
        assert_eq!(slider.value, 10);
    }

    #[test]
    fn test_with_items_selects_first() {
        let tabs = Widget::new("tabs", WidgetKind::TabbedPane).with_items(["One", "Two"]);
        assert_eq!(tabs.selected_index, Some(0));
        assert_eq!(tabs.selected_item(), Some("One"));
    }

    #[test]
    fn test_describe() {
        let widget = Widget::new("ok", WidgetKind::Button);
        assert_eq!(widget.describe(), "Button[name='ok', id=#0]");
    }
}
