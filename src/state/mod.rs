// Widget tree state
//
// The simulated toolkit's component hierarchy. Reads hand out snapshots;
// every mutation goes through `update()`, which consults the installed
// MutationGuard first and then emits change events for listeners.

use crate::error::{RobotError, RobotResult};
use crate::models::{Widget, WidgetId, WidgetKind};
use crate::ui::guard::MutationGuard;
use indexmap::IndexMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when a widget is modified
///
/// These play the role of toolkit listeners: tests and the demo subscribe to
/// them instead of polling widget state.
#[derive(Clone, Debug, PartialEq)]
pub enum WidgetChange {
    Added {
        id: WidgetId,
        kind: WidgetKind,
    },
    EnabledChanged {
        id: WidgetId,
        enabled: bool,
    },
    VisibilityChanged {
        id: WidgetId,
        visible: bool,
    },
    FocusChanged {
        id: WidgetId,
        focused: bool,
    },
    TextChanged {
        id: WidgetId,
        text: String,
    },
    SelectionChanged {
        id: WidgetId,
        selected: bool,
    },
    ValueChanged {
        id: WidgetId,
        value: i64,
    },
    SelectedIndexChanged {
        id: WidgetId,
        index: Option<usize>,
    },
    ItemsChanged {
        id: WidgetId,
        count: usize,
    },
    Repainted {
        id: WidgetId,
    },
}

/// Thread-safe widget hierarchy with change events
///
/// - Widgets are kept in insertion order, which is also lookup order
/// - [`update()`](Self::update) is the single mutation entry point
/// - [`subscribe()`](Self::subscribe) listens for [`WidgetChange`] events
///
/// Only the UI thread is supposed to call mutating methods. When a
/// [`MutationGuard`] is attached it is checked before every mutation.
pub struct WidgetTree {
    widgets: RwLock<IndexMap<WidgetId, Widget>>,
    next_id: AtomicU64,
    guard: Option<Arc<dyn MutationGuard>>,
    change_tx: broadcast::Sender<WidgetChange>,
}

impl WidgetTree {
    /// Create an empty tree with no mutation guard.
    pub fn new() -> Self {
        let (change_tx, _) = broadcast::channel(256);
        Self {
            widgets: RwLock::new(IndexMap::new()),
            next_id: AtomicU64::new(1),
            guard: None,
            change_tx,
        }
    }

    /// Create an empty tree whose mutations are checked by `guard`.
    pub fn with_guard(guard: Arc<dyn MutationGuard>) -> Self {
        Self {
            guard: Some(guard),
            ..Self::new()
        }
    }

    /// Add a widget, optionally under a parent, and return its id.
    pub fn add(&self, mut widget: Widget, parent: Option<WidgetId>) -> RobotResult<WidgetId> {
        self.check(&widget, "children")?;

        let mut widgets = self.widgets.write().unwrap_or_else(|p| p.into_inner());
        if let Some(parent) = parent {
            if !widgets.contains_key(&parent) {
                return Err(RobotError::ComponentLookup(format!(
                    "parent {} not found",
                    parent
                )));
            }
        }

        let id = WidgetId(self.next_id.fetch_add(1, Ordering::Relaxed));
        widget.id = id;
        widget.parent = parent;
        let kind = widget.kind;
        widgets.insert(id, widget);
        drop(widgets);

        let _ = self.change_tx.send(WidgetChange::Added { id, kind });
        Ok(id)
    }

    /// Snapshot of one widget.
    pub fn snapshot(&self, id: WidgetId) -> RobotResult<Widget> {
        self.read(id, Widget::clone)
    }

    /// Run `f` with read access to one widget.
    pub fn read<F, R>(&self, id: WidgetId, f: F) -> RobotResult<R>
    where
        F: FnOnce(&Widget) -> R,
    {
        let widgets = self.widgets.read().unwrap_or_else(|p| p.into_inner());
        widgets
            .get(&id)
            .map(f)
            .ok_or_else(|| RobotError::ComponentLookup(format!("component {} not found", id)))
    }

    /// Snapshots of every widget, in insertion order.
    pub fn snapshot_all(&self) -> Vec<Widget> {
        self.widgets
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect()
    }

    /// Direct children of `id`, in insertion order.
    pub fn children(&self, id: WidgetId) -> Vec<WidgetId> {
        self.widgets
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|w| w.parent == Some(id))
            .map(|w| w.id)
            .collect()
    }

    /// Whether the widget and all of its ancestors are visible.
    pub fn is_showing(&self, id: WidgetId) -> bool {
        let widgets = self.widgets.read().unwrap_or_else(|p| p.into_inner());
        let mut current = widgets.get(&id);
        while let Some(widget) = current {
            if !widget.visible {
                return false;
            }
            current = widget.parent.and_then(|parent| widgets.get(&parent));
        }
        true
    }

    /// Number of widgets.
    pub fn len(&self) -> usize {
        self.widgets.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutate one widget and emit change events
    ///
    /// This is the single mutation entry point. It:
    /// 1. Checks the mutation guard (a strict guard aborts before anything changes)
    /// 2. Applies `update_fn`
    /// 3. Detects what changed and broadcasts it
    ///
    /// # Arguments
    /// * `id` - Widget to mutate
    /// * `property` - Name of the property being mutated, reported on violations
    /// * `update_fn` - The mutation
    ///
    /// # Returns
    /// The change events that were emitted
    pub fn update<F>(
        &self,
        id: WidgetId,
        property: &'static str,
        update_fn: F,
    ) -> RobotResult<Vec<WidgetChange>>
    where
        F: FnOnce(&mut Widget),
    {
        let mut widgets = self.widgets.write().unwrap_or_else(|p| p.into_inner());
        let widget = widgets
            .get_mut(&id)
            .ok_or_else(|| RobotError::ComponentLookup(format!("component {} not found", id)))?;

        self.check(widget, property)?;

        let old = widget.clone();
        update_fn(widget);
        widget.id = old.id;
        widget.parent = old.parent;
        let changes = detect_changes(&old, widget);
        drop(widgets);

        for change in &changes {
            // Ignore send errors - it's OK if no one is listening
            let _ = self.change_tx.send(change.clone());
        }
        Ok(changes)
    }

    /// Focus `id` and clear focus everywhere else.
    pub fn focus(&self, id: WidgetId) -> RobotResult<()> {
        let others: Vec<WidgetId> = self
            .widgets
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|w| w.focused && w.id != id)
            .map(|w| w.id)
            .collect();
        for other in others {
            self.update(other, "focused", |w| w.focused = false)?;
        }
        self.update(id, "focused", |w| w.focused = true)?;
        Ok(())
    }

    /// Subscribe to widget change events.
    pub fn subscribe(&self) -> broadcast::Receiver<WidgetChange> {
        self.change_tx.subscribe()
    }

    fn check(&self, widget: &Widget, property: &'static str) -> RobotResult<()> {
        match &self.guard {
            Some(guard) => guard.check_current_thread(widget, property),
            None => Ok(()),
        }
    }
}

impl Default for WidgetTree {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_changes(old: &Widget, new: &Widget) -> Vec<WidgetChange> {
    let id = new.id;
    let mut changes = Vec::new();

    if old.enabled != new.enabled {
        changes.push(WidgetChange::EnabledChanged {
            id,
            enabled: new.enabled,
        });
    }
    if old.visible != new.visible {
        changes.push(WidgetChange::VisibilityChanged {
            id,
            visible: new.visible,
        });
    }
    if old.focused != new.focused {
        changes.push(WidgetChange::FocusChanged {
            id,
            focused: new.focused,
        });
    }
    if old.text != new.text {
        changes.push(WidgetChange::TextChanged {
            id,
            text: new.text.clone(),
        });
    }
    if old.selected != new.selected {
        changes.push(WidgetChange::SelectionChanged {
            id,
            selected: new.selected,
        });
    }
    if old.value != new.value {
        changes.push(WidgetChange::ValueChanged {
            id,
            value: new.value,
        });
    }
    if old.items != new.items {
        changes.push(WidgetChange::ItemsChanged {
            id,
            count: new.items.len(),
        });
    }
    if old.selected_index != new.selected_index {
        changes.push(WidgetChange::SelectedIndexChanged {
            id,
            index: new.selected_index,
        });
    }
    if old.repaints != new.repaints {
        changes.push(WidgetChange::Repainted { id });
    }

    changes
}
