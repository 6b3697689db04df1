use crate::error::{RobotError, RobotResult};
use crate::models::{Widget, WidgetId, WidgetKind};
use crate::state::WidgetTree;
use crate::ui::bridge::ExecutionBridge;
use crate::ui::task::{UiQuery, query};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Criteria a widget must meet to be found.
///
/// All criteria set on one matcher must hold at the same time.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    name: Option<String>,
    name_pattern: Option<Regex>,
    text: Option<String>,
    kind: Option<WidgetKind>,
    requires_showing: bool,
}

impl Matcher {
    /// Match any widget.
    pub fn any() -> Self {
        Self::default()
    }

    /// Match by exact name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Match names against a regular expression.
    pub fn name_matching(pattern: &str) -> RobotResult<Self> {
        let regex = Regex::new(pattern).map_err(|e| {
            RobotError::ComponentLookup(format!("invalid name pattern '{}': {}", pattern, e))
        })?;
        Ok(Self {
            name_pattern: Some(regex),
            ..Self::default()
        })
    }

    /// Match by kind.
    pub fn of_kind(kind: WidgetKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Additionally require the kind.
    pub fn and_kind(mut self, kind: WidgetKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Additionally require the exact text.
    pub fn and_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Only match widgets that are showing (visible along their ancestry).
    pub fn showing_only(mut self) -> Self {
        self.requires_showing = true;
        self
    }

    fn matches(&self, widget: &Widget, tree: &WidgetTree) -> bool {
        self.name.as_ref().is_none_or(|name| &widget.name == name)
            && self
                .name_pattern
                .as_ref()
                .is_none_or(|pattern| pattern.is_match(&widget.name))
            && self.text.as_ref().is_none_or(|text| &widget.text == text)
            && self.kind.is_none_or(|kind| widget.kind == kind)
            && (!self.requires_showing || tree.is_showing(widget.id))
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(name) = &self.name {
            parts.push(format!("name='{}'", name));
        }
        if let Some(pattern) = &self.name_pattern {
            parts.push(format!("name~/{}/", pattern.as_str()));
        }
        if let Some(text) = &self.text {
            parts.push(format!("text='{}'", text));
        }
        if let Some(kind) = self.kind {
            parts.push(format!("kind={}", kind));
        }
        if self.requires_showing {
            parts.push("showing".to_string());
        }
        if parts.is_empty() {
            write!(f, "[any]")
        } else {
            write!(f, "[{}]", parts.join(", "))
        }
    }
}

/// Finds widgets by running lookups on the UI thread.
///
/// [`find`](Self::find) is strict: exactly one match is required.
#[derive(Clone)]
pub struct Locator {
    bridge: ExecutionBridge,
    tree: Arc<WidgetTree>,
}

impl Locator {
    pub fn new(bridge: ExecutionBridge, tree: Arc<WidgetTree>) -> Self {
        Self { bridge, tree }
    }

    /// Find the single widget matching `matcher`.
    ///
    /// # Errors
    /// [`RobotError::ComponentLookup`] when nothing or more than one widget matches.
    pub fn find(&self, matcher: &Matcher) -> RobotResult<WidgetId> {
        exactly_one(self.find_all(matcher)?, matcher)
    }

    /// Async counterpart of [`find`](Self::find).
    pub async fn find_async(&self, matcher: &Matcher) -> RobotResult<WidgetId> {
        exactly_one(self.find_all_async(matcher).await?, matcher)
    }

    /// Every widget matching `matcher`, in tree order.
    pub fn find_all(&self, matcher: &Matcher) -> RobotResult<Vec<WidgetId>> {
        self.bridge
            .query(matching_query(Arc::clone(&self.tree), matcher.clone()))
    }

    /// Async counterpart of [`find_all`](Self::find_all).
    pub async fn find_all_async(&self, matcher: &Matcher) -> RobotResult<Vec<WidgetId>> {
        self.bridge
            .query_async(matching_query(Arc::clone(&self.tree), matcher.clone()))
            .await
    }

    /// Find the single widget matching `matcher` under `root`.
    pub fn find_in(&self, root: WidgetId, matcher: &Matcher) -> RobotResult<WidgetId> {
        let tree = Arc::clone(&self.tree);
        let scoped = matcher.clone();
        let found: Vec<WidgetId> = self.bridge.query(query(move || {
            Ok(tree
                .snapshot_all()
                .iter()
                .filter(|widget| is_descendant(&tree, widget, root))
                .filter(|widget| scoped.matches(widget, &tree))
                .map(|widget| widget.id)
                .collect::<Vec<_>>())
        }))?;
        match found.as_slice() {
            [single] => Ok(*single),
            [] => Err(RobotError::ComponentLookup(format!(
                "no component found under {} matching {}",
                root, matcher
            ))),
            many => Err(RobotError::ComponentLookup(format!(
                "multiple components found under {} matching {}: {:?}",
                root, matcher, many
            ))),
        }
    }
}

fn matching_query(tree: Arc<WidgetTree>, matcher: Matcher) -> impl UiQuery<Output = Vec<WidgetId>> {
    query(move || {
        Ok(tree
            .snapshot_all()
            .iter()
            .filter(|widget| matcher.matches(widget, &tree))
            .map(|widget| widget.id)
            .collect::<Vec<_>>())
    })
}

fn exactly_one(found: Vec<WidgetId>, matcher: &Matcher) -> RobotResult<WidgetId> {
    match found.as_slice() {
        [single] => Ok(*single),
        [] => Err(RobotError::ComponentLookup(format!(
            "no component found matching {}",
            matcher
        ))),
        many => Err(RobotError::ComponentLookup(format!(
            "multiple components found matching {}: {:?}",
            matcher, many
        ))),
    }
}

fn is_descendant(tree: &WidgetTree, widget: &Widget, root: WidgetId) -> bool {
    let mut parent = widget.parent;
    while let Some(id) = parent {
        if id == root {
            return true;
        }
        parent = tree.read(id, |w| w.parent).ok().flatten();
    }
    false
}
