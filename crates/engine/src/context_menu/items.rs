//! Menu item model, composition, and resolution.
//!
//! Items are built as [`MenuItem`] values (which may carry closures), then
//! composed against a pattern from settings, then resolved into plain
//! [`ResolvedItem`]s with every predicate evaluated. Only resolved items
//! reach the menu state machine.

use std::fmt;
use std::rc::Rc;

use overgrid_config::{ContextMenuSetting, ItemOverride};
use serde_json::Value;

use crate::error::Result;
use crate::grid::{GridContext, SelectionContext};

/// Key (and label) of a non-interactive divider.
pub const SEPARATOR: &str = "---------";

/// What predicates and labels get to look at.
pub struct MenuContext<'a> {
    pub selection: &'a SelectionContext,
    pub grid: &'a GridContext,
}

/// What a command callback gets.
pub struct CommandContext<'a> {
    pub key: &'a str,
    pub selection: &'a SelectionContext,
    pub grid: &'a GridContext,
    pub params: &'a [Value],
}

impl CommandContext<'_> {
    pub fn menu(&self) -> MenuContext<'_> {
        MenuContext { selection: self.selection, grid: self.grid }
    }
}

pub type Predicate = Rc<dyn Fn(&MenuContext<'_>) -> bool>;
pub type Command = Rc<dyn Fn(&CommandContext<'_>) -> Result<()>>;

#[derive(Clone)]
pub enum Label {
    Static(String),
    Dynamic(Rc<dyn Fn(&MenuContext<'_>) -> String>),
}

impl Label {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&MenuContext<'_>) -> String + 'static,
    {
        Label::Dynamic(Rc::new(f))
    }

    pub fn resolve(&self, cx: &MenuContext<'_>) -> String {
        match self {
            Label::Static(s) => s.clone(),
            Label::Dynamic(f) => f(cx),
        }
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Static(s) => write!(f, "{s:?}"),
            Label::Dynamic(_) => f.write_str("<dynamic>"),
        }
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Label::Static(s.to_string())
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Label::Static(s)
    }
}

#[derive(Clone)]
pub struct ActionItem {
    pub key: String,
    pub name: Label,
    pub callback: Option<Command>,
    pub disabled: Option<Predicate>,
    pub hidden: Option<Predicate>,
}

impl ActionItem {
    pub fn new(key: impl Into<String>, name: impl Into<Label>) -> Self {
        Self { key: key.into(), name: name.into(), callback: None, disabled: None, hidden: None }
    }

    pub fn on_execute<F>(mut self, f: F) -> Self
    where
        F: Fn(&CommandContext<'_>) -> Result<()> + 'static,
    {
        self.callback = Some(Rc::new(f));
        self
    }

    pub fn disabled_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&MenuContext<'_>) -> bool + 'static,
    {
        self.disabled = Some(Rc::new(f));
        self
    }

    pub fn hidden_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&MenuContext<'_>) -> bool + 'static,
    {
        self.hidden = Some(Rc::new(f));
        self
    }
}

#[derive(Clone)]
pub struct SubmenuItem {
    pub key: String,
    pub name: Label,
    pub items: Vec<MenuItem>,
    pub disabled: Option<Predicate>,
    pub hidden: Option<Predicate>,
}

impl SubmenuItem {
    pub fn new(key: impl Into<String>, name: impl Into<Label>, items: Vec<MenuItem>) -> Self {
        Self { key: key.into(), name: name.into(), items, disabled: None, hidden: None }
    }

    pub fn disabled_when<F>(mut self, f: F) -> Self
    where
        F: Fn(&MenuContext<'_>) -> bool + 'static,
    {
        self.disabled = Some(Rc::new(f));
        self
    }
}

#[derive(Clone)]
pub enum MenuItem {
    Separator,
    Action(ActionItem),
    Submenu(SubmenuItem),
}

impl MenuItem {
    pub fn key(&self) -> &str {
        match self {
            MenuItem::Separator => SEPARATOR,
            MenuItem::Action(a) => &a.key,
            MenuItem::Submenu(s) => &s.key,
        }
    }

    pub fn is_separator(&self) -> bool {
        matches!(self, MenuItem::Separator)
    }

    fn name_mut(&mut self) -> Option<&mut Label> {
        match self {
            MenuItem::Separator => None,
            MenuItem::Action(a) => Some(&mut a.name),
            MenuItem::Submenu(s) => Some(&mut s.name),
        }
    }

    fn disabled_mut(&mut self) -> Option<&mut Option<Predicate>> {
        match self {
            MenuItem::Separator => None,
            MenuItem::Action(a) => Some(&mut a.disabled),
            MenuItem::Submenu(s) => Some(&mut s.disabled),
        }
    }

    fn hidden_mut(&mut self) -> Option<&mut Option<Predicate>> {
        match self {
            MenuItem::Separator => None,
            MenuItem::Action(a) => Some(&mut a.hidden),
            MenuItem::Submenu(s) => Some(&mut s.hidden),
        }
    }
}

impl From<ActionItem> for MenuItem {
    fn from(item: ActionItem) -> Self {
        MenuItem::Action(item)
    }
}

impl From<SubmenuItem> for MenuItem {
    fn from(item: SubmenuItem) -> Self {
        MenuItem::Submenu(item)
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuItem::Separator => f.write_str("Separator"),
            MenuItem::Action(a) => f
                .debug_struct("Action")
                .field("key", &a.key)
                .field("name", &a.name)
                .field("callback", &a.callback.is_some())
                .finish(),
            MenuItem::Submenu(s) => f
                .debug_struct("Submenu")
                .field("key", &s.key)
                .field("name", &s.name)
                .field("items", &s.items)
                .finish(),
        }
    }
}

// =============================================================================
// Composition
// =============================================================================

/// One entry of an explicit ordering.
#[derive(Debug, Clone)]
pub enum PatternEntry {
    /// Reuse the predefined item with this key (or a separator).
    Key(String),
    /// A full item. Matching a predefined key merges into it.
    Item(MenuItem),
}

/// How to derive the final item list from the predefined one.
#[derive(Debug, Clone, Default)]
pub enum ItemsPattern {
    /// Predefined items in predefined order.
    #[default]
    Default,
    /// Complete ordering. Keys not predefined become label-only items.
    Keys(Vec<PatternEntry>),
    /// Predefined ordering, with per-key overrides. Keys not predefined are
    /// appended as label-only items.
    Overrides(Vec<ItemOverride>),
}

impl ItemsPattern {
    pub fn from_setting(setting: &ContextMenuSetting) -> Self {
        match setting {
            ContextMenuSetting::Toggle(_) => ItemsPattern::Default,
            ContextMenuSetting::Keys(keys) => {
                ItemsPattern::Keys(keys.iter().cloned().map(PatternEntry::Key).collect())
            }
            ContextMenuSetting::Options(opts) => ItemsPattern::Overrides(opts.items.clone()),
        }
    }
}

/// An item with no command, labelled by its key unless a name is given.
fn label_only(key: &str, name: Option<&str>) -> MenuItem {
    log::debug!("Context menu item '{}' is not predefined, adding it as a label", key);
    MenuItem::Action(ActionItem::new(key, name.unwrap_or(key)))
}

fn constant(value: bool) -> Predicate {
    Rc::new(move |_: &MenuContext<'_>| value)
}

/// Merge a caller-supplied item into a predefined one. Fields the caller
/// leaves unset keep the predefined behaviour.
fn merge_item(base: &MenuItem, custom: &MenuItem) -> MenuItem {
    match (base, custom) {
        (MenuItem::Action(b), MenuItem::Action(c)) => MenuItem::Action(ActionItem {
            key: b.key.clone(),
            name: c.name.clone(),
            callback: c.callback.clone().or_else(|| b.callback.clone()),
            disabled: c.disabled.clone().or_else(|| b.disabled.clone()),
            hidden: c.hidden.clone().or_else(|| b.hidden.clone()),
        }),
        (MenuItem::Submenu(b), MenuItem::Submenu(c)) => MenuItem::Submenu(SubmenuItem {
            key: b.key.clone(),
            name: c.name.clone(),
            items: if c.items.is_empty() { b.items.clone() } else { c.items.clone() },
            disabled: c.disabled.clone().or_else(|| b.disabled.clone()),
            hidden: c.hidden.clone().or_else(|| b.hidden.clone()),
        }),
        _ => custom.clone(),
    }
}

fn apply_override(item: &mut MenuItem, ov: &ItemOverride) {
    if let (Some(name), Some(slot)) = (&ov.name, item.name_mut()) {
        *slot = Label::Static(name.clone());
    }
    if let (Some(disabled), Some(slot)) = (ov.disabled, item.disabled_mut()) {
        *slot = Some(constant(disabled));
    }
    if let (Some(hidden), Some(slot)) = (ov.hidden, item.hidden_mut()) {
        *slot = Some(constant(hidden));
    }
}

/// Pure: derive the item list from `predefined` and `pattern`.
pub fn compose_items(predefined: &[MenuItem], pattern: &ItemsPattern) -> Vec<MenuItem> {
    let find = |key: &str| predefined.iter().find(|item| item.key() == key);

    match pattern {
        ItemsPattern::Default => predefined.to_vec(),
        ItemsPattern::Keys(entries) => entries
            .iter()
            .map(|entry| match entry {
                PatternEntry::Key(key) if key == SEPARATOR => MenuItem::Separator,
                PatternEntry::Key(key) => find(key).cloned().unwrap_or_else(|| label_only(key, None)),
                PatternEntry::Item(item) => match find(item.key()) {
                    Some(base) if !item.is_separator() => merge_item(base, item),
                    _ => item.clone(),
                },
            })
            .collect(),
        ItemsPattern::Overrides(overrides) => {
            let mut items = predefined.to_vec();
            for ov in overrides {
                if ov.key == SEPARATOR {
                    continue;
                }
                match items.iter_mut().find(|item| item.key() == ov.key) {
                    Some(item) => apply_override(item, ov),
                    None => {
                        let mut item = label_only(&ov.key, ov.name.as_deref());
                        apply_override(&mut item, ov);
                        items.push(item);
                    }
                }
            }
            items
        }
    }
}

// =============================================================================
// Resolution
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedKind {
    Separator,
    Action,
    Submenu(Vec<ResolvedItem>),
}

/// An item with labels and predicates evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedItem {
    pub key: String,
    pub label: String,
    pub kind: ResolvedKind,
    pub disabled: bool,
}

impl ResolvedItem {
    pub fn is_separator(&self) -> bool {
        matches!(self.kind, ResolvedKind::Separator)
    }

    /// Can be highlighted and activated.
    pub fn is_selectable(&self) -> bool {
        !self.is_separator() && !self.disabled
    }

    pub fn submenu(&self) -> Option<&[ResolvedItem]> {
        match &self.kind {
            ResolvedKind::Submenu(items) => Some(items),
            _ => None,
        }
    }
}

fn evaluate(predicate: &Option<Predicate>, cx: &MenuContext<'_>) -> bool {
    predicate.as_ref().is_some_and(|p| p(cx))
}

/// Evaluate every label and predicate against the current selection, drop
/// hidden items, and tidy separators (no leading, trailing, or doubled).
pub fn resolve(items: &[MenuItem], cx: &MenuContext<'_>) -> Vec<ResolvedItem> {
    let mut resolved: Vec<ResolvedItem> = Vec::with_capacity(items.len());
    for item in items {
        let next = match item {
            MenuItem::Separator => ResolvedItem {
                key: SEPARATOR.to_string(),
                label: String::new(),
                kind: ResolvedKind::Separator,
                disabled: true,
            },
            MenuItem::Action(a) => {
                if evaluate(&a.hidden, cx) {
                    continue;
                }
                ResolvedItem {
                    key: a.key.clone(),
                    label: a.name.resolve(cx),
                    kind: ResolvedKind::Action,
                    disabled: evaluate(&a.disabled, cx),
                }
            }
            MenuItem::Submenu(s) => {
                if evaluate(&s.hidden, cx) {
                    continue;
                }
                ResolvedItem {
                    key: s.key.clone(),
                    label: s.name.resolve(cx),
                    kind: ResolvedKind::Submenu(resolve(&s.items, cx)),
                    disabled: evaluate(&s.disabled, cx),
                }
            }
        };

        if next.is_separator() && resolved.last().map_or(true, ResolvedItem::is_separator) {
            continue;
        }
        resolved.push(next);
    }

    while resolved.last().is_some_and(ResolvedItem::is_separator) {
        resolved.pop();
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::MockGrid;
    use overgrid_config::Settings;

    fn action(key: &str) -> MenuItem {
        ActionItem::new(key, key.to_uppercase()).into()
    }

    fn keys(items: &[MenuItem]) -> Vec<&str> {
        items.iter().map(MenuItem::key).collect()
    }

    fn predefined() -> Vec<MenuItem> {
        vec![action("a"), MenuItem::Separator, action("b"), action("c")]
    }

    #[test]
    fn test_default_pattern_keeps_predefined() {
        let items = compose_items(&predefined(), &ItemsPattern::Default);
        assert_eq!(keys(&items), vec!["a", SEPARATOR, "b", "c"]);
    }

    #[test]
    fn test_key_pattern_replaces_ordering() {
        let pattern = ItemsPattern::Keys(vec![
            PatternEntry::Key("c".into()),
            PatternEntry::Key(SEPARATOR.into()),
            PatternEntry::Key("a".into()),
        ]);
        let items = compose_items(&predefined(), &pattern);
        assert_eq!(keys(&items), vec!["c", SEPARATOR, "a"]);
    }

    #[test]
    fn test_unknown_keys_become_labels_in_both_patterns() {
        let by_key = ItemsPattern::Keys(vec![PatternEntry::Key("a".into()), PatternEntry::Key("nope".into())]);
        let by_override = ItemsPattern::Overrides(vec![ItemOverride {
            key: "nope".into(),
            name: None,
            disabled: None,
            hidden: None,
        }]);

        let cases = [(by_key, vec!["a", "nope"]), (by_override, vec!["a", SEPARATOR, "b", "c", "nope"])];
        for (pattern, expected) in cases {
            let items = compose_items(&predefined(), &pattern);
            assert_eq!(keys(&items), expected);
            match items.last() {
                Some(MenuItem::Action(a)) => {
                    assert!(matches!(&a.name, Label::Static(s) if s == "nope"));
                    assert!(a.callback.is_none());
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_item_pattern_reuses_predefined_behaviour() {
        let base = vec![MenuItem::Action(
            ActionItem::new("a", "A").on_execute(|_| Ok(())).disabled_when(|_| true),
        )];
        let pattern = ItemsPattern::Keys(vec![PatternEntry::Item(ActionItem::new("a", "Renamed").into())]);

        let items = compose_items(&base, &pattern);
        match &items[0] {
            MenuItem::Action(a) => {
                assert!(matches!(&a.name, Label::Static(s) if s == "Renamed"));
                assert!(a.callback.is_some());
                assert!(a.disabled.is_some());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_override_pattern_keeps_order() {
        let pattern = ItemsPattern::Overrides(vec![
            ItemOverride { key: "b".into(), name: Some("Bee".into()), disabled: None, hidden: Some(true) },
            ItemOverride { key: "extra".into(), name: None, disabled: Some(true), hidden: None },
        ]);
        let items = compose_items(&predefined(), &pattern);
        assert_eq!(keys(&items), vec!["a", SEPARATOR, "b", "c", "extra"]);

        let grid = MockGrid::new(5, 5).shared();
        let cx = grid.context(Settings::default());
        let selection = cx.selection_context();
        let resolved = resolve(&items, &MenuContext { selection: &selection, grid: &cx });
        let labels: Vec<&str> = resolved.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["A", "", "C", "extra"]);
        assert!(resolved[3].disabled);
    }

    #[test]
    fn test_resolve_tidies_separators() {
        let items = vec![
            MenuItem::Separator,
            action("a"),
            MenuItem::Separator,
            MenuItem::Separator,
            ActionItem::new("gone", "Gone").hidden_when(|_| true).into(),
            action("b"),
            MenuItem::Separator,
        ];
        let grid = MockGrid::new(5, 5).shared();
        let cx = grid.context(Settings::default());
        let selection = cx.selection_context();
        let resolved = resolve(&items, &MenuContext { selection: &selection, grid: &cx });

        let keys: Vec<&str> = resolved.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", SEPARATOR, "b"]);
    }

    #[test]
    fn test_predicates_see_live_selection() {
        let grid = MockGrid::new(5, 5).shared();
        let cx = grid.context(Settings::default());
        let items = vec![MenuItem::from(
            ActionItem::new("x", Label::dynamic(|m| format!("{} ranges", m.selection.ranges.len())))
                .disabled_when(|m| m.selection.corner_only),
        )];

        grid.select_corner();
        let selection = cx.selection_context();
        let resolved = resolve(&items, &MenuContext { selection: &selection, grid: &cx });
        assert!(resolved[0].disabled);
        assert_eq!(resolved[0].label, "1 ranges");
    }
}
