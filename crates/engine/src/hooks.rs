//! Hook registry: named extension points with ordered listeners.
//!
//! Key invariants:
//! - Dispatch to an unregistered name is a no-op, never an error
//! - Listeners run in registration order, all of them, every time
//! - A listener that fails (returns `Err` or panics) is logged and skipped;
//!   the remaining listeners still run
//! - Listeners talk back to the caller only through mutable payloads
//!   (`&mut Vec<MenuItem>`, `&mut Vec<String>`, ...). When several listeners
//!   write the same field, the last one in registration order wins.
//!
//! The registry is a plain value owned by a grid's [`GridContext`](crate::grid::GridContext),
//! not process-global, so two grids in one process never see each other's
//! listeners.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use overgrid_core::{CellAddress, CellRange, Rect};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::context_menu::MenuItem;
use crate::error::{Error, Result};

/// Interned extension point name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookName(Cow<'static, str>);

impl HookName {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HookName({})", self.0)
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Context menu
pub const AFTER_CONTEXT_MENU_DEFAULT_OPTIONS: HookName =
    HookName::from_static("afterContextMenuDefaultOptions");
pub const BEFORE_CONTEXT_MENU_SET_ITEMS: HookName =
    HookName::from_static("beforeContextMenuSetItems");
pub const BEFORE_CONTEXT_MENU_SHOW: HookName = HookName::from_static("beforeContextMenuShow");
pub const AFTER_CONTEXT_MENU_SHOW: HookName = HookName::from_static("afterContextMenuShow");
pub const BEFORE_CONTEXT_MENU_HIDE: HookName = HookName::from_static("beforeContextMenuHide");
pub const AFTER_CONTEXT_MENU_HIDE: HookName = HookName::from_static("afterContextMenuHide");
pub const AFTER_CONTEXT_MENU_EXECUTE: HookName = HookName::from_static("afterContextMenuExecute");

// Comments
pub const BEFORE_COMMENT_SHOW: HookName = HookName::from_static("beforeCommentShow");
pub const AFTER_COMMENT_SHOW: HookName = HookName::from_static("afterCommentShow");
pub const BEFORE_COMMENT_HIDE: HookName = HookName::from_static("beforeCommentHide");
pub const AFTER_COMMENT_HIDE: HookName = HookName::from_static("afterCommentHide");
pub const AFTER_SET_COMMENT: HookName = HookName::from_static("afterSetComment");
pub const AFTER_REMOVE_COMMENT: HookName = HookName::from_static("afterRemoveComment");

// Grid
pub const AFTER_RENDERER: HookName = HookName::from_static("afterRenderer");
pub const AFTER_SCROLL_VERTICALLY: HookName = HookName::from_static("afterScrollVertically");
pub const AFTER_SCROLL_HORIZONTALLY: HookName = HookName::from_static("afterScrollHorizontally");

// Lifecycle
pub const AFTER_PLUGIN_ENABLE: HookName = HookName::from_static("afterPluginEnable");
pub const AFTER_PLUGIN_DISABLE: HookName = HookName::from_static("afterPluginDisable");

/// Names known to every fresh registry.
pub const BUILTIN_HOOKS: [HookName; 18] = [
    AFTER_CONTEXT_MENU_DEFAULT_OPTIONS,
    BEFORE_CONTEXT_MENU_SET_ITEMS,
    BEFORE_CONTEXT_MENU_SHOW,
    AFTER_CONTEXT_MENU_SHOW,
    BEFORE_CONTEXT_MENU_HIDE,
    AFTER_CONTEXT_MENU_HIDE,
    AFTER_CONTEXT_MENU_EXECUTE,
    BEFORE_COMMENT_SHOW,
    AFTER_COMMENT_SHOW,
    BEFORE_COMMENT_HIDE,
    AFTER_COMMENT_HIDE,
    AFTER_SET_COMMENT,
    AFTER_REMOVE_COMMENT,
    AFTER_RENDERER,
    AFTER_SCROLL_VERTICALLY,
    AFTER_SCROLL_HORIZONTALLY,
    AFTER_PLUGIN_ENABLE,
    AFTER_PLUGIN_DISABLE,
];

/// Payload handed to listeners. Mutable references are the return channel.
pub enum HookEvent<'a> {
    /// Item list open for augmentation (default options, set items).
    MenuItems(&'a mut Vec<MenuItem>),
    /// Menu shown at, or hidden from, a position.
    Menu { geometry: Option<Rect> },
    /// A menu command ran.
    CommandExecuted { key: &'a str, selection: &'a [CellRange] },
    /// Comment overlay show/hide for a cell.
    Comment { address: Option<CellAddress> },
    /// Comment text written (`Some`) or removed (`None`).
    CommentChanged { address: CellAddress, value: Option<&'a str> },
    /// A cell was rendered; listeners append CSS-like class names.
    CellRender { address: CellAddress, classes: &'a mut Vec<String> },
    /// Viewport scrolled.
    Scroll,
    /// A plugin changed lifecycle state.
    Plugin { key: &'a str },
    /// Free-form payload for dynamically registered hooks.
    Custom(&'a mut serde_json::Value),
}

/// Error a listener may return. Dispatch logs it and moves on.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerError(pub String);

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ListenerError {}

impl From<String> for ListenerError {
    fn from(msg: String) -> Self {
        Self(msg)
    }
}

impl From<&str> for ListenerError {
    fn from(msg: &str) -> Self {
        Self(msg.to_string())
    }
}

impl From<Error> for ListenerError {
    fn from(e: Error) -> Self {
        Self(e.to_string())
    }
}

pub type ListenerResult = std::result::Result<(), ListenerError>;
pub type Listener = Rc<dyn Fn(&mut HookEvent<'_>) -> ListenerResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// What `add` does with a name nobody registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HookPolicy {
    /// Reject with a configuration error.
    Strict,
    /// Register the name on the fly.
    #[default]
    Lenient,
}

impl HookPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { HookPolicy::Strict } else { HookPolicy::Lenient }
    }
}

struct Entry {
    id: ListenerId,
    owner: Option<String>,
    listener: Listener,
}

#[derive(Default)]
struct HookTable {
    known: FxHashSet<HookName>,
    listeners: FxHashMap<HookName, Vec<Entry>>,
}

impl HookTable {
    fn with_builtins() -> Self {
        let mut table = Self::default();
        for name in BUILTIN_HOOKS {
            table.known.insert(name);
        }
        table
    }

    fn contains_listener(&self, name: &HookName, id: ListenerId) -> bool {
        self.listeners
            .get(name)
            .is_some_and(|entries| entries.iter().any(|e| e.id == id))
    }
}

pub struct Hooks {
    policy: Cell<HookPolicy>,
    next_id: Cell<u64>,
    table: RefCell<HookTable>,
}

impl Default for Hooks {
    fn default() -> Self {
        Self::new(HookPolicy::default())
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.borrow();
        f.debug_struct("Hooks")
            .field("policy", &self.policy.get())
            .field("known", &table.known.len())
            .field("listeners", &table.listeners.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl Hooks {
    pub fn new(policy: HookPolicy) -> Self {
        Self {
            policy: Cell::new(policy),
            next_id: Cell::new(1),
            table: RefCell::new(HookTable::with_builtins()),
        }
    }

    pub fn policy(&self) -> HookPolicy {
        self.policy.get()
    }

    pub fn set_policy(&self, policy: HookPolicy) {
        self.policy.set(policy);
    }

    /// Add a hook name. Returns false if it was already known.
    pub fn register(&self, name: HookName) -> bool {
        self.table.borrow_mut().known.insert(name)
    }

    pub fn is_registered(&self, name: &HookName) -> bool {
        self.table.borrow().known.contains(name)
    }

    /// Append a listener. `owner` tags it for bulk removal on plugin disable.
    pub fn add<F>(&self, name: &HookName, owner: Option<&str>, listener: F) -> Result<ListenerId>
    where
        F: Fn(&mut HookEvent<'_>) -> ListenerResult + 'static,
    {
        let mut table = self.table.borrow_mut();
        if !table.known.contains(name) {
            match self.policy.get() {
                HookPolicy::Strict => {
                    return Err(Error::Configuration(format!("unknown hook '{name}'")));
                }
                HookPolicy::Lenient => {
                    table.known.insert(name.clone());
                }
            }
        }

        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        table.listeners.entry(name.clone()).or_default().push(Entry {
            id,
            owner: owner.map(str::to_string),
            listener: Rc::new(listener),
        });
        Ok(id)
    }

    /// Remove one listener. Returns false if it was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut table = self.table.borrow_mut();
        for entries in table.listeners.values_mut() {
            if let Some(pos) = entries.iter().position(|e| e.id == id) {
                entries.remove(pos);
                return true;
            }
        }
        false
    }

    /// Remove every listener tagged with `owner`. Returns how many went.
    pub fn remove_owner(&self, owner: &str) -> usize {
        let mut table = self.table.borrow_mut();
        let mut removed = 0;
        for entries in table.listeners.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.owner.as_deref() != Some(owner));
            removed += before - entries.len();
        }
        removed
    }

    pub fn listener_count(&self, name: &HookName) -> usize {
        self.table.borrow().listeners.get(name).map_or(0, Vec::len)
    }

    pub fn owner_count(&self, owner: &str) -> usize {
        self.table
            .borrow()
            .listeners
            .values()
            .flatten()
            .filter(|e| e.owner.as_deref() == Some(owner))
            .count()
    }

    /// Drop all listeners and forget dynamically registered names.
    pub fn reset(&self) {
        *self.table.borrow_mut() = HookTable::with_builtins();
    }

    /// Run every listener for `name` in registration order.
    ///
    /// Returns the number of listeners that completed without error.
    ///
    /// Dispatch works over a snapshot, so listeners may add or remove
    /// listeners freely. A listener removed by an earlier one in the same
    /// dispatch is skipped. A listener that dispatches the same hook again
    /// recurses; nothing here bounds that, keeping it finite is the
    /// listener's job.
    pub fn run(&self, name: &HookName, event: &mut HookEvent<'_>) -> usize {
        let snapshot: Vec<(ListenerId, Listener)> = {
            let table = self.table.borrow();
            match table.listeners.get(name) {
                Some(entries) => entries.iter().map(|e| (e.id, Rc::clone(&e.listener))).collect(),
                None => return 0,
            }
        };

        let mut completed = 0;
        for (id, listener) in snapshot {
            if !self.table.borrow().contains_listener(name, id) {
                continue;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&mut *event))) {
                Ok(Ok(())) => completed += 1,
                Ok(Err(e)) => log::warn!("Hook '{}' listener {:?} failed: {}", name, id, e),
                Err(payload) => {
                    let msg = payload
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| payload.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    log::warn!("Hook '{}' listener {:?} panicked: {}", name, id, msg);
                }
            }
        }
        completed
    }
}
