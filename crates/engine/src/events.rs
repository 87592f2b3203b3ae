//! Raw UI events and plugin-scoped subscriptions.
//!
//! The host grid feeds pointer/keyboard/scroll input into an [`EventSource`].
//! Plugins never subscribe to the source directly; they go through their own
//! [`EventManager`], which remembers every subscription so `clear_events`
//! can drop them all at once on disable/destroy.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use overgrid_core::{CellAddress, Size};

/// Floating element kinds that can receive events of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    ContextMenu,
    CommentEditor,
}

/// Where an event was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// The grid body (cells).
    Grid,
    /// Anything on the page, grid included.
    Document,
    /// A floating overlay owned by a plugin.
    Overlay(OverlayKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ContextMenu,
    MouseDown,
    MouseUp,
    MouseOver,
    KeyDown,
    Scroll,
    Resize,
    Input,
    Blur,
    OverlayResize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Escape,
    Enter,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other,
}

/// Pointer position in viewport pixels, with the cell under it if any.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub cell: Option<CellAddress>,
    pub time: Instant,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, cell: None, time: Instant::now() }
    }

    pub fn on_cell(mut self, cell: CellAddress) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn at(mut self, time: Instant) -> Self {
        self.time = time;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ContextMenu(PointerEvent),
    MouseDown(PointerEvent),
    MouseUp(PointerEvent),
    MouseOver(PointerEvent),
    KeyDown(Key),
    Scroll,
    Resize,
    /// Text typed into an overlay's editable surface.
    Input(String),
    Blur,
    /// The user resized an overlay.
    OverlayResize(Size),
}

impl UiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            UiEvent::ContextMenu(_) => EventKind::ContextMenu,
            UiEvent::MouseDown(_) => EventKind::MouseDown,
            UiEvent::MouseUp(_) => EventKind::MouseUp,
            UiEvent::MouseOver(_) => EventKind::MouseOver,
            UiEvent::KeyDown(_) => EventKind::KeyDown,
            UiEvent::Scroll => EventKind::Scroll,
            UiEvent::Resize => EventKind::Resize,
            UiEvent::Input(_) => EventKind::Input,
            UiEvent::Blur => EventKind::Blur,
            UiEvent::OverlayResize(_) => EventKind::OverlayResize,
        }
    }

    pub fn pointer(&self) -> Option<&PointerEvent> {
        match self {
            UiEvent::ContextMenu(p)
            | UiEvent::MouseDown(p)
            | UiEvent::MouseUp(p)
            | UiEvent::MouseOver(p) => Some(p),
            _ => None,
        }
    }
}

pub type Handler = Rc<dyn Fn(&UiEvent)>;

/// Opaque handle to one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Entry {
    id: Subscription,
    target: EventTarget,
    kind: EventKind,
    handler: Handler,
}

/// Grid-level event dispatcher.
#[derive(Default)]
pub struct EventSource {
    next_id: Cell<u64>,
    entries: RefCell<Vec<Entry>>,
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("subscriptions", &self.entries.borrow().len())
            .finish()
    }
}

impl EventSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscribe(&self, target: EventTarget, kind: EventKind, handler: Handler) -> Subscription {
        let id = Subscription(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.entries.borrow_mut().push(Entry { id, target, kind, handler });
        id
    }

    fn unsubscribe(&self, id: Subscription) -> bool {
        let mut entries = self.entries.borrow_mut();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    fn is_live(&self, id: Subscription) -> bool {
        self.entries.borrow().iter().any(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Deliver `event` to every handler registered for its target and kind.
    /// Returns the number of handlers invoked.
    ///
    /// A handler unsubscribed by an earlier handler of the same emit does not
    /// run.
    pub fn emit(&self, target: EventTarget, event: &UiEvent) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(Subscription, Handler)> = self
            .entries
            .borrow()
            .iter()
            .filter(|e| e.target == target && e.kind == kind)
            .map(|e| (e.id, Rc::clone(&e.handler)))
            .collect();

        let mut invoked = 0;
        for (id, handler) in snapshot {
            if !self.is_live(id) {
                continue;
            }
            handler(event);
            invoked += 1;
        }
        invoked
    }
}

/// A plugin's view of the event source. Every subscription made through it
/// is released by [`EventManager::clear_events`] (and on drop).
pub struct EventManager {
    source: Rc<EventSource>,
    subscriptions: Vec<Subscription>,
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl EventManager {
    pub fn new(source: Rc<EventSource>) -> Self {
        Self { source, subscriptions: Vec::new() }
    }

    pub fn add_listener<F>(&mut self, target: EventTarget, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&UiEvent) + 'static,
    {
        let id = self.source.subscribe(target, kind, Rc::new(handler));
        self.subscriptions.push(id);
        id
    }

    pub fn remove(&mut self, id: Subscription) -> bool {
        self.subscriptions.retain(|s| *s != id);
        self.source.unsubscribe(id)
    }

    /// Drop every subscription registered through this manager.
    pub fn clear_events(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.source.unsubscribe(id);
        }
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }
}

impl Drop for EventManager {
    fn drop(&mut self) {
        self.clear_events();
    }
}
