//! Plugin layer for a virtualized grid.
//!
//! A host grid builds one [`GridContext`] from its collaborators and hands it
//! to plugins. Plugins talk to each other through the [`Hooks`] registry and
//! receive raw input through the [`EventSource`]; a [`PluginHost`] drives
//! their lifecycle.

pub mod comments;
pub mod context_menu;
pub mod error;
pub mod events;
pub mod grid;
pub mod harness;
pub mod hooks;
pub mod index;
pub mod mapper;
pub mod plugin;
pub mod position;

pub use comments::Comments;
pub use context_menu::ContextMenu;
pub use error::{Error, Result};
pub use events::{EventKind, EventManager, EventSource, EventTarget, Key, OverlayKind, PointerEvent, UiEvent};
pub use grid::{Collaborators, GridContext, SelectionContext};
pub use hooks::{HookEvent, HookName, HookPolicy, Hooks};
pub use mapper::{CoordinateMapper, ResolvedAnchor};
pub use plugin::{Plugin, PluginHost, PluginState};
pub use position::{OverlayPositioner, Placement};
