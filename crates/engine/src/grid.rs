//! Collaborator interfaces and the per-grid context plugins are built with.
//!
//! The rendering engine, index service, metadata store, selection model and
//! structural edit operations all live outside this crate. Plugins only see
//! them through these traits, bundled in a [`GridContext`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use overgrid_config::{DirectionSetting, Settings};
use overgrid_core::{CellAddress, CellRange, LayoutDirection, Rect, RenderedAddress, SearchDirection, Size};
use serde_json::Value;

use crate::events::EventSource;
use crate::hooks::{HookPolicy, Hooks};
use crate::mapper::CoordinateMapper;
use crate::position::OverlayPositioner;

/// Rendering / virtualization engine.
pub trait GridView {
    /// Bounding rectangle of a materialized cell, in viewport pixels.
    fn cell_bounding_rect(&self, cell: RenderedAddress) -> Rect;
    /// Column width after stretching to fill the viewport.
    fn stretched_column_width(&self, rendered_col: usize) -> f32;
    fn is_layout_rtl(&self) -> bool;
    fn viewport_size(&self) -> Size;
    fn request_redraw(&self);
}

/// Logical <-> rendered index translation.
pub trait IndexService {
    fn to_rendered_row(&self, row: usize) -> Option<usize>;
    fn to_rendered_column(&self, col: usize) -> Option<usize>;
    /// Nearest non-hidden row, starting at `row` itself.
    fn nearest_visible_row(&self, row: usize, direction: SearchDirection) -> Option<usize>;
    fn nearest_visible_column(&self, col: usize, direction: SearchDirection) -> Option<usize>;
    fn count_rows(&self) -> usize;
    fn count_cols(&self) -> usize;
}

/// Per-cell property bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellMeta(BTreeMap<String, Value>);

impl CellMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn read_only(&self) -> bool {
        self.get(READ_ONLY_KEY).and_then(Value::as_bool).unwrap_or(false)
    }
}

pub const READ_ONLY_KEY: &str = "readOnly";

/// Shared cell metadata store. Several plugins write to it, so each write
/// must be a complete value for its key.
pub trait MetaStore {
    fn get_cell_meta(&self, row: usize, col: usize) -> CellMeta;
    fn set_cell_meta(&self, row: usize, col: usize, key: &str, value: Value);
    fn remove_cell_meta(&self, row: usize, col: usize, key: &str);
}

/// Current selection.
pub trait SelectionModel {
    fn active_range_anchor(&self) -> Option<CellAddress>;
    fn selected_ranges(&self) -> Vec<CellRange>;
    /// True when the selection was made from the header corner only.
    fn is_corner_only(&self) -> bool;

    fn for_each_selected_cell(&self, f: &mut dyn FnMut(CellAddress)) {
        for range in self.selected_ranges() {
            range.for_each_cell(&mut *f);
        }
    }
}

/// Structural edits the predefined menu commands forward to.
pub trait GridActions {
    fn insert_rows(&self, at: usize, amount: usize);
    fn insert_cols(&self, at: usize, amount: usize);
    fn remove_rows(&self, start: usize, amount: usize);
    fn remove_cols(&self, start: usize, amount: usize);
    fn undo(&self);
    fn redo(&self);
    fn can_undo(&self) -> bool;
    fn can_redo(&self) -> bool;
}

/// The outside world, as injected by the host grid.
#[derive(Clone)]
pub struct Collaborators {
    pub view: Rc<dyn GridView>,
    pub index: Rc<dyn IndexService>,
    pub meta: Rc<dyn MetaStore>,
    pub selection: Rc<dyn SelectionModel>,
    pub actions: Rc<dyn GridActions>,
}

impl Collaborators {
    /// All collaborators backed by one object.
    pub fn from_shared<G>(grid: Rc<G>) -> Self
    where
        G: GridView + IndexService + MetaStore + SelectionModel + GridActions + 'static,
    {
        Self {
            view: grid.clone(),
            index: grid.clone(),
            meta: grid.clone(),
            selection: grid.clone(),
            actions: grid,
        }
    }
}

/// Selection state captured when a menu opens or a command runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionContext {
    pub ranges: Vec<CellRange>,
    pub anchor: Option<CellAddress>,
    pub corner_only: bool,
}

impl SelectionContext {
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_single_cell(&self) -> bool {
        self.ranges.len() == 1 && self.ranges[0].is_single_cell()
    }

    /// Corner-only or empty selections disable cell commands.
    pub fn is_actionable(&self) -> bool {
        !self.corner_only && !self.ranges.is_empty()
    }

    pub fn last_range(&self) -> Option<&CellRange> {
        self.ranges.last()
    }

    pub fn for_each_cell(&self, mut f: impl FnMut(CellAddress)) {
        for range in &self.ranges {
            range.for_each_cell(&mut f);
        }
    }
}

/// Everything a plugin needs, cheaply clonable.
#[derive(Clone)]
pub struct GridContext {
    pub hooks: Rc<Hooks>,
    pub events: Rc<EventSource>,
    pub view: Rc<dyn GridView>,
    pub index: Rc<dyn IndexService>,
    pub meta: Rc<dyn MetaStore>,
    pub selection: Rc<dyn SelectionModel>,
    pub actions: Rc<dyn GridActions>,
    settings: Rc<RefCell<Settings>>,
}

impl fmt::Debug for GridContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridContext")
            .field("hooks", &self.hooks)
            .field("events", &self.events)
            .field("settings", &self.settings.borrow())
            .finish()
    }
}

impl GridContext {
    pub fn new(collaborators: Collaborators, settings: Settings) -> Self {
        let hooks = Hooks::new(HookPolicy::from_strict(settings.strict_hooks));
        Self {
            hooks: Rc::new(hooks),
            events: Rc::new(EventSource::new()),
            view: collaborators.view,
            index: collaborators.index,
            meta: collaborators.meta,
            selection: collaborators.selection,
            actions: collaborators.actions,
            settings: Rc::new(RefCell::new(settings)),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.borrow().clone()
    }

    /// Replace settings. The hook policy follows `hooks.strict`.
    pub fn set_settings(&self, settings: Settings) {
        self.hooks.set_policy(HookPolicy::from_strict(settings.strict_hooks));
        *self.settings.borrow_mut() = settings;
    }

    pub fn with_settings<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        f(&self.settings.borrow())
    }

    pub fn layout_direction(&self) -> LayoutDirection {
        match self.settings.borrow().layout_direction {
            DirectionSetting::Ltr => LayoutDirection::Ltr,
            DirectionSetting::Rtl => LayoutDirection::Rtl,
            DirectionSetting::Inherit => {
                if self.view.is_layout_rtl() {
                    LayoutDirection::Rtl
                } else {
                    LayoutDirection::Ltr
                }
            }
        }
    }

    pub fn mapper(&self) -> CoordinateMapper<'_> {
        CoordinateMapper::new(self.index.as_ref())
    }

    pub fn positioner(&self) -> OverlayPositioner<'_> {
        OverlayPositioner::new(self.view.as_ref(), self.index.as_ref(), self.layout_direction())
    }

    pub fn selection_context(&self) -> SelectionContext {
        SelectionContext {
            ranges: self.selection.selected_ranges(),
            anchor: self.selection.active_range_anchor(),
            corner_only: self.selection.is_corner_only(),
        }
    }

    /// True if the cell lies inside the current data extent.
    pub fn contains_cell(&self, cell: CellAddress) -> bool {
        cell.row < self.index.count_rows() && cell.col < self.index.count_cols()
    }
}
