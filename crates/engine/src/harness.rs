//! In-memory grid for exercising plugins without a renderer.
//!
//! `MockGrid` implements every collaborator trait over plain data:
//! - Fixed-size cells (50 x 23) laid out from the top-left (or top-right in RTL)
//! - An [`GridIndex`] for hidden rows/columns and render windows
//! - A metadata map, a selection, and a log of structural actions
//!
//! Hook dispatch can be observed with [`record_hooks`].

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use overgrid_config::Settings;
use overgrid_core::{CellAddress, CellRange, Rect, RenderedAddress, SearchDirection, Size};
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::grid::{CellMeta, Collaborators, GridActions, GridContext, GridView, IndexService, MetaStore, SelectionModel};
use crate::hooks::{HookName, Hooks};
use crate::index::GridIndex;

pub const CELL_WIDTH: f32 = 50.0;
pub const CELL_HEIGHT: f32 = 23.0;

/// Structural edit forwarded by a menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedAction {
    InsertRows { at: usize, amount: usize },
    InsertCols { at: usize, amount: usize },
    RemoveRows { start: usize, amount: usize },
    RemoveCols { start: usize, amount: usize },
    Undo,
    Redo,
}

pub struct MockGrid {
    index: RefCell<GridIndex>,
    viewport: Cell<Size>,
    rtl: Cell<bool>,
    meta: RefCell<FxHashMap<(usize, usize), CellMeta>>,
    selection: RefCell<Vec<CellRange>>,
    corner: Cell<bool>,
    redraws: Cell<usize>,
    actions: RefCell<Vec<RecordedAction>>,
    can_undo: Cell<bool>,
    can_redo: Cell<bool>,
}

impl MockGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            index: RefCell::new(GridIndex::new(rows, cols)),
            viewport: Cell::new(Size::new(1000.0, 600.0)),
            rtl: Cell::new(false),
            meta: RefCell::new(FxHashMap::default()),
            selection: RefCell::new(Vec::new()),
            corner: Cell::new(false),
            redraws: Cell::new(0),
            actions: RefCell::new(Vec::new()),
            can_undo: Cell::new(false),
            can_redo: Cell::new(false),
        }
    }

    pub fn shared(self) -> Rc<Self> {
        Rc::new(self)
    }

    /// A fresh plugin context backed by this grid.
    pub fn context(self: &Rc<Self>, settings: Settings) -> GridContext {
        GridContext::new(Collaborators::from_shared(Rc::clone(self)), settings)
    }

    // -------------------------------------------------------------------------
    // Layout
    // -------------------------------------------------------------------------

    pub fn hide_row(&self, row: usize) {
        self.index.borrow_mut().rows.hide(row);
    }

    pub fn hide_col(&self, col: usize) {
        self.index.borrow_mut().cols.hide(col);
    }

    pub fn set_row_window(&self, start: usize, end: usize) {
        self.index.borrow_mut().rows.set_window(start..end);
    }

    pub fn set_rtl(&self, rtl: bool) {
        self.rtl.set(rtl);
    }

    pub fn set_viewport(&self, width: f32, height: f32) {
        self.viewport.set(Size::new(width, height));
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn select(&self, range: impl Into<CellRange>) {
        self.corner.set(false);
        *self.selection.borrow_mut() = vec![range.into()];
    }

    pub fn select_many(&self, ranges: Vec<CellRange>) {
        self.corner.set(false);
        *self.selection.borrow_mut() = ranges;
    }

    /// Select everything from the header corner.
    pub fn select_corner(&self) {
        let (rows, cols) = {
            let index = self.index.borrow();
            (index.rows.len(), index.cols.len())
        };
        let last = CellAddress::new(rows.saturating_sub(1), cols.saturating_sub(1));
        *self.selection.borrow_mut() = vec![CellRange::new(CellAddress::new(0, 0), last)];
        self.corner.set(true);
    }

    pub fn clear_selection(&self) {
        self.corner.set(false);
        self.selection.borrow_mut().clear();
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn redraw_count(&self) -> usize {
        self.redraws.get()
    }

    pub fn actions(&self) -> Vec<RecordedAction> {
        self.actions.borrow().clone()
    }

    pub fn set_can_undo(&self, can_undo: bool) {
        self.can_undo.set(can_undo);
    }

    pub fn set_can_redo(&self, can_redo: bool) {
        self.can_redo.set(can_redo);
    }

    fn record(&self, action: RecordedAction) {
        self.actions.borrow_mut().push(action);
    }
}

impl GridView for MockGrid {
    fn cell_bounding_rect(&self, cell: RenderedAddress) -> Rect {
        let left = cell.col as f32 * CELL_WIDTH;
        let x = if self.rtl.get() {
            self.viewport.get().width - left - CELL_WIDTH
        } else {
            left
        };
        Rect::new(x, cell.row as f32 * CELL_HEIGHT, CELL_WIDTH, CELL_HEIGHT)
    }

    fn stretched_column_width(&self, _rendered_col: usize) -> f32 {
        CELL_WIDTH
    }

    fn is_layout_rtl(&self) -> bool {
        self.rtl.get()
    }

    fn viewport_size(&self) -> Size {
        self.viewport.get()
    }

    fn request_redraw(&self) {
        self.redraws.set(self.redraws.get() + 1);
    }
}

impl IndexService for MockGrid {
    fn to_rendered_row(&self, row: usize) -> Option<usize> {
        self.index.borrow().to_rendered_row(row)
    }

    fn to_rendered_column(&self, col: usize) -> Option<usize> {
        self.index.borrow().to_rendered_column(col)
    }

    fn nearest_visible_row(&self, row: usize, direction: SearchDirection) -> Option<usize> {
        self.index.borrow().nearest_visible_row(row, direction)
    }

    fn nearest_visible_column(&self, col: usize, direction: SearchDirection) -> Option<usize> {
        self.index.borrow().nearest_visible_column(col, direction)
    }

    fn count_rows(&self) -> usize {
        self.index.borrow().count_rows()
    }

    fn count_cols(&self) -> usize {
        self.index.borrow().count_cols()
    }
}

impl MetaStore for MockGrid {
    fn get_cell_meta(&self, row: usize, col: usize) -> CellMeta {
        self.meta.borrow().get(&(row, col)).cloned().unwrap_or_default()
    }

    fn set_cell_meta(&self, row: usize, col: usize, key: &str, value: Value) {
        self.meta.borrow_mut().entry((row, col)).or_default().insert(key, value);
    }

    fn remove_cell_meta(&self, row: usize, col: usize, key: &str) {
        let mut meta = self.meta.borrow_mut();
        if let Some(cell) = meta.get_mut(&(row, col)) {
            cell.remove(key);
            if cell.is_empty() {
                meta.remove(&(row, col));
            }
        }
    }
}

impl SelectionModel for MockGrid {
    fn active_range_anchor(&self) -> Option<CellAddress> {
        self.selection.borrow().last().map(|r| r.from)
    }

    fn selected_ranges(&self) -> Vec<CellRange> {
        self.selection.borrow().clone()
    }

    fn is_corner_only(&self) -> bool {
        self.corner.get()
    }
}

impl GridActions for MockGrid {
    fn insert_rows(&self, at: usize, amount: usize) {
        self.record(RecordedAction::InsertRows { at, amount });
    }

    fn insert_cols(&self, at: usize, amount: usize) {
        self.record(RecordedAction::InsertCols { at, amount });
    }

    fn remove_rows(&self, start: usize, amount: usize) {
        self.record(RecordedAction::RemoveRows { start, amount });
    }

    fn remove_cols(&self, start: usize, amount: usize) {
        self.record(RecordedAction::RemoveCols { start, amount });
    }

    fn undo(&self) {
        self.record(RecordedAction::Undo);
    }

    fn redo(&self) {
        self.record(RecordedAction::Redo);
    }

    fn can_undo(&self) -> bool {
        self.can_undo.get()
    }

    fn can_redo(&self) -> bool {
        self.can_redo.get()
    }
}

/// Record the name of every listed hook each time it fires.
pub fn record_hooks(hooks: &Hooks, names: &[HookName]) -> Rc<RefCell<Vec<String>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for name in names {
        let (log, label) = (log.clone(), name.to_string());
        let _ = hooks.add(name, Some("harness"), move |_| {
            log.borrow_mut().push(label.clone());
            Ok(())
        });
    }
    log
}
