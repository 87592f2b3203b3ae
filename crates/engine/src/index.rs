//! Axis index mapping: logical space <-> rendered space
//!
//! This module provides the view layer that maps between:
//! - Logical space (what the user addresses, stable under scroll and hide)
//! - Renderable space (logical indices that are not hidden, in order)
//! - Rendered space (the renderable slice currently materialized on screen)
//!
//! Key invariants:
//! - `hidden` is indexed by LOGICAL index
//! - `renderable` is sorted ascending, so logical -> renderable is monotonic
//! - The render window is a half-open range over renderable positions
//! - Nearest-visible searches visit each index at most once

use std::ops::Range;

use overgrid_core::SearchDirection;

use crate::grid::IndexService;

// =============================================================================
// AxisMap: one dimension (rows or columns)
// =============================================================================

#[derive(Debug, Clone)]
pub struct AxisMap {
    /// Hidden flags indexed by logical index
    hidden: Vec<bool>,

    /// Cached list of non-hidden logical indices, ascending
    /// Rebuilt whenever `hidden` changes
    renderable: Vec<usize>,

    /// Materialized slice of `renderable`, as positions into it
    window: Range<usize>,
}

impl Default for AxisMap {
    fn default() -> Self {
        Self::new(0)
    }
}

impl AxisMap {
    /// Identity mapping for N indices, everything rendered
    pub fn new(len: usize) -> Self {
        Self {
            hidden: vec![false; len],
            renderable: (0..len).collect(),
            window: 0..len,
        }
    }

    /// Total number of logical indices
    pub fn len(&self) -> usize {
        self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }

    /// Number of non-hidden indices
    pub fn renderable_count(&self) -> usize {
        self.renderable.len()
    }

    /// Number of indices currently materialized
    pub fn rendered_count(&self) -> usize {
        self.window.len()
    }

    pub fn window(&self) -> Range<usize> {
        self.window.clone()
    }

    /// Out-of-range indices are not hidden, they do not exist
    pub fn is_hidden(&self, logical: usize) -> bool {
        self.hidden.get(logical).copied().unwrap_or(false)
    }

    /// Position among non-hidden indices - O(log n)
    pub fn renderable_index(&self, logical: usize) -> Option<usize> {
        self.renderable.binary_search(&logical).ok()
    }

    /// Map logical -> rendered. None if hidden, out of range, or outside
    /// the render window.
    pub fn to_rendered(&self, logical: usize) -> Option<usize> {
        let pos = self.renderable_index(logical)?;
        if self.window.contains(&pos) {
            Some(pos - self.window.start)
        } else {
            None
        }
    }

    /// Map rendered -> logical
    pub fn to_logical(&self, rendered: usize) -> Option<usize> {
        let pos = self.window.start.checked_add(rendered)?;
        if self.window.contains(&pos) {
            self.renderable.get(pos).copied()
        } else {
            None
        }
    }

    /// Nearest non-hidden logical index, starting at `logical` itself and
    /// stepping in `direction`. None when every candidate up to the bound is
    /// hidden or `logical` is out of range.
    pub fn nearest_visible(&self, logical: usize, direction: SearchDirection) -> Option<usize> {
        if logical >= self.len() {
            return None;
        }
        let mut index = logical;
        loop {
            if !self.hidden[index] {
                return Some(index);
            }
            index = match direction {
                SearchDirection::Backward => index.checked_sub(1)?,
                SearchDirection::Forward => {
                    let next = index + 1;
                    if next >= self.len() {
                        return None;
                    }
                    next
                }
            };
        }
    }

    // -------------------------------------------------------------------------
    // Mutators
    // -------------------------------------------------------------------------

    pub fn hide(&mut self, logical: usize) {
        self.set_hidden(logical, true);
    }

    pub fn show(&mut self, logical: usize) {
        self.set_hidden(logical, false);
    }

    pub fn set_hidden(&mut self, logical: usize, hidden: bool) {
        if let Some(flag) = self.hidden.get_mut(logical) {
            *flag = hidden;
            self.rebuild_renderable();
        }
    }

    /// Replace the whole hidden mask (indexed by logical index)
    pub fn apply_hidden(&mut self, mask: Vec<bool>) {
        self.hidden = mask;
        self.rebuild_renderable();
    }

    /// Set the materialized window, in renderable positions. Clamped to the
    /// renderable count.
    pub fn set_window(&mut self, window: Range<usize>) {
        let count = self.renderable.len();
        let start = window.start.min(count);
        let end = window.end.clamp(start, count);
        self.window = start..end;
    }

    /// Resize to a new logical length. New indices are visible; the window
    /// is reset to cover everything.
    pub fn resize(&mut self, len: usize) {
        self.hidden.resize(len, false);
        self.rebuild_renderable();
        self.window = 0..self.renderable.len();
    }

    /// Rebuild renderable cache and keep the window inside it
    fn rebuild_renderable(&mut self) {
        let was_full = self.window.start == 0 && self.window.end >= self.renderable.len();
        self.renderable = self
            .hidden
            .iter()
            .enumerate()
            .filter_map(|(i, &hidden)| if hidden { None } else { Some(i) })
            .collect();
        if was_full {
            self.window = 0..self.renderable.len();
        } else {
            self.set_window(self.window.clone());
        }
    }
}

// =============================================================================
// GridIndex: both axes
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    pub rows: AxisMap,
    pub cols: AxisMap,
}

impl GridIndex {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows: AxisMap::new(rows), cols: AxisMap::new(cols) }
    }
}

impl IndexService for GridIndex {
    fn to_rendered_row(&self, row: usize) -> Option<usize> {
        self.rows.to_rendered(row)
    }

    fn to_rendered_column(&self, col: usize) -> Option<usize> {
        self.cols.to_rendered(col)
    }

    fn nearest_visible_row(&self, row: usize, direction: SearchDirection) -> Option<usize> {
        self.rows.nearest_visible(row, direction)
    }

    fn nearest_visible_column(&self, col: usize, direction: SearchDirection) -> Option<usize> {
        self.cols.nearest_visible(col, direction)
    }

    fn count_rows(&self) -> usize {
        self.rows.len()
    }

    fn count_cols(&self) -> usize {
        self.cols.len()
    }
}
