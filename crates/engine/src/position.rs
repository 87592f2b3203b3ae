//! Overlay placement next to grid cells and pointer positions.
//!
//! Geometry is recomputed on every call. Scrolling and resizing invalidate
//! anything that could be cached, so nothing is.

use overgrid_core::{CellAddress, LayoutDirection, Rect, Size};

use crate::grid::{GridView, IndexService};
use crate::mapper::{CoordinateMapper, ResolvedAnchor};

/// Where an overlay goes, and how it got there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Final rectangle after viewport collision handling.
    pub geometry: Rect,
    /// Rectangle before collision handling.
    pub preferred: Rect,
    /// Bounds of the cell that was measured.
    pub cell: Rect,
    pub anchor: ResolvedAnchor,
    /// Moved to the other side of the anchor horizontally.
    pub flipped: bool,
    /// Pulled upward to stay above the viewport bottom.
    pub shifted: bool,
}

/// Outcome of [`fit_to_viewport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub rect: Rect,
    pub flipped: bool,
    pub shifted: bool,
}

/// Collision rule shared by every overlay.
///
/// `anchor` is the rectangle the overlay hangs off, `trailing` the distance
/// from the anchor's left edge to the side the overlay flips to in RTL
/// layouts.
///
/// - LTR, past the right viewport edge: flip to `anchor.x - width`
/// - RTL, past the left content edge: flip to `anchor.x + trailing`
/// - Past the bottom edge: move up by the overflow plus the anchor height
pub fn fit_to_viewport(
    preferred: Rect,
    anchor: Rect,
    trailing: f32,
    viewport: Size,
    direction: LayoutDirection,
) -> Fit {
    let mut rect = preferred;
    let mut flipped = false;
    let mut shifted = false;

    match direction {
        LayoutDirection::Ltr => {
            if rect.right() > viewport.width {
                rect.x = anchor.x - rect.width;
                flipped = true;
            }
        }
        LayoutDirection::Rtl => {
            if rect.x < 0.0 {
                rect.x = anchor.x + trailing;
                flipped = true;
            }
        }
    }

    let overflow = rect.bottom() - viewport.height;
    if overflow > 0.0 {
        rect.y -= overflow + anchor.height;
        shifted = true;
    }

    Fit { rect, flipped, shifted }
}

pub struct OverlayPositioner<'a> {
    view: &'a dyn GridView,
    index: &'a dyn IndexService,
    direction: LayoutDirection,
}

impl<'a> OverlayPositioner<'a> {
    pub fn new(view: &'a dyn GridView, index: &'a dyn IndexService, direction: LayoutDirection) -> Self {
        Self { view, index, direction }
    }

    pub fn direction(&self) -> LayoutDirection {
        self.direction
    }

    /// Place an overlay of `size` at the trailing edge of the cell at
    /// `address`.
    ///
    /// A hidden row or column is replaced by the previous visible one; for a
    /// substituted row the overlay drops by that row's height so it does not
    /// cover the neighbour.
    pub fn place(&self, address: CellAddress, size: Size) -> Placement {
        let anchor = CoordinateMapper::new(self.index).resolve_anchor(address);
        let cell = self.view.cell_bounding_rect(anchor.rendered);

        let column_width = if anchor.before_rendered_cols {
            0.0
        } else {
            self.view.stretched_column_width(anchor.rendered.col)
        };
        let row_offset = if anchor.row_substituted && !anchor.before_rendered_rows {
            cell.height
        } else {
            0.0
        };

        let top = cell.y.max(0.0) + row_offset;
        let left = match self.direction {
            LayoutDirection::Ltr => cell.x + column_width,
            LayoutDirection::Rtl => cell.x - size.width - column_width,
        };

        let preferred = Rect::new(left, top, size.width, size.height);
        let fit = fit_to_viewport(preferred, cell, column_width, self.view.viewport_size(), self.direction);

        log::debug!(
            "Placed overlay for ({}, {}) at {:?} (flipped={}, shifted={})",
            address.row,
            address.col,
            fit.rect,
            fit.flipped,
            fit.shifted
        );

        Placement {
            geometry: fit.rect,
            preferred,
            cell,
            anchor,
            flipped: fit.flipped,
            shifted: fit.shifted,
        }
    }

    /// Place an overlay at a pointer position (context menu), then keep it
    /// inside the viewport.
    pub fn place_at_point(&self, x: f32, y: f32, size: Size) -> Rect {
        let anchor = Rect::new(x, y, 0.0, 0.0);
        let left = match self.direction {
            LayoutDirection::Ltr => x,
            LayoutDirection::Rtl => x - size.width,
        };
        let preferred = Rect::new(left, y, size.width, size.height);
        let fit = fit_to_viewport(preferred, anchor, 0.0, self.view.viewport_size(), self.direction);
        clamp_to_viewport(fit.rect, self.view.viewport_size())
    }

    /// Place an overlay beside another rectangle (a submenu next to its
    /// parent item).
    pub fn place_beside(&self, anchor: Rect, size: Size) -> Rect {
        let left = match self.direction {
            LayoutDirection::Ltr => anchor.right(),
            LayoutDirection::Rtl => anchor.x - size.width,
        };
        let preferred = Rect::new(left, anchor.y, size.width, size.height);
        let fit = fit_to_viewport(preferred, anchor, anchor.width, self.view.viewport_size(), self.direction);
        clamp_to_viewport(fit.rect, self.view.viewport_size())
    }
}

/// Keep the top-left corner on screen. Overlays larger than the viewport
/// stick to the top-left.
fn clamp_to_viewport(mut rect: Rect, viewport: Size) -> Rect {
    rect.x = rect.x.min((viewport.width - rect.width).max(0.0)).max(0.0);
    rect.y = rect.y.min((viewport.height - rect.height).max(0.0)).max(0.0);
    rect
}
