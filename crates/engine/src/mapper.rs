//! Logical cell address -> rendered cell address.

use overgrid_core::{CellAddress, RenderedAddress, SearchDirection};

use crate::grid::IndexService;

/// Result of resolving an overlay anchor against the render window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAnchor {
    /// Cell to measure. `(0, 0)`-based fallback when nothing is rendered.
    pub rendered: RenderedAddress,
    /// The anchor row was hidden and the previous visible row stands in.
    pub row_substituted: bool,
    /// The anchor column was hidden and the previous visible column stands in.
    pub col_substituted: bool,
    /// No rendered row could be found; geometry sits before all rows.
    pub before_rendered_rows: bool,
    /// No rendered column could be found; geometry sits before all columns.
    pub before_rendered_cols: bool,
}

pub struct CoordinateMapper<'a> {
    index: &'a dyn IndexService,
}

impl<'a> CoordinateMapper<'a> {
    pub fn new(index: &'a dyn IndexService) -> Self {
        Self { index }
    }

    /// None if the row or column is hidden or outside the render window.
    pub fn to_rendered(&self, address: CellAddress) -> Option<RenderedAddress> {
        let row = self.index.to_rendered_row(address.row)?;
        let col = self.index.to_rendered_column(address.col)?;
        Some(RenderedAddress::new(row, col))
    }

    /// Replace each hidden coordinate with the nearest visible one in
    /// `direction`. A coordinate with no visible neighbour that way stays as
    /// it was.
    pub fn nearest_visible(&self, address: CellAddress, direction: SearchDirection) -> CellAddress {
        CellAddress::new(
            self.index
                .nearest_visible_row(address.row, direction)
                .unwrap_or(address.row),
            self.index
                .nearest_visible_column(address.col, direction)
                .unwrap_or(address.col),
        )
    }

    /// Resolve where an overlay for `address` should be measured from.
    ///
    /// Hidden coordinates fall back to the previous visible index so the
    /// overlay attaches to its neighbour instead of disappearing.
    pub fn resolve_anchor(&self, address: CellAddress) -> ResolvedAnchor {
        let fallback = self.nearest_visible(address, SearchDirection::Backward);
        let row_substituted = fallback.row != address.row;
        let col_substituted = fallback.col != address.col;

        let row = self.index.to_rendered_row(fallback.row);
        let col = self.index.to_rendered_column(fallback.col);

        ResolvedAnchor {
            rendered: RenderedAddress::new(row.unwrap_or(0), col.unwrap_or(0)),
            row_substituted,
            col_substituted,
            before_rendered_rows: row.is_none(),
            before_rendered_cols: col.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::GridIndex;

    #[test]
    fn test_to_rendered_requires_both_axes() {
        let mut index = GridIndex::new(10, 5);
        index.cols.hide(1);
        let mapper = CoordinateMapper::new(&index);

        assert_eq!(mapper.to_rendered(CellAddress::new(3, 2)), Some(RenderedAddress::new(3, 1)));
        assert_eq!(mapper.to_rendered(CellAddress::new(3, 1)), None);
    }

    #[test]
    fn test_nearest_visible_per_axis() {
        let mut index = GridIndex::new(10, 10);
        index.rows.hide(5);
        index.cols.hide(2);
        let mapper = CoordinateMapper::new(&index);

        assert_eq!(
            mapper.nearest_visible(CellAddress::new(5, 2), SearchDirection::Backward),
            CellAddress::new(4, 1)
        );
        assert_eq!(
            mapper.nearest_visible(CellAddress::new(5, 3), SearchDirection::Forward),
            CellAddress::new(6, 3)
        );
    }

    #[test]
    fn test_nearest_visible_degenerate_keeps_address() {
        let mut index = GridIndex::new(3, 3);
        index.rows.apply_hidden(vec![true; 3]);
        let mapper = CoordinateMapper::new(&index);

        assert_eq!(
            mapper.nearest_visible(CellAddress::new(1, 1), SearchDirection::Backward),
            CellAddress::new(1, 1)
        );
    }

    #[test]
    fn test_resolve_anchor_substitutes_previous_row() {
        let mut index = GridIndex::new(10, 4);
        index.rows.hide(5);
        let mapper = CoordinateMapper::new(&index);

        let anchor = mapper.resolve_anchor(CellAddress::new(5, 2));
        assert!(anchor.row_substituted);
        assert!(!anchor.col_substituted);
        assert_eq!(anchor.rendered, RenderedAddress::new(4, 2));
        assert!(!anchor.before_rendered_rows);
    }

    #[test]
    fn test_resolve_anchor_before_rendered_content() {
        let mut index = GridIndex::new(10, 4);
        index.rows.hide(0);
        let mapper = CoordinateMapper::new(&index);

        let anchor = mapper.resolve_anchor(CellAddress::new(0, 1));
        assert!(!anchor.row_substituted);
        assert!(anchor.before_rendered_rows);
        assert_eq!(anchor.rendered.row, 0);
    }

    #[test]
    fn test_resolve_anchor_scrolled_out() {
        let mut index = GridIndex::new(100, 4);
        index.rows.set_window(50..80);
        let mapper = CoordinateMapper::new(&index);

        let anchor = mapper.resolve_anchor(CellAddress::new(10, 0));
        assert!(anchor.before_rendered_rows);
        assert!(!anchor.row_substituted);
        assert_eq!(mapper.to_rendered(CellAddress::new(60, 0)), Some(RenderedAddress::new(10, 0)));
    }
}
