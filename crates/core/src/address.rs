use serde::{Deserialize, Serialize};

/// A cell in logical (visual) index space.
///
/// Stable across scrolling and hiding: row 5 stays row 5 whether or not it
/// is currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: usize,
    pub col: usize,
}

impl CellAddress {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl From<(usize, usize)> for CellAddress {
    fn from((row, col): (usize, usize)) -> Self {
        Self { row, col }
    }
}

/// A cell in rendered index space (the materialized window).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderedAddress {
    pub row: usize,
    pub col: usize,
}

impl RenderedAddress {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Anchor range for a floating overlay or a selection layer.
///
/// `to` is optional: a single-cell range only carries `from`. The corners are
/// not required to be ordered, use [`CellRange::top_left`] and
/// [`CellRange::bottom_right`] when iterating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRange {
    pub from: CellAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<CellAddress>,
}

impl CellRange {
    pub const fn single(from: CellAddress) -> Self {
        Self { from, to: None }
    }

    pub const fn new(from: CellAddress, to: CellAddress) -> Self {
        Self { from, to: Some(to) }
    }

    fn end(&self) -> CellAddress {
        self.to.unwrap_or(self.from)
    }

    pub fn top_left(&self) -> CellAddress {
        let end = self.end();
        CellAddress::new(self.from.row.min(end.row), self.from.col.min(end.col))
    }

    pub fn bottom_right(&self) -> CellAddress {
        let end = self.end();
        CellAddress::new(self.from.row.max(end.row), self.from.col.max(end.col))
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        let tl = self.top_left();
        let br = self.bottom_right();
        (tl.row..=br.row).contains(&cell.row) && (tl.col..=br.col).contains(&cell.col)
    }

    pub fn row_count(&self) -> usize {
        self.bottom_right().row - self.top_left().row + 1
    }

    pub fn col_count(&self) -> usize {
        self.bottom_right().col - self.top_left().col + 1
    }

    pub fn cell_count(&self) -> usize {
        self.row_count() * self.col_count()
    }

    pub fn is_single_cell(&self) -> bool {
        self.cell_count() == 1
    }

    /// Visit every cell, row-major from the top-left corner.
    pub fn for_each_cell(&self, mut f: impl FnMut(CellAddress)) {
        let tl = self.top_left();
        let br = self.bottom_right();
        for row in tl.row..=br.row {
            for col in tl.col..=br.col {
                f(CellAddress::new(row, col));
            }
        }
    }
}

impl From<CellAddress> for CellRange {
    fn from(addr: CellAddress) -> Self {
        Self::single(addr)
    }
}
