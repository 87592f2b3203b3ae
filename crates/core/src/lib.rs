//! Plain value types shared by the overgrid crates.
//!
//! Nothing here knows about hooks, plugins or collaborators. Addresses come
//! in two flavours: [`CellAddress`] is the stable logical index a user sees,
//! [`RenderedAddress`] is an index into whatever the grid currently has
//! materialized on screen.

pub mod address;
pub mod geometry;

pub use address::{CellAddress, CellRange, RenderedAddress};
pub use geometry::{LayoutDirection, Rect, SearchDirection, Size};
