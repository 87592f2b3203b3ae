//! Comment records and their read-modify-write store.
//!
//! A comment lives in cell metadata under [`META_KEY`] as
//! `{ "value": .., "style": { "width": .., "height": .. }, "readOnly": .. }`.
//! Other plugins write the same metadata, so every write reads the current
//! record, merges, and writes the whole record back.

use serde::{Deserialize, Serialize};

use overgrid_core::CellAddress;

use crate::grid::MetaStore;

pub const META_KEY: &str = "comment";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommentStyle {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<CommentStyle>,

    #[serde(rename = "readOnly", default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// Fields to change; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentPatch {
    pub value: Option<String>,
    pub style: Option<CommentStyle>,
    pub read_only: Option<bool>,
}

impl CommentPatch {
    pub fn value(value: impl Into<String>) -> Self {
        Self { value: Some(value.into()), ..Self::default() }
    }

    pub fn style(width: f32, height: f32) -> Self {
        Self { style: Some(CommentStyle { width, height }), ..Self::default() }
    }

    pub fn read_only(read_only: bool) -> Self {
        Self { read_only: Some(read_only), ..Self::default() }
    }
}

impl CommentRecord {
    pub fn merged(&self, patch: &CommentPatch) -> Self {
        Self {
            value: patch.value.clone().unwrap_or_else(|| self.value.clone()),
            style: patch.style.or(self.style),
            read_only: patch.read_only.or(self.read_only),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.unwrap_or(false)
    }
}

/// Typed access to comment metadata.
pub struct CommentsStore<'a> {
    meta: &'a dyn MetaStore,
}

impl<'a> CommentsStore<'a> {
    pub fn new(meta: &'a dyn MetaStore) -> Self {
        Self { meta }
    }

    /// The stored record. A malformed record reads as absent.
    pub fn get(&self, cell: CellAddress) -> Option<CommentRecord> {
        let meta = self.meta.get_cell_meta(cell.row, cell.col);
        let raw = meta.get(META_KEY)?;
        match serde_json::from_value(raw.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                log::warn!("Ignoring malformed comment at ({}, {}): {}", cell.row, cell.col, e);
                None
            }
        }
    }

    /// A cell "has a comment" when its record carries text.
    pub fn has_comment(&self, cell: CellAddress) -> bool {
        self.get(cell).is_some_and(|r| !r.value.is_empty())
    }

    /// Read, merge, write back. Returns the stored record.
    pub fn merge(&self, cell: CellAddress, patch: &CommentPatch) -> CommentRecord {
        let record = self.get(cell).unwrap_or_default().merged(patch);
        match serde_json::to_value(&record) {
            Ok(value) => self.meta.set_cell_meta(cell.row, cell.col, META_KEY, value),
            Err(e) => log::warn!("Comment at ({}, {}) not saved: {}", cell.row, cell.col, e),
        }
        record
    }

    pub fn set_value(&self, cell: CellAddress, value: &str) -> CommentRecord {
        self.merge(cell, &CommentPatch::value(value))
    }

    pub fn remove(&self, cell: CellAddress) {
        self.meta.remove_cell_meta(cell.row, cell.col, META_KEY);
    }
}
