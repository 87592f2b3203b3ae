//! State of the floating comment editor.

use overgrid_core::{CellAddress, Rect, Size};

#[derive(Debug, Clone, PartialEq)]
pub struct CommentEditor {
    visible: bool,
    focused: bool,
    read_only: bool,
    anchor: Option<CellAddress>,
    geometry: Option<Rect>,
    value: String,
    size: Size,
    default_size: Size,
}

impl CommentEditor {
    pub fn new(default_size: Size) -> Self {
        Self {
            visible: false,
            focused: false,
            read_only: false,
            anchor: None,
            geometry: None,
            value: String::new(),
            size: default_size,
            default_size,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Cell the editor is showing a comment for.
    pub fn anchor(&self) -> Option<CellAddress> {
        self.anchor
    }

    pub fn geometry(&self) -> Option<Rect> {
        self.geometry
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn default_size(&self) -> Size {
        self.default_size
    }

    pub fn set_default_size(&mut self, size: Size) {
        self.default_size = size;
    }

    /// Show for `anchor`. `size` is the stored comment size, if any.
    pub fn show(
        &mut self,
        anchor: CellAddress,
        geometry: Rect,
        value: String,
        size: Option<Size>,
        read_only: bool,
    ) {
        self.visible = true;
        self.anchor = Some(anchor);
        self.geometry = Some(geometry);
        self.value = value;
        self.size = size.unwrap_or(self.default_size);
        self.read_only = read_only;
    }

    /// Hide and forget the anchor. Returns false if already hidden.
    pub fn hide(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        self.focused = false;
        self.anchor = None;
        self.geometry = None;
        true
    }

    pub fn set_geometry(&mut self, geometry: Rect) {
        self.geometry = Some(geometry);
    }

    /// Replace the text. Ignored while read-only.
    pub fn set_value(&mut self, value: impl Into<String>) -> bool {
        if self.read_only {
            return false;
        }
        self.value = value.into();
        true
    }

    pub fn set_size(&mut self, size: Size) {
        self.size = size;
        if let Some(g) = self.geometry.as_mut() {
            g.width = size.width;
            g.height = size.height;
        }
    }

    pub fn focus(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.focused = true;
        true
    }

    /// Drop focus. Returns whether it was focused.
    pub fn blur(&mut self) -> bool {
        std::mem::replace(&mut self.focused, false)
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.visible && self.geometry.is_some_and(|g| g.contains_point(x, y))
    }
}
