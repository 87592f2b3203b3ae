//! Menu open/close state machine and keyboard selection.
//!
//! `Closed -> Opening -> Open -> Closing -> Closed`. The menu only holds
//! resolved items; labels and predicates were evaluated before it opened.

use overgrid_config::Settings;
use overgrid_core::{Rect, Size};

use super::executor::command_key;
use super::items::ResolvedItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Closed,
    Opening,
    Open,
    Closing,
}

/// Row heights and width used to size a menu.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MenuMetrics {
    pub width: f32,
    pub item_height: f32,
    pub separator_height: f32,
}

impl Default for MenuMetrics {
    fn default() -> Self {
        Self { width: 215.0, item_height: 23.0, separator_height: 1.0 }
    }
}

impl MenuMetrics {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            width: settings.menu_width,
            item_height: settings.menu_item_height,
            separator_height: settings.menu_separator_height,
        }
    }

    fn row_height(&self, item: &ResolvedItem) -> f32 {
        if item.is_separator() { self.separator_height } else { self.item_height }
    }

    pub fn size_of(&self, items: &[ResolvedItem]) -> Size {
        Size::new(self.width, items.iter().map(|i| self.row_height(i)).sum())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Menu {
    state: MenuState,
    items: Vec<ResolvedItem>,
    geometry: Option<Rect>,
    metrics: MenuMetrics,
    selected: Option<usize>,
    /// Key of the parent item when this is a submenu.
    parent: Option<String>,
    submenu: Option<Box<Menu>>,
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MenuState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == MenuState::Open
    }

    pub fn items(&self) -> &[ResolvedItem] {
        &self.items
    }

    pub fn geometry(&self) -> Option<Rect> {
        self.geometry
    }

    pub fn metrics(&self) -> MenuMetrics {
        self.metrics
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&ResolvedItem> {
        self.selected.and_then(|i| self.items.get(i))
    }

    pub fn submenu(&self) -> Option<&Menu> {
        self.submenu.as_deref()
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Closed -> Opening. False (and nothing changes) from any other state.
    pub fn begin_open(&mut self) -> bool {
        if self.state != MenuState::Closed {
            return false;
        }
        self.state = MenuState::Opening;
        true
    }

    /// Opening -> Open with freshly resolved items.
    pub fn finish_open(&mut self, items: Vec<ResolvedItem>, geometry: Rect, metrics: MenuMetrics) {
        debug_assert_eq!(self.state, MenuState::Opening);
        self.items = items;
        self.geometry = Some(geometry);
        self.metrics = metrics;
        self.selected = None;
        self.submenu = None;
        self.state = MenuState::Open;
    }

    /// Opening -> Closed, nothing shown.
    pub fn abort_open(&mut self) {
        if self.state == MenuState::Opening {
            self.reset();
        }
    }

    /// Opening/Open -> Closing. False if already closed or closing.
    pub fn begin_close(&mut self) -> bool {
        match self.state {
            MenuState::Open | MenuState::Opening => {
                self.state = MenuState::Closing;
                true
            }
            MenuState::Closed | MenuState::Closing => false,
        }
    }

    /// Any state -> Closed.
    pub fn finish_close(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.state = MenuState::Closed;
        self.items.clear();
        self.geometry = None;
        self.selected = None;
        self.submenu = None;
    }

    // -------------------------------------------------------------------------
    // Keyboard selection
    // -------------------------------------------------------------------------

    /// Move the highlight down, skipping separators and disabled items and
    /// wrapping at the end. Acts on the open submenu if there is one.
    pub fn select_next(&mut self) -> Option<usize> {
        if let Some(sub) = self.submenu.as_deref_mut() {
            return sub.select_next();
        }
        self.step(1)
    }

    pub fn select_prev(&mut self) -> Option<usize> {
        if let Some(sub) = self.submenu.as_deref_mut() {
            return sub.select_prev();
        }
        self.step(-1)
    }

    fn step(&mut self, delta: isize) -> Option<usize> {
        let len = self.items.len() as isize;
        if len == 0 {
            return None;
        }
        let mut index = match self.selected {
            Some(i) => i as isize,
            None if delta > 0 => -1,
            None => len,
        };
        for _ in 0..len {
            index = (index + delta).rem_euclid(len);
            if self.items[index as usize].is_selectable() {
                self.selected = Some(index as usize);
                return self.selected;
            }
        }
        None
    }

    pub fn select(&mut self, index: usize) -> bool {
        match self.items.get(index) {
            Some(item) if item.is_selectable() => {
                self.selected = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Screen rectangle of the item at `index`.
    pub fn item_rect(&self, index: usize) -> Option<Rect> {
        let geometry = self.geometry?;
        let item = self.items.get(index)?;
        let top: f32 = self.items[..index].iter().map(|i| self.metrics.row_height(i)).sum();
        Some(Rect::new(geometry.x, geometry.y + top, geometry.width, self.metrics.row_height(item)))
    }

    fn item_at(&self, x: f32, y: f32) -> Option<usize> {
        (0..self.items.len()).find(|&i| self.item_rect(i).is_some_and(|r| r.contains_point(x, y)))
    }

    /// Point inside this menu or its open submenu.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        self.geometry.is_some_and(|g| g.contains_point(x, y))
            || self.submenu.as_deref().is_some_and(|s| s.contains_point(x, y))
    }

    /// Executor key of the selectable action under a point, submenu first.
    pub fn command_at(&self, x: f32, y: f32) -> Option<String> {
        if let Some(key) = self.submenu.as_deref().and_then(|s| s.command_at(x, y)) {
            return Some(key);
        }
        let item = &self.items[self.item_at(x, y)?];
        (item.is_selectable() && item.submenu().is_none()).then(|| self.qualified(&item.key))
    }

    /// Index of the enabled submenu parent under a point, in this menu only.
    pub fn submenu_parent_at(&self, x: f32, y: f32) -> Option<usize> {
        let index = self.item_at(x, y)?;
        let item = &self.items[index];
        (item.is_selectable() && item.submenu().is_some()).then_some(index)
    }

    /// Executor key of the highlighted action (in the submenu if one is
    /// open). None when nothing is highlighted or it is a submenu parent.
    pub fn selected_command(&self) -> Option<String> {
        if let Some(sub) = self.submenu.as_deref() {
            return sub.selected_command();
        }
        let item = self.selected_item()?;
        (item.is_selectable() && item.submenu().is_none()).then(|| self.qualified(&item.key))
    }

    fn qualified(&self, key: &str) -> String {
        match &self.parent {
            Some(parent) => command_key(parent, key),
            None => key.to_string(),
        }
    }

    // -------------------------------------------------------------------------
    // Submenus
    // -------------------------------------------------------------------------

    /// Items and anchor rectangle for a submenu of the highlighted item, if
    /// it has one and is enabled.
    pub fn submenu_request(&self) -> Option<(Rect, &[ResolvedItem])> {
        if self.submenu.is_some() {
            return None;
        }
        let index = self.selected?;
        let item = &self.items[index];
        if item.disabled {
            return None;
        }
        let children = item.submenu().filter(|c| !c.is_empty())?;
        Some((self.item_rect(index)?, children))
    }

    /// Open the highlighted item's submenu at `geometry`. False if the
    /// highlighted item has no (enabled) submenu.
    pub fn open_submenu(&mut self, geometry: Rect) -> bool {
        let Some((_, children)) = self.submenu_request() else {
            return false;
        };
        let children = children.to_vec();
        let parent = self.selected_item().map(|i| i.key.clone());
        let mut sub = Menu { metrics: self.metrics, parent, ..Menu::default() };
        sub.begin_open();
        sub.finish_open(children, geometry, self.metrics);
        sub.step(1);
        self.submenu = Some(Box::new(sub));
        true
    }

    pub fn close_submenu(&mut self) -> bool {
        self.submenu.take().is_some()
    }
}
