//! Cell comments: a floating editor anchored next to a cell.
//!
//! The comment itself lives in cell metadata (see [`record`]). The plugin
//! tracks an active range, shows the editor next to the range's first cell,
//! saves on blur or outside click, and contributes three context menu items.
//! Hover display goes through [`DisplayDelay`]; the host drives it with
//! [`Comments::tick`].

pub mod delay;
pub mod editor;
pub mod record;

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use overgrid_config::Settings;
use overgrid_core::{CellAddress, CellRange, Size};

pub use delay::{DelayAction, DisplayDelay};
pub use editor::CommentEditor;
pub use record::{CommentPatch, CommentRecord, CommentStyle, CommentsStore, META_KEY};

use crate::context_menu::{ActionItem, CommandContext, Label, MenuContext, MenuItem};
use crate::error::{Error, Result};
use crate::events::{EventKind, EventManager, EventTarget, OverlayKind, PointerEvent, UiEvent};
use crate::grid::GridContext;
use crate::hooks::{
    HookEvent, ListenerResult, AFTER_COMMENT_HIDE, AFTER_COMMENT_SHOW, AFTER_CONTEXT_MENU_DEFAULT_OPTIONS,
    AFTER_REMOVE_COMMENT, AFTER_RENDERER, AFTER_SCROLL_HORIZONTALLY, AFTER_SCROLL_VERTICALLY, AFTER_SET_COMMENT,
    BEFORE_COMMENT_HIDE, BEFORE_COMMENT_SHOW,
};
use crate::plugin::Plugin;

pub const PLUGIN_KEY: &str = "comments";

/// Render class added to cells that carry a comment.
pub const COMMENT_CELL_CLASS: &str = "htCommentCell";

pub const ADD_EDIT_KEY: &str = "commentsAddEdit";
pub const REMOVE_KEY: &str = "commentsRemove";
pub const READ_ONLY_KEY: &str = "commentsReadOnly";

struct CommentsInner {
    grid: GridContext,
    range: RefCell<Option<CellRange>>,
    editor: RefCell<CommentEditor>,
    delay: RefCell<DisplayDelay>,
}

impl CommentsInner {
    fn store(&self) -> CommentsStore<'_> {
        CommentsStore::new(self.grid.meta.as_ref())
    }

    fn anchor(&self) -> Result<CellAddress> {
        self.range
            .borrow()
            .map(|r| r.from)
            .ok_or_else(|| Error::Precondition("no active comment range".into()))
    }

    fn set_range(&self, range: Option<CellRange>) {
        *self.range.borrow_mut() = range;
    }

    fn show(&self) -> Result<bool> {
        let cell = self.anchor()?;
        if !self.grid.contains_cell(cell) {
            log::debug!("Comment anchor ({}, {}) is outside the data, not showing", cell.row, cell.col);
            return Ok(false);
        }
        let hooks = &self.grid.hooks;
        hooks.run(&BEFORE_COMMENT_SHOW, &mut HookEvent::Comment { address: Some(cell) });

        let record = self.store().get(cell).unwrap_or_default();
        let read_only = record
            .read_only
            .unwrap_or_else(|| self.grid.with_settings(|s| s.comments.read_only));
        let stored = record.style.map(|s| Size::new(s.width, s.height));
        let size = stored.unwrap_or_else(|| self.editor.borrow().default_size());
        let placement = self.grid.positioner().place(cell, size);

        self.editor
            .borrow_mut()
            .show(cell, placement.geometry, record.value, stored, read_only);
        hooks.run(&AFTER_COMMENT_SHOW, &mut HookEvent::Comment { address: Some(cell) });
        Ok(true)
    }

    fn show_at_cell(&self, row: usize, col: usize) -> Result<bool> {
        self.set_range(Some(CellRange::single(CellAddress::new(row, col))));
        self.show()
    }

    fn hide(&self) {
        let address = {
            let editor = self.editor.borrow();
            if !editor.is_visible() {
                return;
            }
            editor.anchor()
        };
        let hooks = &self.grid.hooks;
        hooks.run(&BEFORE_COMMENT_HIDE, &mut HookEvent::Comment { address });
        self.editor.borrow_mut().hide();
        hooks.run(&AFTER_COMMENT_HIDE, &mut HookEvent::Comment { address });
    }

    /// Re-place the editor after scroll or resize. Without `force` this only
    /// acts while the editor is visible.
    fn refresh_editor(&self, force: bool) {
        let (visible, size) = {
            let editor = self.editor.borrow();
            (editor.is_visible(), editor.size())
        };
        if !force && !visible {
            return;
        }
        let Ok(cell) = self.anchor() else {
            return;
        };
        if !self.grid.contains_cell(cell) {
            self.hide();
            return;
        }
        let placement = self.grid.positioner().place(cell, size);
        self.editor.borrow_mut().set_geometry(placement.geometry);
    }

    fn set_comment(&self, value: Option<&str>) -> Result<()> {
        let cell = self.anchor()?;
        let value = match value {
            Some(v) => v.to_string(),
            None => self.editor.borrow().value().to_string(),
        };
        self.store().set_value(cell, &value);
        self.grid.view.request_redraw();
        self.grid.hooks.run(
            &AFTER_SET_COMMENT,
            &mut HookEvent::CommentChanged { address: cell, value: Some(&value) },
        );
        Ok(())
    }

    fn remove_comment(&self) -> Result<()> {
        let cell = self.anchor()?;
        self.store().remove(cell);
        self.grid.view.request_redraw();
        self.hide();
        self.grid
            .hooks
            .run(&AFTER_REMOVE_COMMENT, &mut HookEvent::CommentChanged { address: cell, value: None });
        Ok(())
    }

    fn remove_comment_at_cell(&self, row: usize, col: usize) -> Result<()> {
        self.set_range(Some(CellRange::single(CellAddress::new(row, col))));
        self.remove_comment()
    }

    /// Write the editor text back if the editor had focus.
    fn commit(&self) {
        if !self.editor.borrow_mut().blur() {
            return;
        }
        if let Err(e) = self.set_comment(None) {
            log::warn!("Comment not saved: {}", e);
        }
    }

    fn tick(&self, now: Instant) {
        let due = self.delay.borrow_mut().poll(now);
        for action in due {
            match action {
                DelayAction::Show(cell) => {
                    if let Err(e) = self.show_at_cell(cell.row, cell.col) {
                        log::warn!("Delayed comment show failed: {}", e);
                    }
                }
                DelayAction::Hide => self.hide(),
            }
        }
    }

    fn handle_mouse_over(&self, event: &PointerEvent) {
        let (focused, shown_for) = {
            let editor = self.editor.borrow();
            (editor.is_focused(), editor.anchor().filter(|_| editor.is_visible()))
        };
        if focused {
            return;
        }
        let commented = event.cell.filter(|&c| self.store().has_comment(c));
        let mut delay = self.delay.borrow_mut();
        match (commented, shown_for) {
            (Some(cell), Some(shown)) if cell == shown => delay.cancel_hiding(),
            (Some(cell), _) => delay.schedule_show(cell, event.time),
            (None, Some(_)) => delay.schedule_hide(event.time),
            (None, None) => delay.cancel_all(),
        }
    }

    fn handle_document_mouse_down(&self, event: &PointerEvent) {
        let outside = {
            let editor = self.editor.borrow();
            editor.is_visible() && !editor.contains_point(event.x, event.y)
        };
        if outside {
            self.commit();
            self.hide();
        }
    }

    fn handle_resize(&self, size: Size) {
        let anchor = {
            let mut editor = self.editor.borrow_mut();
            editor.set_size(size);
            editor.anchor()
        };
        if let Some(cell) = anchor {
            self.store().merge(cell, &CommentPatch::style(size.width, size.height));
        }
    }

    fn handle_render(&self, event: &mut HookEvent<'_>) -> ListenerResult {
        if let HookEvent::CellRender { address, classes } = event {
            if self.store().has_comment(*address) {
                classes.push(COMMENT_CELL_CLASS.to_string());
            }
        }
        Ok(())
    }
}

fn bind(weak: &Weak<CommentsInner>, f: fn(&CommentsInner, &UiEvent)) -> impl Fn(&UiEvent) + 'static {
    let weak = weak.clone();
    move |event: &UiEvent| {
        if let Some(inner) = weak.upgrade() {
            f(&inner, event);
        }
    }
}

fn bind_hook(
    weak: &Weak<CommentsInner>,
    f: fn(&CommentsInner, &mut HookEvent<'_>) -> ListenerResult,
) -> impl Fn(&mut HookEvent<'_>) -> ListenerResult + 'static {
    let weak = weak.clone();
    move |event: &mut HookEvent<'_>| match weak.upgrade() {
        Some(inner) => f(&inner, event),
        None => Ok(()),
    }
}

fn upgrade(weak: &Weak<CommentsInner>) -> Result<Rc<CommentsInner>> {
    weak.upgrade()
        .ok_or_else(|| Error::Precondition("comments plugin is gone".into()))
}

fn anchor_record(cx: &MenuContext<'_>) -> Option<CommentRecord> {
    let cell = cx.selection.anchor?;
    CommentsStore::new(cx.grid.meta.as_ref()).get(cell)
}

fn anchor_has_comment(cx: &MenuContext<'_>) -> bool {
    anchor_record(cx).is_some_and(|r| !r.value.is_empty())
}

/// All selected comments are read-only, and there is at least one.
fn all_comments_read_only(cx: &MenuContext<'_>) -> bool {
    let store = CommentsStore::new(cx.grid.meta.as_ref());
    let mut any = false;
    let mut all = true;
    cx.selection.for_each_cell(|cell| {
        if let Some(record) = store.get(cell).filter(|r| !r.value.is_empty()) {
            any = true;
            all &= record.is_read_only();
        }
    });
    any && all
}

fn menu_items(weak: &Weak<CommentsInner>) -> Vec<MenuItem> {
    let (add, remove) = (weak.clone(), weak.clone());
    vec![
        MenuItem::Separator,
        ActionItem::new(
            ADD_EDIT_KEY,
            Label::dynamic(|cx| {
                let label = if anchor_has_comment(cx) { "Edit comment" } else { "Add comment" };
                label.to_string()
            }),
        )
        .on_execute(move |cx: &CommandContext<'_>| {
            let inner = upgrade(&add)?;
            let cell = cx
                .selection
                .anchor
                .ok_or_else(|| Error::Precondition("nothing selected".into()))?;
            inner.set_range(Some(CellRange::single(cell)));
            inner.show()?;
            inner.editor.borrow_mut().focus();
            Ok(())
        })
        .disabled_when(|cx| !cx.selection.is_actionable() || cx.selection.ranges.len() != 1)
        .into(),
        ActionItem::new(REMOVE_KEY, "Delete comment")
            .on_execute(move |cx: &CommandContext<'_>| {
                let inner = upgrade(&remove)?;
                let mut cells = Vec::new();
                cx.selection.for_each_cell(|cell| cells.push(cell));
                for cell in cells {
                    inner.remove_comment_at_cell(cell.row, cell.col)?;
                }
                Ok(())
            })
            .disabled_when(|cx| !cx.selection.is_actionable())
            .into(),
        ActionItem::new(
            READ_ONLY_KEY,
            Label::dynamic(|cx| {
                if all_comments_read_only(cx) {
                    "\u{2713} Read-only comment".to_string()
                } else {
                    "Read-only comment".to_string()
                }
            }),
        )
        .on_execute(|cx: &CommandContext<'_>| {
            let read_only = !all_comments_read_only(&cx.menu());
            let store = CommentsStore::new(cx.grid.meta.as_ref());
            cx.selection.for_each_cell(|cell| {
                if store.has_comment(cell) {
                    store.merge(cell, &CommentPatch::read_only(read_only));
                }
            });
            Ok(())
        })
        .disabled_when(|cx| !cx.selection.is_actionable() || !anchor_has_comment(cx))
        .into(),
    ]
}

pub struct Comments {
    inner: Rc<CommentsInner>,
    events: Option<EventManager>,
}

impl Comments {
    pub fn new(grid: GridContext) -> Self {
        let settings = grid.with_settings(|s| s.comments.clone());
        Self {
            inner: Rc::new(CommentsInner {
                grid,
                range: RefCell::new(None),
                editor: RefCell::new(CommentEditor::new(Size::new(settings.editor_width, settings.editor_height))),
                delay: RefCell::new(DisplayDelay::from_millis(settings.display_delay_ms)),
            }),
            events: None,
        }
    }

    /// Range whose first cell the editor anchors to.
    pub fn range(&self) -> Option<CellRange> {
        *self.inner.range.borrow()
    }

    pub fn set_range(&self, range: impl Into<CellRange>) {
        self.inner.set_range(Some(range.into()));
    }

    pub fn clear_range(&self) {
        self.inner.set_range(None);
    }

    /// Show the editor for the active range. `Ok(false)` when the anchor
    /// lies outside the data.
    pub fn show(&self) -> Result<bool> {
        self.inner.show()
    }

    pub fn show_at_cell(&self, row: usize, col: usize) -> Result<bool> {
        self.inner.show_at_cell(row, col)
    }

    /// Idempotent; hooks only fire if the editor was visible.
    pub fn hide(&self) {
        self.inner.hide();
    }

    pub fn refresh_editor(&self, force: bool) {
        self.inner.refresh_editor(force);
    }

    pub fn focus_editor(&self) -> bool {
        self.inner.editor.borrow_mut().focus()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.editor.borrow().is_visible()
    }

    pub fn with_editor<R>(&self, f: impl FnOnce(&CommentEditor) -> R) -> R {
        f(&self.inner.editor.borrow())
    }

    pub fn get_comment(&self) -> Result<Option<String>> {
        let cell = self.inner.anchor()?;
        Ok(self.get_comment_at_cell(cell.row, cell.col))
    }

    pub fn get_comment_at_cell(&self, row: usize, col: usize) -> Option<String> {
        self.get_comment_meta(row, col).map(|r| r.value)
    }

    /// Store `value` (or the editor text when `None`) for the active range.
    pub fn set_comment(&self, value: Option<&str>) -> Result<()> {
        self.inner.set_comment(value)
    }

    pub fn set_comment_at_cell(&self, row: usize, col: usize, value: &str) -> Result<()> {
        self.inner.set_range(Some(CellRange::single(CellAddress::new(row, col))));
        self.inner.set_comment(Some(value))
    }

    pub fn remove_comment(&self) -> Result<()> {
        self.inner.remove_comment()
    }

    pub fn remove_comment_at_cell(&self, row: usize, col: usize) -> Result<()> {
        self.inner.remove_comment_at_cell(row, col)
    }

    /// Merge `patch` into the cell's comment record.
    pub fn update_comment_meta(&self, row: usize, col: usize, patch: &CommentPatch) -> CommentRecord {
        self.inner.store().merge(CellAddress::new(row, col), patch)
    }

    pub fn get_comment_meta(&self, row: usize, col: usize) -> Option<CommentRecord> {
        self.inner.store().get(CellAddress::new(row, col))
    }

    pub fn target_is_cell_with_comment(&self, event: &PointerEvent) -> bool {
        event.cell.is_some_and(|c| self.inner.store().has_comment(c))
    }

    /// Run delayed show/hide actions that are due at `now`.
    pub fn tick(&self, now: Instant) {
        self.inner.tick(now);
    }
}

impl Plugin for Comments {
    fn key(&self) -> &'static str {
        PLUGIN_KEY
    }

    fn is_enabled(&self, settings: &Settings) -> bool {
        settings.comments.enabled
    }

    fn enable_plugin(&mut self) -> Result<()> {
        if self.events.is_some() {
            return Ok(());
        }
        let inner = &self.inner;
        let settings = inner.grid.with_settings(|s| s.comments.clone());
        inner
            .editor
            .borrow_mut()
            .set_default_size(Size::new(settings.editor_width, settings.editor_height));
        inner
            .delay
            .borrow_mut()
            .set_delay(Duration::from_millis(settings.display_delay_ms));

        let weak = Rc::downgrade(inner);
        let hooks = &inner.grid.hooks;
        let owner = Some(PLUGIN_KEY);
        let menu_weak = weak.clone();
        hooks.add(&AFTER_CONTEXT_MENU_DEFAULT_OPTIONS, owner, move |event| {
            if let HookEvent::MenuItems(items) = event {
                items.extend(menu_items(&menu_weak));
            }
            Ok(())
        })?;
        hooks.add(&AFTER_RENDERER, owner, bind_hook(&weak, CommentsInner::handle_render))?;
        for name in [AFTER_SCROLL_VERTICALLY, AFTER_SCROLL_HORIZONTALLY] {
            hooks.add(
                &name,
                owner,
                bind_hook(&weak, |inner, _| {
                    inner.refresh_editor(false);
                    Ok(())
                }),
            )?;
        }

        let mut events = EventManager::new(inner.grid.events.clone());
        let editor = EventTarget::Overlay(OverlayKind::CommentEditor);

        events.add_listener(
            EventTarget::Grid,
            EventKind::MouseOver,
            bind(&weak, |inner, event| {
                if let Some(pointer) = event.pointer() {
                    inner.handle_mouse_over(pointer);
                }
            }),
        );
        events.add_listener(
            EventTarget::Document,
            EventKind::MouseDown,
            bind(&weak, |inner, event| {
                if let Some(pointer) = event.pointer() {
                    inner.handle_document_mouse_down(pointer);
                }
            }),
        );
        for kind in [EventKind::Scroll, EventKind::Resize] {
            events.add_listener(EventTarget::Grid, kind, bind(&weak, |inner, _| inner.refresh_editor(false)));
        }
        events.add_listener(
            editor,
            EventKind::MouseDown,
            bind(&weak, |inner, _| {
                inner.editor.borrow_mut().focus();
            }),
        );
        events.add_listener(
            editor,
            EventKind::MouseOver,
            bind(&weak, |inner, _| inner.delay.borrow_mut().cancel_hiding()),
        );
        events.add_listener(
            editor,
            EventKind::Input,
            bind(&weak, |inner, event| {
                if let UiEvent::Input(text) = event {
                    inner.editor.borrow_mut().set_value(text.as_str());
                }
            }),
        );
        events.add_listener(editor, EventKind::Blur, bind(&weak, |inner, _| inner.commit()));
        events.add_listener(
            editor,
            EventKind::OverlayResize,
            bind(&weak, |inner, event| {
                if let UiEvent::OverlayResize(size) = event {
                    inner.handle_resize(*size);
                }
            }),
        );

        self.events = Some(events);
        Ok(())
    }

    fn disable_plugin(&mut self) {
        self.inner.hide();
        self.inner.delay.borrow_mut().cancel_all();
        self.inner.grid.hooks.remove_owner(PLUGIN_KEY);
        self.events = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
