//! Right-click command menu.
//!
//! Opening runs the item pipeline:
//! 1. `beforeContextMenuShow`
//! 2. predefined items, then `afterContextMenuDefaultOptions` (plugins append)
//! 3. composition against the items pattern from settings
//! 4. `beforeContextMenuSetItems` (last chance to edit the list)
//! 5. predicate evaluation, placement at the pointer, `afterContextMenuShow`
//!
//! Commands run outside of any borrow on the menu, so a command may close,
//! reopen, or query the menu freely.

pub mod executor;
pub mod items;
pub mod menu;
pub mod predefined;

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use overgrid_config::Settings;
use overgrid_core::LayoutDirection;
use serde_json::Value;

pub use executor::{command_key, CommandExecutor, PreparedCommand};
pub use items::{
    compose_items, resolve, ActionItem, Command, CommandContext, ItemsPattern, Label, MenuContext, MenuItem,
    PatternEntry, Predicate, ResolvedItem, ResolvedKind, SubmenuItem, SEPARATOR,
};
pub use menu::{Menu, MenuMetrics, MenuState};
pub use predefined::predefined_items;

use crate::error::Result;
use crate::events::{EventKind, EventManager, EventTarget, Key, OverlayKind, PointerEvent, UiEvent};
use crate::grid::{GridContext, SelectionContext};
use crate::hooks::{
    HookEvent, AFTER_CONTEXT_MENU_DEFAULT_OPTIONS, AFTER_CONTEXT_MENU_EXECUTE, AFTER_CONTEXT_MENU_HIDE,
    AFTER_CONTEXT_MENU_SHOW, BEFORE_CONTEXT_MENU_HIDE, BEFORE_CONTEXT_MENU_SET_ITEMS, BEFORE_CONTEXT_MENU_SHOW,
};
use crate::plugin::Plugin;

pub const PLUGIN_KEY: &str = "contextMenu";

struct MenuInner {
    grid: GridContext,
    menu: RefCell<Menu>,
    /// Commands of the open menu's items.
    executor: RefCell<CommandExecutor>,
    /// Selection captured when the menu opened.
    selection: RefCell<SelectionContext>,
    /// Programmatic pattern, overriding the settings one.
    pattern: RefCell<Option<ItemsPattern>>,
}

impl MenuInner {
    /// Predefined items with plugin additions, composed and edited by
    /// listeners.
    fn compose(&self) -> Vec<MenuItem> {
        let hooks = &self.grid.hooks;
        let mut defaults = predefined_items();
        hooks.run(&AFTER_CONTEXT_MENU_DEFAULT_OPTIONS, &mut HookEvent::MenuItems(&mut defaults));

        let pattern = self.pattern.borrow().clone();
        let pattern =
            pattern.unwrap_or_else(|| self.grid.with_settings(|s| ItemsPattern::from_setting(&s.context_menu)));
        let mut items = compose_items(&defaults, &pattern);
        hooks.run(&BEFORE_CONTEXT_MENU_SET_ITEMS, &mut HookEvent::MenuItems(&mut items));
        items
    }

    fn open(&self, event: &PointerEvent) -> bool {
        if !self.menu.borrow_mut().begin_open() {
            return false;
        }
        let hooks = &self.grid.hooks;
        hooks.run(&BEFORE_CONTEXT_MENU_SHOW, &mut HookEvent::Menu { geometry: None });

        let items = self.compose();
        if self.menu.borrow().state() != MenuState::Opening {
            // A listener closed it meanwhile
            return false;
        }

        let selection = self.grid.selection_context();
        let resolved = resolve(&items, &MenuContext { selection: &selection, grid: &self.grid });
        if resolved.is_empty() {
            log::debug!("Context menu has no visible items, not opening");
            self.menu.borrow_mut().abort_open();
            return false;
        }

        let metrics = self.grid.with_settings(MenuMetrics::from_settings);
        let geometry = self
            .grid
            .positioner()
            .place_at_point(event.x, event.y, metrics.size_of(&resolved));

        *self.executor.borrow_mut() = CommandExecutor::from_items(&items);
        *self.selection.borrow_mut() = selection;
        self.menu.borrow_mut().finish_open(resolved, geometry, metrics);
        log::debug!("Context menu opened at {:?}", geometry);

        hooks.run(&AFTER_CONTEXT_MENU_SHOW, &mut HookEvent::Menu { geometry: Some(geometry) });
        true
    }

    fn close(&self) {
        let geometry = {
            let mut menu = self.menu.borrow_mut();
            if !menu.begin_close() {
                return;
            }
            menu.geometry()
        };
        let hooks = &self.grid.hooks;
        hooks.run(&BEFORE_CONTEXT_MENU_HIDE, &mut HookEvent::Menu { geometry });
        self.menu.borrow_mut().finish_close();
        hooks.run(&AFTER_CONTEXT_MENU_HIDE, &mut HookEvent::Menu { geometry: None });
    }

    fn try_execute_command(&self, key: &str, params: &[Value]) -> Result<bool> {
        let is_open = self.menu.borrow().is_open();
        let (prepared, selection) = if is_open {
            let prepared = self.executor.borrow().prepare(key)?;
            (prepared, self.selection.borrow().clone())
        } else {
            let prepared = CommandExecutor::from_items(&self.compose()).prepare(key)?;
            (prepared, self.grid.selection_context())
        };

        let result = prepared.run(&CommandContext { key, selection: &selection, grid: &self.grid, params });
        if !matches!(result, Ok(false)) {
            self.close();
        }
        if result? {
            self.grid.hooks.run(
                &AFTER_CONTEXT_MENU_EXECUTE,
                &mut HookEvent::CommandExecuted { key, selection: &selection.ranges },
            );
            return Ok(true);
        }
        Ok(false)
    }

    fn execute_command(&self, key: &str, params: &[Value]) -> bool {
        match self.try_execute_command(key, params) {
            Ok(ran) => ran,
            Err(e) => {
                log::warn!("Context menu command '{}' failed: {}", key, e);
                false
            }
        }
    }

    fn open_submenu(&self) -> bool {
        let request = {
            let menu = self.menu.borrow();
            let metrics = menu.metrics();
            let request = menu.submenu_request().map(|(anchor, children)| (anchor, metrics.size_of(children)));
            request
        };
        let Some((anchor, size)) = request else {
            return false;
        };
        let geometry = self.grid.positioner().place_beside(anchor, size);
        self.menu.borrow_mut().open_submenu(geometry)
    }

    fn execute_selected(&self) -> bool {
        let key = self.menu.borrow().selected_command();
        match key {
            Some(key) => self.execute_command(&key, &[]),
            None => self.open_submenu(),
        }
    }

    fn handle_key(&self, key: Key) {
        if !self.menu.borrow().is_open() {
            return;
        }
        let rtl = self.grid.layout_direction() == LayoutDirection::Rtl;
        match (key, rtl) {
            (Key::Escape, _) => self.close(),
            (Key::ArrowDown, _) => {
                self.menu.borrow_mut().select_next();
            }
            (Key::ArrowUp, _) => {
                self.menu.borrow_mut().select_prev();
            }
            (Key::ArrowRight, false) | (Key::ArrowLeft, true) => {
                self.open_submenu();
            }
            (Key::ArrowLeft, false) | (Key::ArrowRight, true) => {
                self.menu.borrow_mut().close_submenu();
            }
            (Key::Enter, _) => {
                self.execute_selected();
            }
            (Key::Other, _) => {}
        }
    }

    fn handle_document_click(&self, event: &PointerEvent) {
        let outside = {
            let menu = self.menu.borrow();
            menu.is_open() && !menu.contains_point(event.x, event.y)
        };
        if outside {
            self.close();
        }
    }

    fn handle_overlay_click(&self, event: &PointerEvent) {
        let (key, parent) = {
            let menu = self.menu.borrow();
            (menu.command_at(event.x, event.y), menu.submenu_parent_at(event.x, event.y))
        };
        if let Some(key) = key {
            self.execute_command(&key, &[]);
        } else if let Some(index) = parent {
            {
                let mut menu = self.menu.borrow_mut();
                menu.close_submenu();
                menu.select(index);
            }
            self.open_submenu();
        }
    }
}

/// Handler that forwards to the menu while it is alive.
fn bind(weak: &Weak<MenuInner>, f: fn(&MenuInner, &UiEvent)) -> impl Fn(&UiEvent) + 'static {
    let weak = weak.clone();
    move |event: &UiEvent| {
        if let Some(inner) = weak.upgrade() {
            f(&inner, event);
        }
    }
}

pub struct ContextMenu {
    inner: Rc<MenuInner>,
    events: Option<EventManager>,
}

impl ContextMenu {
    pub fn new(grid: GridContext) -> Self {
        Self {
            inner: Rc::new(MenuInner {
                grid,
                menu: RefCell::new(Menu::new()),
                executor: RefCell::new(CommandExecutor::new()),
                selection: RefCell::new(SelectionContext::default()),
                pattern: RefCell::new(None),
            }),
            events: None,
        }
    }

    /// Open at a pointer position. No-op (false) if already open or if no
    /// item is visible.
    pub fn open(&self, event: &PointerEvent) -> bool {
        self.inner.open(event)
    }

    /// Always succeeds; hooks only fire if the menu was open.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_open(&self) -> bool {
        self.inner.menu.borrow().is_open()
    }

    pub fn state(&self) -> MenuState {
        self.inner.menu.borrow().state()
    }

    pub fn with_menu<R>(&self, f: impl FnOnce(&Menu) -> R) -> R {
        f(&self.inner.menu.borrow())
    }

    /// Override the items pattern from settings. `None` goes back to it.
    pub fn set_items_pattern(&self, pattern: Option<ItemsPattern>) {
        *self.inner.pattern.borrow_mut() = pattern;
    }

    /// Run the command registered under `key`. Unknown keys and failing
    /// commands are logged and return false.
    pub fn execute_command(&self, key: &str, params: &[Value]) -> bool {
        self.inner.execute_command(key, params)
    }

    /// Like [`execute_command`](Self::execute_command), but hands the error
    /// back. `Ok(false)` means the item was disabled.
    pub fn try_execute_command(&self, key: &str, params: &[Value]) -> Result<bool> {
        self.inner.try_execute_command(key, params)
    }

    pub fn select_next(&self) -> Option<usize> {
        self.inner.menu.borrow_mut().select_next()
    }

    pub fn select_prev(&self) -> Option<usize> {
        self.inner.menu.borrow_mut().select_prev()
    }

    /// Run the highlighted item, or open its submenu.
    pub fn execute_selected(&self) -> bool {
        self.inner.execute_selected()
    }

    pub fn open_submenu(&self) -> bool {
        self.inner.open_submenu()
    }

    pub fn close_submenu(&self) -> bool {
        self.inner.menu.borrow_mut().close_submenu()
    }
}

impl Plugin for ContextMenu {
    fn key(&self) -> &'static str {
        PLUGIN_KEY
    }

    fn is_enabled(&self, settings: &Settings) -> bool {
        settings.context_menu.is_enabled()
    }

    fn enable_plugin(&mut self) -> Result<()> {
        if self.events.is_some() {
            return Ok(());
        }
        let mut events = EventManager::new(self.inner.grid.events.clone());
        let weak = Rc::downgrade(&self.inner);

        events.add_listener(
            EventTarget::Grid,
            EventKind::ContextMenu,
            bind(&weak, |inner, event| {
                if let Some(pointer) = event.pointer() {
                    inner.open(pointer);
                }
            }),
        );
        events.add_listener(
            EventTarget::Document,
            EventKind::MouseDown,
            bind(&weak, |inner, event| {
                if let Some(pointer) = event.pointer() {
                    inner.handle_document_click(pointer);
                }
            }),
        );
        events.add_listener(
            EventTarget::Document,
            EventKind::KeyDown,
            bind(&weak, |inner, event| {
                if let UiEvent::KeyDown(key) = event {
                    inner.handle_key(*key);
                }
            }),
        );
        events.add_listener(
            EventTarget::Overlay(OverlayKind::ContextMenu),
            EventKind::MouseDown,
            bind(&weak, |inner, event| {
                if let Some(pointer) = event.pointer() {
                    inner.handle_overlay_click(pointer);
                }
            }),
        );

        self.events = Some(events);
        Ok(())
    }

    fn disable_plugin(&mut self) {
        self.inner.close();
        self.events = None;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{record_hooks, MockGrid, RecordedAction};
    use crate::hooks::{HookName, ListenerResult};
    use overgrid_config::ContextMenuSetting;
    use overgrid_core::{CellAddress, Rect};
    use std::cell::Cell;

    fn setup(settings: Settings) -> (Rc<MockGrid>, GridContext, ContextMenu) {
        let grid = MockGrid::new(10, 10).shared();
        let cx = grid.context(settings);
        let mut menu = ContextMenu::new(cx.clone());
        menu.enable_plugin().unwrap();
        (grid, cx, menu)
    }

    fn right_click(cx: &GridContext, x: f32, y: f32) {
        cx.events.emit(EventTarget::Grid, &UiEvent::ContextMenu(PointerEvent::new(x, y)));
    }

    fn key(cx: &GridContext, key: Key) {
        cx.events.emit(EventTarget::Document, &UiEvent::KeyDown(key));
    }

    const MENU_HOOKS: [HookName; 7] = [
        BEFORE_CONTEXT_MENU_SHOW,
        AFTER_CONTEXT_MENU_DEFAULT_OPTIONS,
        BEFORE_CONTEXT_MENU_SET_ITEMS,
        AFTER_CONTEXT_MENU_SHOW,
        BEFORE_CONTEXT_MENU_HIDE,
        AFTER_CONTEXT_MENU_HIDE,
        AFTER_CONTEXT_MENU_EXECUTE,
    ];

    #[test]
    fn test_right_click_opens_with_defaults() {
        let (grid, cx, menu) = setup(Settings::default());
        grid.select(CellAddress::new(1, 1));
        let log = record_hooks(&cx.hooks, &MENU_HOOKS);

        right_click(&cx, 40.0, 60.0);

        assert!(menu.is_open());
        assert_eq!(
            *log.borrow(),
            vec![
                "beforeContextMenuShow",
                "afterContextMenuDefaultOptions",
                "beforeContextMenuSetItems",
                "afterContextMenuShow"
            ]
        );
        menu.with_menu(|m| {
            assert_eq!(m.items().len(), 15);
            let geometry = m.geometry().unwrap();
            assert_eq!((geometry.x, geometry.y, geometry.width), (40.0, 60.0, 215.0));
        });
    }

    #[test]
    fn test_open_when_open_is_noop() {
        let (_grid, cx, menu) = setup(Settings::default());
        let log = record_hooks(&cx.hooks, &[AFTER_CONTEXT_MENU_SHOW]);

        right_click(&cx, 10.0, 10.0);
        assert!(!menu.open(&PointerEvent::new(300.0, 300.0)));

        assert_eq!(log.borrow().len(), 1);
        assert_eq!(menu.with_menu(|m| m.geometry().unwrap().x), 10.0);
    }

    #[test]
    fn test_close_always_succeeds() {
        let (_grid, cx, menu) = setup(Settings::default());
        let log = record_hooks(&cx.hooks, &[BEFORE_CONTEXT_MENU_HIDE, AFTER_CONTEXT_MENU_HIDE]);

        menu.close();
        assert!(log.borrow().is_empty());

        right_click(&cx, 10.0, 10.0);
        menu.close();
        menu.close();
        assert_eq!(menu.state(), MenuState::Closed);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_click_outside_closes() {
        let (_grid, cx, menu) = setup(Settings::default());
        right_click(&cx, 10.0, 10.0);

        cx.events.emit(EventTarget::Document, &UiEvent::MouseDown(PointerEvent::new(20.0, 20.0)));
        assert!(menu.is_open());

        cx.events.emit(EventTarget::Document, &UiEvent::MouseDown(PointerEvent::new(900.0, 500.0)));
        assert!(!menu.is_open());
    }

    #[test]
    fn test_keyboard_execute() {
        let (grid, cx, menu) = setup(Settings::default());
        grid.select(CellAddress::new(3, 2));
        let log = record_hooks(&cx.hooks, &[AFTER_CONTEXT_MENU_EXECUTE]);

        right_click(&cx, 10.0, 10.0);
        key(&cx, Key::ArrowDown);
        key(&cx, Key::Enter);

        assert_eq!(grid.actions(), vec![RecordedAction::InsertRows { at: 3, amount: 1 }]);
        assert!(!menu.is_open());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_escape_closes() {
        let (_grid, cx, menu) = setup(Settings::default());
        right_click(&cx, 10.0, 10.0);
        key(&cx, Key::Escape);
        assert!(!menu.is_open());
    }

    #[test]
    fn test_overlay_click_executes_item_under_pointer() {
        let (grid, cx, menu) = setup(Settings::default());
        grid.select(CellAddress::new(0, 4));
        right_click(&cx, 10.0, 10.0);

        // Second row: row_below
        let point = PointerEvent::new(20.0, 10.0 + 23.0 + 5.0);
        cx.events.emit(EventTarget::Overlay(OverlayKind::ContextMenu), &UiEvent::MouseDown(point));

        assert_eq!(grid.actions(), vec![RecordedAction::InsertRows { at: 1, amount: 1 }]);
        assert!(!menu.is_open());
    }

    #[test]
    fn test_overlay_click_opens_submenu() {
        let (grid, cx, menu) = setup(Settings::default());
        grid.select(CellAddress::new(2, 2));
        right_click(&cx, 10.0, 10.0);

        let click = |rect: Rect| {
            let point = PointerEvent::new(rect.x + 5.0, rect.y + 5.0);
            cx.events.emit(EventTarget::Overlay(OverlayKind::ContextMenu), &UiEvent::MouseDown(point));
        };
        let parent = menu.with_menu(|m| m.item_rect(m.items().len() - 1)).unwrap();
        click(parent);
        assert!(menu.is_open());
        let first_child = menu.with_menu(|m| m.submenu().and_then(|s| s.item_rect(0))).unwrap();

        click(first_child);
        assert!(!menu.is_open());
        assert_eq!(
            cx.meta.get_cell_meta(2, 2).get(predefined::ALIGNMENT_META_KEY),
            Some(&serde_json::json!({ "horizontal": "left" }))
        );
    }

    #[test]
    fn test_unknown_command_is_reported_not_raised() {
        let (grid, cx, menu) = setup(Settings::default());
        right_click(&cx, 10.0, 10.0);

        assert!(!menu.execute_command("no_such_item", &[]));
        assert!(menu.is_open());
        assert!(grid.actions().is_empty());
        assert!(matches!(
            menu.try_execute_command("no_such_item", &[]),
            Err(crate::error::Error::CommandNotFound(_))
        ));
    }

    #[test]
    fn test_corner_only_selection_disables_commands() {
        let (grid, cx, menu) = setup(Settings::default());
        grid.select_corner();
        right_click(&cx, 10.0, 10.0);

        menu.with_menu(|m| {
            assert!(m.items().iter().all(|i| i.disabled));
        });
        assert_eq!(menu.select_next(), None);
        assert!(!menu.execute_command(predefined::ROW_ABOVE, &[]));
        assert!(grid.actions().is_empty());
    }

    #[test]
    fn test_listener_adds_item() {
        let (grid, cx, menu) = setup(Settings::default());
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        cx.hooks
            .add(&AFTER_CONTEXT_MENU_DEFAULT_OPTIONS, Some("test"), move |event| -> ListenerResult {
                if let HookEvent::MenuItems(items) = event {
                    let h = h.clone();
                    items.push(MenuItem::Separator);
                    items.push(
                        ActionItem::new("custom", "Custom")
                            .on_execute(move |_| {
                                h.set(h.get() + 1);
                                Ok(())
                            })
                            .into(),
                    );
                }
                Ok(())
            })
            .unwrap();

        grid.select(CellAddress::new(0, 0));
        right_click(&cx, 10.0, 10.0);
        assert_eq!(menu.with_menu(|m| m.items().last().map(|i| i.key.clone())).as_deref(), Some("custom"));

        assert!(menu.execute_command("custom", &[]));
        assert_eq!(hits.get(), 1);
        // Closed menu: the list is composed on demand
        assert!(menu.execute_command("custom", &[]));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn test_key_pattern_from_settings() {
        let settings = Settings {
            context_menu: ContextMenuSetting::Keys(vec!["undo".into(), SEPARATOR.into(), "redo".into()]),
            ..Settings::default()
        };
        let (_grid, cx, menu) = setup(settings);
        right_click(&cx, 10.0, 10.0);

        let keys = menu.with_menu(|m| m.items().iter().map(|i| i.key.clone()).collect::<Vec<_>>());
        assert_eq!(keys, vec!["undo", SEPARATOR, "redo"]);
    }

    #[test]
    fn test_empty_menu_does_not_open() {
        let (_grid, cx, menu) = setup(Settings::default());
        menu.set_items_pattern(Some(ItemsPattern::Keys(Vec::new())));
        right_click(&cx, 10.0, 10.0);
        assert_eq!(menu.state(), MenuState::Closed);
    }

    #[test]
    fn test_submenu_via_keyboard() {
        let (grid, cx, menu) = setup(Settings::default());
        grid.select(CellAddress::new(2, 2));
        right_click(&cx, 10.0, 10.0);

        key(&cx, Key::ArrowUp);
        assert_eq!(menu.with_menu(|m| m.selected_item().map(|i| i.key.clone())).as_deref(), Some("alignment"));
        key(&cx, Key::ArrowRight);
        assert!(menu.with_menu(|m| m.submenu().is_some()));
        key(&cx, Key::Enter);

        assert!(!menu.is_open());
        assert_eq!(
            cx.meta.get_cell_meta(2, 2).get(predefined::ALIGNMENT_META_KEY),
            Some(&serde_json::json!({ "horizontal": "left" }))
        );
    }

    #[test]
    fn test_disable_releases_events() {
        let (_grid, cx, mut menu) = setup(Settings::default());
        menu.disable_plugin();
        assert!(cx.events.is_empty());

        right_click(&cx, 10.0, 10.0);
        assert!(!menu.is_open());
    }
}
