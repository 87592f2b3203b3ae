//! Built-in context menu items and their default order.
//!
//! Structural commands forward to [`GridActions`](crate::grid::GridActions).
//! Read-only and alignment commands are read-modify-write edits on cell
//! metadata, one complete value per key.

use serde_json::{json, Map, Value};

use overgrid_core::CellAddress;

use super::items::{ActionItem, CommandContext, Label, MenuContext, MenuItem, SubmenuItem};
use crate::error::{Error, Result};
use crate::grid::READ_ONLY_KEY;

pub const ROW_ABOVE: &str = "row_above";
pub const ROW_BELOW: &str = "row_below";
pub const COL_LEFT: &str = "col_left";
pub const COL_RIGHT: &str = "col_right";
pub const REMOVE_ROW: &str = "remove_row";
pub const REMOVE_COL: &str = "remove_col";
pub const UNDO: &str = "undo";
pub const REDO: &str = "redo";
pub const MAKE_READ_ONLY: &str = "make_read_only";
pub const ALIGNMENT: &str = "alignment";

/// Cell meta key holding `{ "horizontal": .., "vertical": .. }`.
pub const ALIGNMENT_META_KEY: &str = "alignment";

/// Every predefined key, separators included, in menu order.
pub const DEFAULT_ORDER: [&str; 15] = [
    ROW_ABOVE,
    ROW_BELOW,
    super::SEPARATOR,
    COL_LEFT,
    COL_RIGHT,
    super::SEPARATOR,
    REMOVE_ROW,
    REMOVE_COL,
    super::SEPARATOR,
    UNDO,
    REDO,
    super::SEPARATOR,
    MAKE_READ_ONLY,
    super::SEPARATOR,
    ALIGNMENT,
];

fn not_actionable(cx: &MenuContext<'_>) -> bool {
    !cx.selection.is_actionable()
}

fn anchor_range(cx: &CommandContext<'_>) -> Result<overgrid_core::CellRange> {
    cx.selection
        .last_range()
        .copied()
        .ok_or_else(|| Error::Precondition(format!("'{}' needs a selection", cx.key)))
}

fn structural(key: &'static str, name: &'static str, run: fn(&CommandContext<'_>) -> Result<()>) -> MenuItem {
    ActionItem::new(key, name).on_execute(run).disabled_when(not_actionable).into()
}

/// True if every selected cell is read-only (and at least one is selected).
pub fn all_read_only(cx: &MenuContext<'_>) -> bool {
    let mut any = false;
    let mut all = true;
    cx.selection.for_each_cell(|cell| {
        any = true;
        all &= cx.grid.meta.get_cell_meta(cell.row, cell.col).read_only();
    });
    any && all
}

fn toggle_read_only(cx: &CommandContext<'_>) -> Result<()> {
    let make_read_only = !all_read_only(&cx.menu());
    let meta = &cx.grid.meta;
    cx.selection.for_each_cell(|cell| {
        if make_read_only {
            meta.set_cell_meta(cell.row, cell.col, READ_ONLY_KEY, Value::Bool(true));
        } else {
            meta.remove_cell_meta(cell.row, cell.col, READ_ONLY_KEY);
        }
    });
    cx.grid.view.request_redraw();
    Ok(())
}

/// Horizontal or vertical alignment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
    Top,
    Middle,
    Bottom,
}

impl Alignment {
    pub const ALL: [Alignment; 7] = [
        Alignment::Left,
        Alignment::Center,
        Alignment::Right,
        Alignment::Justify,
        Alignment::Top,
        Alignment::Middle,
        Alignment::Bottom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
            Alignment::Top => "top",
            Alignment::Middle => "middle",
            Alignment::Bottom => "bottom",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Alignment::Left => "Left",
            Alignment::Center => "Center",
            Alignment::Right => "Right",
            Alignment::Justify => "Justify",
            Alignment::Top => "Top",
            Alignment::Middle => "Middle",
            Alignment::Bottom => "Bottom",
        }
    }

    /// Which field of the alignment record this choice writes.
    fn axis(self) -> &'static str {
        match self {
            Alignment::Left | Alignment::Center | Alignment::Right | Alignment::Justify => "horizontal",
            Alignment::Top | Alignment::Middle | Alignment::Bottom => "vertical",
        }
    }

    /// Submenu child key, e.g. `"alignment:left"`.
    pub fn key(self) -> String {
        format!("{}:{}", ALIGNMENT, self.as_str())
    }

    /// Set this alignment on one cell, keeping the other axis.
    pub fn apply(self, cx: &CommandContext<'_>, cell: CellAddress) {
        let mut record = match cx.grid.meta.get_cell_meta(cell.row, cell.col).get(ALIGNMENT_META_KEY) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        record.insert(self.axis().to_string(), json!(self.as_str()));
        cx.grid
            .meta
            .set_cell_meta(cell.row, cell.col, ALIGNMENT_META_KEY, Value::Object(record));
    }
}

fn alignment_submenu() -> MenuItem {
    let children: Vec<MenuItem> = Alignment::ALL
        .iter()
        .enumerate()
        .flat_map(|(i, &alignment)| {
            let item: MenuItem = ActionItem::new(alignment.key(), alignment.label())
                .on_execute(move |cx| {
                    cx.selection.for_each_cell(|cell| alignment.apply(cx, cell));
                    cx.grid.view.request_redraw();
                    Ok(())
                })
                .disabled_when(not_actionable)
                .into();
            // Divider between horizontal and vertical choices
            if i == 3 { vec![item, MenuItem::Separator] } else { vec![item] }
        })
        .collect();

    SubmenuItem::new(ALIGNMENT, "Alignment", children)
        .disabled_when(not_actionable)
        .into()
}

/// The predefined items, in [`DEFAULT_ORDER`].
pub fn predefined_items() -> Vec<MenuItem> {
    vec![
        structural(ROW_ABOVE, "Insert row above", |cx| {
            let range = anchor_range(cx)?;
            cx.grid.actions.insert_rows(range.top_left().row, 1);
            Ok(())
        }),
        structural(ROW_BELOW, "Insert row below", |cx| {
            let range = anchor_range(cx)?;
            cx.grid.actions.insert_rows(range.bottom_right().row + 1, 1);
            Ok(())
        }),
        MenuItem::Separator,
        structural(COL_LEFT, "Insert column left", |cx| {
            let range = anchor_range(cx)?;
            cx.grid.actions.insert_cols(range.top_left().col, 1);
            Ok(())
        }),
        structural(COL_RIGHT, "Insert column right", |cx| {
            let range = anchor_range(cx)?;
            cx.grid.actions.insert_cols(range.bottom_right().col + 1, 1);
            Ok(())
        }),
        MenuItem::Separator,
        structural(REMOVE_ROW, "Remove row", |cx| {
            let range = anchor_range(cx)?;
            cx.grid.actions.remove_rows(range.top_left().row, range.row_count());
            Ok(())
        }),
        structural(REMOVE_COL, "Remove column", |cx| {
            let range = anchor_range(cx)?;
            cx.grid.actions.remove_cols(range.top_left().col, range.col_count());
            Ok(())
        }),
        MenuItem::Separator,
        ActionItem::new(UNDO, "Undo")
            .on_execute(|cx| {
                cx.grid.actions.undo();
                Ok(())
            })
            .disabled_when(|cx| !cx.grid.actions.can_undo())
            .into(),
        ActionItem::new(REDO, "Redo")
            .on_execute(|cx| {
                cx.grid.actions.redo();
                Ok(())
            })
            .disabled_when(|cx| !cx.grid.actions.can_redo())
            .into(),
        MenuItem::Separator,
        ActionItem::new(
            MAKE_READ_ONLY,
            Label::dynamic(|cx| {
                if all_read_only(cx) {
                    "\u{2713} Read only".to_string()
                } else {
                    "Read only".to_string()
                }
            }),
        )
        .on_execute(toggle_read_only)
        .disabled_when(not_actionable)
        .into(),
        MenuItem::Separator,
        alignment_submenu(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_menu::items::resolve;
    use crate::harness::{MockGrid, RecordedAction};
    use crate::grid::{GridContext, SelectionContext};
    use overgrid_config::Settings;
    use overgrid_core::CellRange;
    use std::rc::Rc;

    fn setup() -> (Rc<MockGrid>, GridContext) {
        let grid = MockGrid::new(10, 10).shared();
        let cx = grid.context(Settings::default());
        (grid, cx)
    }

    fn run(cx: &GridContext, key: &str) {
        let selection = cx.selection_context();
        let item = find(&predefined_items(), key);
        let callback = match item {
            MenuItem::Action(a) => a.callback.unwrap(),
            other => panic!("not an action: {:?}", other),
        };
        callback(&CommandContext { key, selection: &selection, grid: cx, params: &[] }).unwrap();
    }

    fn find(items: &[MenuItem], key: &str) -> MenuItem {
        for item in items {
            if item.key() == key {
                return item.clone();
            }
            if let MenuItem::Submenu(s) = item {
                if let Some(found) = s.items.iter().find(|c| c.key() == key) {
                    return found.clone();
                }
            }
        }
        panic!("no item {key}")
    }

    #[test]
    fn test_default_order() {
        let keys: Vec<String> = predefined_items().iter().map(|i| i.key().to_string()).collect();
        assert_eq!(keys, DEFAULT_ORDER.iter().map(|k| k.to_string()).collect::<Vec<_>>());
    }

    #[test]
    fn test_structural_commands_forward() {
        let (grid, cx) = setup();
        grid.select(CellRange::new(CellAddress::new(2, 1), CellAddress::new(4, 3)));

        run(&cx, ROW_ABOVE);
        run(&cx, ROW_BELOW);
        run(&cx, COL_RIGHT);
        run(&cx, REMOVE_ROW);

        assert_eq!(
            grid.actions(),
            vec![
                RecordedAction::InsertRows { at: 2, amount: 1 },
                RecordedAction::InsertRows { at: 5, amount: 1 },
                RecordedAction::InsertCols { at: 4, amount: 1 },
                RecordedAction::RemoveRows { start: 2, amount: 3 },
            ]
        );
    }

    #[test]
    fn test_corner_only_disables_cell_commands() {
        let (grid, cx) = setup();
        grid.select_corner();
        let selection = cx.selection_context();
        let resolved = resolve(&predefined_items(), &MenuContext { selection: &selection, grid: &cx });

        for item in resolved.iter().filter(|i| !i.is_separator()) {
            assert!(item.disabled, "{} should be disabled", item.key);
        }
    }

    #[test]
    fn test_undo_follows_history() {
        let (grid, cx) = setup();
        let selection = SelectionContext::default();
        let menu = MenuContext { selection: &selection, grid: &cx };
        let undo = resolve(&predefined_items(), &menu).into_iter().find(|i| i.key == UNDO).unwrap();
        assert!(undo.disabled);

        grid.set_can_undo(true);
        let undo = resolve(&predefined_items(), &menu).into_iter().find(|i| i.key == UNDO).unwrap();
        assert!(!undo.disabled);
    }

    #[test]
    fn test_read_only_toggles() {
        let (grid, cx) = setup();
        grid.select(CellRange::new(CellAddress::new(0, 0), CellAddress::new(0, 1)));

        run(&cx, MAKE_READ_ONLY);
        assert!(cx.meta.get_cell_meta(0, 1).read_only());

        let selection = cx.selection_context();
        let label = match find(&predefined_items(), MAKE_READ_ONLY) {
            MenuItem::Action(a) => a.name.resolve(&MenuContext { selection: &selection, grid: &cx }),
            _ => unreachable!(),
        };
        assert!(label.starts_with('\u{2713}'));

        run(&cx, MAKE_READ_ONLY);
        assert!(!cx.meta.get_cell_meta(0, 0).read_only());
        assert_eq!(grid.redraw_count(), 2);
    }

    #[test]
    fn test_alignment_keeps_other_axis() {
        let (grid, cx) = setup();
        grid.select(CellAddress::new(1, 1));

        run(&cx, "alignment:center");
        run(&cx, "alignment:bottom");

        let meta = cx.meta.get_cell_meta(1, 1);
        assert_eq!(
            meta.get(ALIGNMENT_META_KEY),
            Some(&json!({ "horizontal": "center", "vertical": "bottom" }))
        );
    }
}
