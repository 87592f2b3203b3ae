//! Command lookup and dispatch by item key.

use rustc_hash::FxHashMap;

use super::items::{ActionItem, Command, CommandContext, MenuItem, Predicate};
use crate::error::{Error, Result};

/// Executor key of a submenu child: `"parent:child"`, unless the child key
/// already carries the prefix.
pub fn command_key(parent: &str, child: &str) -> String {
    match child.strip_prefix(parent) {
        Some(rest) if rest.starts_with(':') => child.to_string(),
        _ => format!("{parent}:{child}"),
    }
}

#[derive(Clone)]
struct Registered {
    callback: Option<Command>,
    disabled: Option<Predicate>,
}

/// Key -> command table. Submenu children are reachable as
/// `"parent:child"` when their own key does not already carry the prefix.
#[derive(Default)]
pub struct CommandExecutor {
    commands: FxHashMap<String, Registered>,
    common: Option<Command>,
}

/// A command looked up and detached from the executor, ready to run
/// without holding any borrow on it.
pub struct PreparedCommand {
    key: String,
    callback: Option<Command>,
    disabled: Option<Predicate>,
    common: Option<Command>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: &[MenuItem]) -> Self {
        let mut executor = Self::new();
        executor.register_all(items, None);
        executor
    }

    fn register_all(&mut self, items: &[MenuItem], parent: Option<&str>) {
        for item in items {
            match item {
                MenuItem::Separator => {}
                MenuItem::Action(action) => {
                    let key = match parent {
                        Some(p) => command_key(p, &action.key),
                        None => action.key.clone(),
                    };
                    self.register(key, action);
                }
                MenuItem::Submenu(sub) => {
                    self.commands
                        .insert(sub.key.clone(), Registered { callback: None, disabled: sub.disabled.clone() });
                    self.register_all(&sub.items, Some(&sub.key));
                }
            }
        }
    }

    /// Register or replace the command for `key`.
    pub fn register(&mut self, key: impl Into<String>, item: &ActionItem) {
        self.commands.insert(
            key.into(),
            Registered { callback: item.callback.clone(), disabled: item.disabled.clone() },
        );
    }

    /// Runs after every successful command.
    pub fn set_common_callback(&mut self, callback: Command) {
        self.common = Some(callback);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.commands.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn prepare(&self, key: &str) -> Result<PreparedCommand> {
        let registered = self
            .commands
            .get(key)
            .ok_or_else(|| Error::CommandNotFound(key.to_string()))?;
        Ok(PreparedCommand {
            key: key.to_string(),
            callback: registered.callback.clone(),
            disabled: registered.disabled.clone(),
            common: self.common.clone(),
        })
    }
}

impl PreparedCommand {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Run the command. Returns `Ok(false)` when it was skipped because the
    /// item is disabled or has no callback (a submenu parent).
    pub fn run(&self, cx: &CommandContext<'_>) -> Result<bool> {
        if self.disabled.as_ref().is_some_and(|p| p(&cx.menu())) {
            log::debug!("Skipping disabled command '{}'", self.key);
            return Ok(false);
        }
        let Some(callback) = &self.callback else {
            return Ok(false);
        };
        callback(cx)?;
        if let Some(common) = &self.common {
            common(cx)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::context_menu::items::SubmenuItem;
    use crate::harness::MockGrid;
    use overgrid_config::Settings;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&CommandContext<'_>) -> Result<()> + Clone) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        (log, move |cx: &CommandContext<'_>| {
            l.borrow_mut().push(cx.key.to_string());
            Ok(())
        })
    }

    fn exec(executor: &CommandExecutor, key: &str) -> Result<bool> {
        let grid = MockGrid::new(5, 5).shared();
        let cx = grid.context(Settings::default());
        let selection = cx.selection_context();
        executor
            .prepare(key)?
            .run(&CommandContext { key, selection: &selection, grid: &cx, params: &[] })
    }

    #[test]
    fn test_unknown_key() {
        let executor = CommandExecutor::new();
        assert!(matches!(exec(&executor, "nope"), Err(Error::CommandNotFound(k)) if k == "nope"));
    }

    #[test]
    fn test_submenu_children_get_prefixed_keys() {
        let (log, record) = recorder();
        let items = vec![MenuItem::from(SubmenuItem::new(
            "fmt",
            "Format",
            vec![
                ActionItem::new("bold", "Bold").on_execute(record.clone()).into(),
                ActionItem::new("fmt:italic", "Italic").on_execute(record).into(),
            ],
        ))];
        let executor = CommandExecutor::from_items(&items);

        assert!(exec(&executor, "fmt:bold").unwrap());
        assert!(exec(&executor, "fmt:italic").unwrap());
        assert!(!exec(&executor, "fmt").unwrap());
        assert_eq!(*log.borrow(), vec!["fmt:bold", "fmt:italic"]);
    }

    #[test]
    fn test_disabled_command_is_skipped() {
        let (log, record) = recorder();
        let items = vec![MenuItem::from(ActionItem::new("x", "X").on_execute(record).disabled_when(|_| true))];
        let executor = CommandExecutor::from_items(&items);

        assert!(!exec(&executor, "x").unwrap());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_common_callback_runs_after_command() {
        let (log, record) = recorder();
        let items = vec![MenuItem::from(ActionItem::new("x", "X").on_execute(record.clone()))];
        let mut executor = CommandExecutor::from_items(&items);
        executor.set_common_callback(Rc::new(move |cx: &CommandContext<'_>| record(cx)));

        exec(&executor, "x").unwrap();
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_command_error_propagates() {
        let items = vec![MenuItem::from(
            ActionItem::new("x", "X").on_execute(|_| Err(Error::Precondition("no".into()))),
        )];
        let executor = CommandExecutor::from_items(&items);
        assert!(matches!(exec(&executor, "x"), Err(Error::Precondition(_))));
    }
}
