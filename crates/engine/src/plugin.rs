//! Plugin lifecycle: `Disabled <-> Enabled -> Destroyed`.
//!
//! Plugins implement [`Plugin`] and are owned by a [`PluginHost`], which
//! enforces the state machine around them:
//! - `enable` is idempotent and enables declared dependencies first
//! - `disable` from Disabled is a no-op
//! - `update` is `disable` followed by `enable`
//! - `destroy` is terminal; every later call fails with `Error::Lifecycle`
//!
//! Hook listeners registered with the plugin's key as owner are removed by
//! the host on disable, so a plugin only has to release its own resources.

use std::any::Any;

use overgrid_config::{Settings, SettingsPatch};

use crate::comments::Comments;
use crate::context_menu::ContextMenu;
use crate::error::{Error, Result};
use crate::grid::GridContext;
use crate::hooks::{HookEvent, AFTER_PLUGIN_DISABLE, AFTER_PLUGIN_ENABLE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Disabled,
    Enabled,
    Destroyed,
}

/// A feature module. Collaborators are injected at construction.
pub trait Plugin: Any {
    /// Unique across a host.
    fn key(&self) -> &'static str;

    /// Plugins that must be enabled before this one, in order.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// Whether settings ask for this plugin.
    fn is_enabled(&self, settings: &Settings) -> bool;

    /// Allocate sub-resources and register hooks and events. On error the
    /// host calls `disable_plugin` to release whatever was allocated.
    fn enable_plugin(&mut self) -> Result<()>;

    /// Release everything `enable_plugin` allocated. Must tolerate being
    /// called on a partially enabled plugin.
    fn disable_plugin(&mut self);

    fn destroy_plugin(&mut self) {
        self.disable_plugin();
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct Slot {
    key: &'static str,
    state: PluginState,
    plugin: Box<dyn Plugin>,
}

pub struct PluginHost {
    grid: GridContext,
    slots: Vec<Slot>,
}

impl PluginHost {
    pub fn new(grid: GridContext) -> Self {
        Self { grid, slots: Vec::new() }
    }

    /// Host with the context menu and comments plugins registered (not
    /// enabled).
    pub fn with_builtin_plugins(grid: GridContext) -> Result<Self> {
        let mut host = Self::new(grid.clone());
        host.register(ContextMenu::new(grid.clone()))?;
        host.register(Comments::new(grid))?;
        Ok(host)
    }

    pub fn grid(&self) -> &GridContext {
        &self.grid
    }

    /// Install a plugin in the Disabled state.
    pub fn register<P: Plugin>(&mut self, plugin: P) -> Result<()> {
        let key = plugin.key();
        if self.position(key).is_some() {
            return Err(Error::Configuration(format!("plugin '{key}' is already registered")));
        }
        self.slots.push(Slot { key, state: PluginState::Disabled, plugin: Box::new(plugin) });
        Ok(())
    }

    pub fn state(&self, key: &str) -> Option<PluginState> {
        self.position(key).map(|i| self.slots[i].state)
    }

    pub fn get<T: Plugin>(&self, key: &str) -> Option<&T> {
        let i = self.position(key)?;
        self.slots[i].plugin.as_any().downcast_ref::<T>()
    }

    pub fn get_mut<T: Plugin>(&mut self, key: &str) -> Option<&mut T> {
        let i = self.position(key)?;
        self.slots[i].plugin.as_any_mut().downcast_mut::<T>()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.key == key)
    }

    fn slot_index(&self, key: &str) -> Result<usize> {
        self.position(key).ok_or_else(|| Error::PluginNotFound(key.to_string()))
    }

    fn ensure_alive(&self, index: usize, action: &'static str) -> Result<()> {
        let slot = &self.slots[index];
        if slot.state == PluginState::Destroyed {
            return Err(Error::Lifecycle { plugin: slot.key.to_string(), state: slot.state, action });
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Enable a plugin and, first, its dependencies. A no-op if already
    /// enabled. If anything fails, every plugin this call enabled is
    /// disabled again, most recent first.
    pub fn enable(&mut self, key: &str) -> Result<()> {
        let mut visiting = Vec::new();
        let mut enabled = Vec::new();
        let result = self.enable_with(key, &mut visiting, &mut enabled);
        if result.is_err() {
            for dependency in enabled.into_iter().rev() {
                if let Err(e) = self.disable(dependency) {
                    log::warn!("Plugin '{}' not rolled back: {}", dependency, e);
                }
            }
        }
        result
    }

    fn enable_with(
        &mut self,
        key: &str,
        visiting: &mut Vec<&'static str>,
        enabled: &mut Vec<&'static str>,
    ) -> Result<()> {
        let index = self.slot_index(key)?;
        self.ensure_alive(index, "enable")?;
        if self.slots[index].state == PluginState::Enabled {
            return Ok(());
        }

        let own_key = self.slots[index].key;
        visiting.push(own_key);
        let dependencies: Vec<&'static str> = self.slots[index].plugin.dependencies().to_vec();
        for dependency in dependencies {
            let failure = |reason: String| Error::Dependency {
                plugin: own_key.to_string(),
                dependency: dependency.to_string(),
                reason,
            };
            if visiting.contains(&dependency) {
                visiting.pop();
                return Err(failure("circular dependency".to_string()));
            }
            let outcome = match self.position(dependency) {
                None => Err(failure("not installed".to_string())),
                Some(_) => self
                    .enable_with(dependency, visiting, enabled)
                    .map_err(|e| failure(e.to_string())),
            };
            if let Err(e) = outcome {
                visiting.pop();
                log::warn!("Plugin '{}' not enabled: {}", own_key, e);
                return Err(e);
            }
        }
        visiting.pop();

        let slot = &mut self.slots[index];
        if let Err(e) = slot.plugin.enable_plugin() {
            slot.plugin.disable_plugin();
            self.grid.hooks.remove_owner(own_key);
            log::warn!("Plugin '{}' failed to enable: {}", own_key, e);
            return Err(e);
        }
        slot.state = PluginState::Enabled;
        enabled.push(own_key);
        log::debug!("Plugin '{}' enabled", own_key);

        self.grid.hooks.run(&AFTER_PLUGIN_ENABLE, &mut HookEvent::Plugin { key: own_key });
        Ok(())
    }

    /// Disable a plugin, releasing its event subscriptions and hook
    /// listeners. A no-op if already disabled. Dependents are left alone.
    pub fn disable(&mut self, key: &str) -> Result<()> {
        let index = self.slot_index(key)?;
        self.ensure_alive(index, "disable")?;
        let slot = &mut self.slots[index];
        if slot.state == PluginState::Disabled {
            return Ok(());
        }

        slot.plugin.disable_plugin();
        slot.state = PluginState::Disabled;
        let own_key = slot.key;
        let removed = self.grid.hooks.remove_owner(own_key);
        log::debug!("Plugin '{}' disabled ({} hook listeners released)", own_key, removed);

        self.grid.hooks.run(&AFTER_PLUGIN_DISABLE, &mut HookEvent::Plugin { key: own_key });
        Ok(())
    }

    /// `disable` then `enable`, picking up current settings.
    pub fn update(&mut self, key: &str) -> Result<()> {
        let index = self.slot_index(key)?;
        self.ensure_alive(index, "update")?;
        self.disable(key)?;
        self.enable(key)
    }

    /// Release everything and forbid further transitions.
    pub fn destroy(&mut self, key: &str) -> Result<()> {
        let index = self.slot_index(key)?;
        self.ensure_alive(index, "destroy")?;
        let slot = &mut self.slots[index];
        slot.plugin.destroy_plugin();
        slot.state = PluginState::Destroyed;
        let own_key = slot.key;
        self.grid.hooks.remove_owner(own_key);
        log::debug!("Plugin '{}' destroyed", own_key);
        Ok(())
    }

    /// Enable every disabled plugin whose settings ask for it. Failures are
    /// collected, not fatal to the others.
    pub fn enable_all(&mut self) -> Vec<(&'static str, Error)> {
        let settings = self.grid.settings();
        let wanted: Vec<&'static str> = self
            .slots
            .iter()
            .filter(|s| s.state == PluginState::Disabled && s.plugin.is_enabled(&settings))
            .map(|s| s.key)
            .collect();

        wanted
            .into_iter()
            .filter_map(|key| self.enable(key).err().map(|e| (key, e)))
            .collect()
    }

    /// Merge `patch` into the grid settings, then `update` every plugin the
    /// new settings ask for and disable the rest.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Vec<(&'static str, Error)> {
        let settings = self.grid.settings().merged(patch);
        self.grid.set_settings(settings.clone());

        let plan: Vec<(&'static str, bool)> = self
            .slots
            .iter()
            .filter(|s| s.state != PluginState::Destroyed)
            .map(|s| (s.key, s.plugin.is_enabled(&settings)))
            .collect();

        let mut failures = Vec::new();
        for (key, wanted) in plan {
            let result = if wanted { self.update(key) } else { self.disable(key) };
            if let Err(e) = result {
                failures.push((key, e));
            }
        }
        failures
    }

    /// Destroy everything not yet destroyed, last registered first.
    pub fn destroy_all(&mut self) {
        let keys: Vec<&'static str> = self
            .slots
            .iter()
            .rev()
            .filter(|s| s.state != PluginState::Destroyed)
            .map(|s| s.key)
            .collect();
        for key in keys {
            if let Err(e) = self.destroy(key) {
                log::warn!("Plugin '{}' failed to destroy: {}", key, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    use crate::events::{EventKind, EventManager, EventTarget, UiEvent};
    use crate::harness::{record_hooks, MockGrid};
    use crate::hooks::AFTER_RENDERER;

    struct Dummy {
        key: &'static str,
        deps: &'static [&'static str],
        grid: GridContext,
        events: Option<EventManager>,
        enables: Rc<Cell<usize>>,
        fired: Rc<Cell<usize>>,
        refuse: bool,
    }

    impl Dummy {
        fn new(key: &'static str, grid: &GridContext) -> Self {
            Self {
                key,
                deps: &[],
                grid: grid.clone(),
                events: None,
                enables: Rc::new(Cell::new(0)),
                fired: Rc::new(Cell::new(0)),
                refuse: false,
            }
        }

        fn depends_on(mut self, deps: &'static [&'static str]) -> Self {
            self.deps = deps;
            self
        }

        fn refusing(mut self) -> Self {
            self.refuse = true;
            self
        }
    }

    impl Plugin for Dummy {
        fn key(&self) -> &'static str {
            self.key
        }

        fn dependencies(&self) -> &[&'static str] {
            self.deps
        }

        fn is_enabled(&self, settings: &Settings) -> bool {
            !settings.strict_hooks
        }

        fn enable_plugin(&mut self) -> Result<()> {
            let mut events = EventManager::new(self.grid.events.clone());
            let fired = self.fired.clone();
            events.add_listener(EventTarget::Grid, EventKind::Scroll, move |_| fired.set(fired.get() + 1));
            self.events = Some(events);
            self.grid.hooks.add(&AFTER_RENDERER, Some(self.key), |_| Ok(()))?;
            if self.refuse {
                return Err(Error::Configuration("refused".into()));
            }
            self.enables.set(self.enables.get() + 1);
            Ok(())
        }

        fn disable_plugin(&mut self) {
            self.events = None;
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn setup() -> (Rc<MockGrid>, PluginHost) {
        let grid = MockGrid::new(10, 10).shared();
        let host = PluginHost::new(grid.context(Settings::default()));
        (grid, host)
    }

    #[test]
    fn test_enable_twice_is_enable_once() {
        let (_grid, mut host) = setup();
        let dummy = Dummy::new("dummy", host.grid());
        let enables = dummy.enables.clone();
        host.register(dummy).unwrap();

        host.enable("dummy").unwrap();
        host.enable("dummy").unwrap();

        assert_eq!(enables.get(), 1);
        assert_eq!(host.grid().hooks.owner_count("dummy"), 1);
        assert_eq!(host.grid().events.len(), 1);
    }

    #[test]
    fn test_disable_releases_events_and_hooks() {
        let (_grid, mut host) = setup();
        let dummy = Dummy::new("dummy", host.grid());
        let fired = dummy.fired.clone();
        host.register(dummy).unwrap();
        host.enable("dummy").unwrap();

        host.disable("dummy").unwrap();
        host.grid().events.emit(EventTarget::Grid, &UiEvent::Scroll);

        assert_eq!(fired.get(), 0);
        assert_eq!(host.grid().hooks.owner_count("dummy"), 0);
        assert_eq!(host.state("dummy"), Some(PluginState::Disabled));
        // And again: no-op
        host.disable("dummy").unwrap();
    }

    #[test]
    fn test_dependencies_enable_first() {
        let (_grid, mut host) = setup();
        let base = Dummy::new("base", host.grid());
        host.register(Dummy::new("top", host.grid()).depends_on(&["base"])).unwrap();
        host.register(base).unwrap();

        let log = record_hooks(&host.grid().hooks, &[AFTER_PLUGIN_ENABLE]);
        host.enable("top").unwrap();

        assert_eq!(host.state("base"), Some(PluginState::Enabled));
        assert_eq!(host.state("top"), Some(PluginState::Enabled));
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_missing_dependency_fails_without_enabling() {
        let (_grid, mut host) = setup();
        let top = Dummy::new("top", host.grid()).depends_on(&["ghost"]);
        let enables = top.enables.clone();
        host.register(top).unwrap();

        let err = host.enable("top").unwrap_err();
        assert!(matches!(err, Error::Dependency { ref dependency, .. } if dependency == "ghost"));
        assert_eq!(host.state("top"), Some(PluginState::Disabled));
        assert_eq!(enables.get(), 0);
    }

    #[test]
    fn test_refusing_dependency_is_a_dependency_error() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("base", host.grid()).refusing()).unwrap();
        host.register(Dummy::new("top", host.grid()).depends_on(&["base"])).unwrap();

        let err = host.enable("top").unwrap_err();
        assert!(matches!(err, Error::Dependency { .. }));
        assert_eq!(host.state("base"), Some(PluginState::Disabled));
        // Rolled back: no leftovers from the partial enable
        assert_eq!(host.grid().hooks.owner_count("base"), 0);
        assert!(host.grid().events.is_empty());
    }

    #[test]
    fn test_failure_later_in_dependency_list_rolls_back_earlier_ones() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("base", host.grid())).unwrap();
        host.register(Dummy::new("top", host.grid()).depends_on(&["base", "ghost"])).unwrap();

        let err = host.enable("top").unwrap_err();
        assert!(matches!(err, Error::Dependency { ref dependency, .. } if dependency == "ghost"));
        assert_eq!(host.state("top"), Some(PluginState::Disabled));
        assert_eq!(host.state("base"), Some(PluginState::Disabled));
        assert_eq!(host.grid().hooks.owner_count("base"), 0);
        assert!(host.grid().events.is_empty());
    }

    #[test]
    fn test_rollback_spares_dependencies_enabled_earlier() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("base", host.grid())).unwrap();
        host.register(Dummy::new("mid", host.grid())).unwrap();
        host.register(Dummy::new("bad", host.grid()).refusing()).unwrap();
        host.register(Dummy::new("top", host.grid()).depends_on(&["base", "mid", "bad"])).unwrap();
        host.enable("base").unwrap();

        assert!(matches!(host.enable("top"), Err(Error::Dependency { .. })));
        assert_eq!(host.state("base"), Some(PluginState::Enabled));
        assert_eq!(host.state("mid"), Some(PluginState::Disabled));
        assert_eq!(host.state("bad"), Some(PluginState::Disabled));
        assert_eq!(host.grid().events.len(), 1);
    }

    #[test]
    fn test_circular_dependency_terminates() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("a", host.grid()).depends_on(&["b"])).unwrap();
        host.register(Dummy::new("b", host.grid()).depends_on(&["a"])).unwrap();

        assert!(matches!(host.enable("a"), Err(Error::Dependency { .. })));
        assert_eq!(host.state("a"), Some(PluginState::Disabled));
        assert_eq!(host.state("b"), Some(PluginState::Disabled));
    }

    #[test]
    fn test_destroy_is_terminal() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("dummy", host.grid())).unwrap();
        host.enable("dummy").unwrap();
        host.destroy("dummy").unwrap();

        assert!(host.grid().events.is_empty());
        for result in [host.enable("dummy"), host.disable("dummy"), host.update("dummy"), host.destroy("dummy")] {
            assert!(matches!(result, Err(Error::Lifecycle { state: PluginState::Destroyed, .. })));
        }
    }

    #[test]
    fn test_update_reenables() {
        let (_grid, mut host) = setup();
        let dummy = Dummy::new("dummy", host.grid());
        let enables = dummy.enables.clone();
        host.register(dummy).unwrap();

        host.update("dummy").unwrap();
        host.update("dummy").unwrap();
        assert_eq!(enables.get(), 2);
        assert_eq!(host.grid().hooks.owner_count("dummy"), 1);
    }

    #[test]
    fn test_update_settings_follows_is_enabled() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("dummy", host.grid())).unwrap();
        assert!(host.enable_all().is_empty());
        assert_eq!(host.state("dummy"), Some(PluginState::Enabled));

        let patch = SettingsPatch { strict_hooks: Some(true), ..Default::default() };
        assert!(host.update_settings(&patch).is_empty());
        assert_eq!(host.state("dummy"), Some(PluginState::Disabled));
        assert!(host.grid().settings().strict_hooks);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let (_grid, mut host) = setup();
        host.register(Dummy::new("dummy", host.grid())).unwrap();
        assert!(matches!(host.register(Dummy::new("dummy", host.grid())), Err(Error::Configuration(_))));
        assert!(host.get::<Dummy>("dummy").is_some());
        assert!(matches!(host.enable("nope"), Err(Error::PluginNotFound(_))));
    }
}
