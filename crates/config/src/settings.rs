// Grid plugin settings
// Loaded from ~/.config/overgrid/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Layout direction preference. `Inherit` defers to the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionSetting {
    #[default]
    Inherit,
    Ltr,
    Rtl,
}

/// Per-key override for a context menu item.
///
/// Only data can be configured here; callbacks come from the plugin that
/// owns the key (predefined items or a plugin hooking the default options).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOverride {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextMenuOptions {
    pub items: Vec<ItemOverride>,
}

/// The `contextMenu` setting.
///
/// - `true` / `false` toggles the menu with default items
/// - an array is the complete key ordering, separators included
/// - an object keeps the default ordering and overrides items by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextMenuSetting {
    Toggle(bool),
    Keys(Vec<String>),
    Options(ContextMenuOptions),
}

impl Default for ContextMenuSetting {
    fn default() -> Self {
        ContextMenuSetting::Toggle(false)
    }
}

impl ContextMenuSetting {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ContextMenuSetting::Toggle(false))
    }
}

/// Comment overlay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsSettings {
    pub enabled: bool,

    /// Hover delay before the editor shows, in milliseconds
    #[serde(rename = "displayDelay")]
    pub display_delay_ms: u64,

    #[serde(rename = "editor.width")]
    pub editor_width: f32,

    #[serde(rename = "editor.height")]
    pub editor_height: f32,

    /// Default for comments created without an explicit read-only flag
    #[serde(rename = "readOnly")]
    pub read_only: bool,
}

impl Default for CommentsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            display_delay_ms: 250,
            editor_width: 215.0,
            editor_height: 90.0,
            read_only: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Hooks
    #[serde(rename = "hooks.strict")]
    pub strict_hooks: bool,

    // Layout
    #[serde(rename = "layoutDirection")]
    pub layout_direction: DirectionSetting,

    // Context menu
    #[serde(rename = "contextMenu")]
    pub context_menu: ContextMenuSetting,

    #[serde(rename = "contextMenu.width")]
    pub menu_width: f32,

    #[serde(rename = "contextMenu.itemHeight")]
    pub menu_item_height: f32,

    #[serde(rename = "contextMenu.separatorHeight")]
    pub menu_separator_height: f32,

    // Comments
    #[serde(rename = "comments")]
    pub comments: CommentsSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Hooks
            strict_hooks: false,
            // Layout
            layout_direction: DirectionSetting::Inherit,
            // Context menu
            context_menu: ContextMenuSetting::default(),
            menu_width: 215.0,
            menu_item_height: 23.0,
            menu_separator_height: 1.0,
            // Comments
            comments: CommentsSettings::default(),
        }
    }
}

/// Partial settings. Every `Some` field replaces the base value in
/// [`Settings::merged`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    #[serde(rename = "hooks.strict", skip_serializing_if = "Option::is_none")]
    pub strict_hooks: Option<bool>,

    #[serde(rename = "layoutDirection", skip_serializing_if = "Option::is_none")]
    pub layout_direction: Option<DirectionSetting>,

    #[serde(rename = "contextMenu", skip_serializing_if = "Option::is_none")]
    pub context_menu: Option<ContextMenuSetting>,

    #[serde(rename = "contextMenu.width", skip_serializing_if = "Option::is_none")]
    pub menu_width: Option<f32>,

    #[serde(rename = "contextMenu.itemHeight", skip_serializing_if = "Option::is_none")]
    pub menu_item_height: Option<f32>,

    #[serde(rename = "contextMenu.separatorHeight", skip_serializing_if = "Option::is_none")]
    pub menu_separator_height: Option<f32>,

    #[serde(rename = "comments", skip_serializing_if = "Option::is_none")]
    pub comments: Option<CommentsPatch>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(rename = "displayDelay", skip_serializing_if = "Option::is_none")]
    pub display_delay_ms: Option<u64>,
    #[serde(rename = "editor.width", skip_serializing_if = "Option::is_none")]
    pub editor_width: Option<f32>,
    #[serde(rename = "editor.height", skip_serializing_if = "Option::is_none")]
    pub editor_height: Option<f32>,
    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

impl CommentsSettings {
    pub fn merged(&self, patch: &CommentsPatch) -> Self {
        Self {
            enabled: patch.enabled.unwrap_or(self.enabled),
            display_delay_ms: patch.display_delay_ms.unwrap_or(self.display_delay_ms),
            editor_width: patch.editor_width.unwrap_or(self.editor_width),
            editor_height: patch.editor_height.unwrap_or(self.editor_height),
            read_only: patch.read_only.unwrap_or(self.read_only),
        }
    }
}

impl Settings {
    /// Pure field-by-field merge. A context menu setting in the patch
    /// replaces the base one wholesale (arrays are orderings, not sets).
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            strict_hooks: patch.strict_hooks.unwrap_or(self.strict_hooks),
            layout_direction: patch.layout_direction.unwrap_or(self.layout_direction),
            context_menu: patch
                .context_menu
                .clone()
                .unwrap_or_else(|| self.context_menu.clone()),
            menu_width: patch.menu_width.unwrap_or(self.menu_width),
            menu_item_height: patch.menu_item_height.unwrap_or(self.menu_item_height),
            menu_separator_height: patch
                .menu_separator_height
                .unwrap_or(self.menu_separator_height),
            comments: match &patch.comments {
                Some(c) => self.comments.merged(c),
                None => self.comments.clone(),
            },
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cleaned = strip_line_comments(json);
        serde_json::from_str(&cleaned).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        toml::from_str(src).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("overgrid");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Error loading {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path. `.toml` files are parsed as
    /// TOML, everything else as JSON with `//` line comments.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "toml") {
            Self::from_toml_str(&contents)
        } else {
            Self::from_json_str(&contents)
        }
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json =
            serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

// Strip comments (lines starting with //)
fn strip_line_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}
