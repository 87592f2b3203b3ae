use std::fmt;

use crate::plugin::PluginState;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// API misuse, e.g. showing an overlay with no active range.
    Precondition(String),
    /// A declared dependency could not be enabled.
    Dependency { plugin: String, dependency: String, reason: String },
    /// No menu item is registered under this key.
    CommandNotFound(String),
    /// Lifecycle call not allowed in the plugin's current state.
    Lifecycle { plugin: String, state: PluginState, action: &'static str },
    /// Bad configuration, e.g. a listener for an unknown hook in strict mode.
    Configuration(String),
    /// No plugin is registered under this key.
    PluginNotFound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precondition(msg) => write!(f, "precondition failed: {msg}"),
            Self::Dependency { plugin, dependency, reason } => {
                write!(f, "plugin '{plugin}' requires '{dependency}': {reason}")
            }
            Self::CommandNotFound(key) => write!(f, "command not found: {key}"),
            Self::Lifecycle { plugin, state, action } => {
                write!(f, "cannot {action} plugin '{plugin}' in state {state:?}")
            }
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::PluginNotFound(key) => write!(f, "plugin not found: {key}"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
