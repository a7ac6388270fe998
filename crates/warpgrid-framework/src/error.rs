//! Framework construction error types.

use thiserror::Error;

/// Errors that abort building a `Framework` or editing a `Registry`.
///
/// Per-cycle failures are reported as a `Status` instead.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error("plugin not found in registry: {0}")]
    PluginNotFound(String),

    #[error("plugin {plugin} does not extend the {extension_point} plugin interface")]
    CapabilityNotImplemented {
        plugin: String,
        extension_point: &'static str,
    },

    #[error("normalize score plugin {0} must also be enabled as a score plugin")]
    InconsistentPluginConfiguration(String),

    #[error("failed to initialize plugin {plugin}: {source}")]
    PluginInstantiation {
        plugin: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("plugin {plugin} is enabled more than once for {extension_point}")]
    DuplicatePlugin {
        plugin: String,
        extension_point: &'static str,
    },

    #[error("plugin already registered: {0}")]
    AlreadyRegistered(String),
}

pub type FrameworkResult<T> = Result<T, FrameworkError>;
