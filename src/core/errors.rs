use thiserror::Error;

/// Unified error type for the forgekit library
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Filesystem/IO errors
    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization errors (registry file, manifests)
    #[error("Serialization failed: {format}")]
    Serialization {
        format: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Package installation errors, tagged with the failing plugin name
    #[error("Installation of '{plugin}' failed: {message}")]
    Install {
        plugin: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Registry read/mutate errors
    #[error("Registry operation failed: {operation} - {message}")]
    Registry {
        operation: String,
        message: String,
    },

    /// Plugin instantiation errors
    #[error("Plugin '{plugin}' could not be loaded: {message}")]
    PluginLoad {
        plugin: String,
        message: String,
    },

    /// Enable requested for a plugin that is not installed on disk
    #[error("Plugin '{plugin}' is not installed")]
    NotInstalled {
        plugin: String,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl ForgeError {
    /// Create an IO error with operation context
    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        format: S,
        source: E,
    ) -> Self {
        Self::Serialization {
            format: format.into(),
            source: Box::new(source),
        }
    }

    /// Create an install error without a source
    pub fn install<S: Into<String>>(plugin: S, message: S) -> Self {
        Self::Install {
            plugin: plugin.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an install error with a source
    pub fn install_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        plugin: S,
        message: S,
        source: E,
    ) -> Self {
        Self::Install {
            plugin: plugin.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a registry error
    pub fn registry<S: Into<String>>(operation: S, message: S) -> Self {
        Self::Registry {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a plugin load error
    pub fn plugin_load<S: Into<String>>(plugin: S, message: S) -> Self {
        Self::PluginLoad {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a not-installed error
    pub fn not_installed<S: Into<String>>(plugin: S) -> Self {
        Self::NotInstalled {
            plugin: plugin.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The plugin name this error is about, if any
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::Install { plugin, .. }
            | Self::PluginLoad { plugin, .. }
            | Self::NotInstalled { plugin } => Some(plugin),
            _ => None,
        }
    }
}

/// Result type alias for forgekit operations
pub type Result<T> = std::result::Result<T, ForgeError>;
