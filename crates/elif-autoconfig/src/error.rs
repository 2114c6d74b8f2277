use elif_config::ConfigError;
use thiserror::Error;

/// Errors raised while assembling components
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("Component not found: {component_type}")]
    MissingComponent { component_type: String },

    #[error("Auto-configuration '{configuration}' failed: {message}")]
    ConfigurationFailed {
        configuration: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl AssemblyError {
    pub fn missing_component<T: ?Sized>() -> Self {
        Self::MissingComponent {
            component_type: std::any::type_name::<T>().to_string(),
        }
    }

    pub fn configuration_failed(configuration: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigurationFailed {
            configuration: configuration.into(),
            message: message.into(),
        }
    }
}

/// Errors raised while refreshing a context hierarchy
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Context hierarchy has no levels")]
    EmptyHierarchy,

    #[error("Context '{context}' failed to assemble: {source}")]
    Assembly {
        context: String,
        #[source]
        source: AssemblyError,
    },

    #[error("Context '{context}' has invalid properties: {source}")]
    Properties {
        context: String,
        #[source]
        source: ConfigError,
    },

    #[error("Web server for context '{context}' failed to start: {message}")]
    ServerStart { context: String, message: String },
}
