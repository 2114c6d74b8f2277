//! # elif-security
//!
//! Security settings for the elif.rs web framework, bound from relaxed
//! configuration under `security.*`, plus the auto-configuration that
//! registers them together with the matcher for ignored request paths.

pub mod autoconfig;
pub mod matcher;
pub mod properties;

// Re-export main types
pub use autoconfig::SecurityAutoConfiguration;
pub use matcher::IgnoredRequestMatcher;
pub use properties::*;

/// Common result type for security operations
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Security-related errors
#[derive(thiserror::Error, Debug)]
pub enum SecurityError {
    #[error("Invalid path pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] elif_config::ConfigError),
}
