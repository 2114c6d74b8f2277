use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Binding failed with {} field error(s): {}", .errors.len(), summarize(.errors))]
    Binding { errors: Vec<FieldError> },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Configuration validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Unsupported configuration file: {path}")]
    UnsupportedFile { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Create a validation failed error
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::ValidationFailed {
            message: message.into(),
        }
    }

    /// Field errors carried by a binding failure, empty for other variants
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Binding { errors } => errors,
            _ => &[],
        }
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A raw value could not be coerced into the field's type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("'{value}' is not a boolean")]
    InvalidBoolean { value: String },

    #[error("'{value}' is not a valid {target}")]
    InvalidNumber { value: String, target: &'static str },

    #[error("'{value}' is not one of the accepted {target} values")]
    InvalidToken { value: String, target: &'static str },

    #[error("expected a single value for {target}")]
    ExpectedScalar { target: &'static str },

    #[error("expected nested properties")]
    ExpectedNested,
}

/// What went wrong for one key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldErrorKind {
    #[error("unknown field")]
    UnknownField,

    #[error("malformed key: {0}")]
    InvalidKey(String),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

/// A field-level binding error naming the offending key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{key}': {kind}")]
pub struct FieldError {
    pub key: String,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn unknown_field(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldErrorKind::UnknownField,
        }
    }

    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: FieldErrorKind::InvalidKey(reason.into()),
        }
    }

    pub fn conversion(key: impl Into<String>, error: ConversionError) -> Self {
        Self {
            key: key.into(),
            kind: FieldErrorKind::Conversion(error),
        }
    }

    pub fn is_unknown_field(&self) -> bool {
        matches!(self.kind, FieldErrorKind::UnknownField)
    }

    pub fn is_conversion(&self) -> bool {
        matches!(self.kind, FieldErrorKind::Conversion(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_lists_every_key() {
        let error = ConfigError::Binding {
            errors: vec![
                FieldError::unknown_field("security.bogus"),
                FieldError::conversion(
                    "security.enable-csrf",
                    ConversionError::InvalidBoolean {
                        value: "maybe".to_string(),
                    },
                ),
            ],
        };

        let message = error.to_string();
        assert!(message.contains("2 field error(s)"));
        assert!(message.contains("'security.bogus': unknown field"));
        assert!(message.contains("'maybe' is not a boolean"));
        assert_eq!(error.field_errors().len(), 2);
    }
}
