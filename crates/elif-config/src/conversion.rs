use crate::error::ConversionError;
use crate::value::ConfigValue;

/// Converts raw configuration values into field types
pub trait ConversionService: Send + Sync {
    fn to_bool(&self, value: &ConfigValue) -> Result<bool, ConversionError>;

    fn to_text(&self, value: &ConfigValue) -> Result<String, ConversionError>;

    fn to_integer(&self, value: &ConfigValue) -> Result<i64, ConversionError>;

    /// Split a scalar into sequence elements
    fn to_list(&self, value: &ConfigValue) -> Result<Vec<String>, ConversionError>;
}

/// Boolean literals, integers, plain strings and comma-delimited lists
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConversionService;

impl DefaultConversionService {
    pub fn new() -> Self {
        Self
    }
}

impl ConversionService for DefaultConversionService {
    fn to_bool(&self, value: &ConfigValue) -> Result<bool, ConversionError> {
        match value {
            ConfigValue::Bool(b) => Ok(*b),
            ConfigValue::Integer(1) => Ok(true),
            ConfigValue::Integer(0) => Ok(false),
            other => {
                let text = other.as_text();
                match text.trim().to_ascii_lowercase().as_str() {
                    "true" | "yes" | "on" | "1" => Ok(true),
                    "false" | "no" | "off" | "0" => Ok(false),
                    _ => Err(ConversionError::InvalidBoolean { value: text }),
                }
            }
        }
    }

    fn to_text(&self, value: &ConfigValue) -> Result<String, ConversionError> {
        Ok(value.as_text())
    }

    fn to_integer(&self, value: &ConfigValue) -> Result<i64, ConversionError> {
        match value {
            ConfigValue::Integer(i) => Ok(*i),
            other => {
                let text = other.as_text();
                text.trim()
                    .parse::<i64>()
                    .map_err(|_| ConversionError::InvalidNumber {
                        value: text,
                        target: "integer",
                    })
            }
        }
    }

    fn to_list(&self, value: &ConfigValue) -> Result<Vec<String>, ConversionError> {
        let text = value.as_text();
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(text.split(',').map(|item| item.trim().to_string()).collect())
    }
}
