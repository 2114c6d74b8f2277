use crate::ConfigError;

/// Trait for validating bound configuration values
pub trait ConfigValidator<T: ?Sized> {
    /// Validate a configuration value
    fn validate(&self, field: &str, value: &T) -> Result<(), ConfigError>;
}

/// Port number validator
pub struct PortValidator {
    pub min: u16,
    pub max: u16,
    /// Port 0 asks the OS for a free port
    pub allow_ephemeral: bool,
}

impl Default for PortValidator {
    fn default() -> Self {
        Self {
            min: 1,
            max: 65535,
            allow_ephemeral: true,
        }
    }
}

impl ConfigValidator<u16> for PortValidator {
    fn validate(&self, field: &str, value: &u16) -> Result<(), ConfigError> {
        if *value == 0 && self.allow_ephemeral {
            return Ok(());
        }
        if *value < self.min || *value > self.max {
            return Err(ConfigError::invalid_value(
                field,
                value.to_string(),
                format!("port between {} and {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// String length validator
pub struct LengthValidator {
    pub min_length: usize,
    pub max_length: Option<usize>,
}

impl LengthValidator {
    pub fn min(min_length: usize) -> Self {
        Self {
            min_length,
            max_length: None,
        }
    }

    pub fn range(min_length: usize, max_length: usize) -> Self {
        Self {
            min_length,
            max_length: Some(max_length),
        }
    }
}

impl ConfigValidator<str> for LengthValidator {
    fn validate(&self, field: &str, value: &str) -> Result<(), ConfigError> {
        if value.len() < self.min_length {
            return Err(ConfigError::invalid_value(
                field,
                value,
                format!("string with at least {} characters", self.min_length),
            ));
        }

        if let Some(max_length) = self.max_length {
            if value.len() > max_length {
                return Err(ConfigError::invalid_value(
                    field,
                    value,
                    format!("string with at most {} characters", max_length),
                ));
            }
        }

        Ok(())
    }
}

/// Every element must start with one of the given prefixes, unless it is an allowed literal
pub struct PrefixValidator {
    pub prefixes: Vec<String>,
    pub allowed_literals: Vec<String>,
}

impl PrefixValidator {
    pub fn new(prefixes: &[&str]) -> Self {
        Self {
            prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            allowed_literals: Vec::new(),
        }
    }

    pub fn allow_literal(mut self, literal: impl Into<String>) -> Self {
        self.allowed_literals.push(literal.into());
        self
    }
}

impl ConfigValidator<[String]> for PrefixValidator {
    fn validate(&self, field: &str, value: &[String]) -> Result<(), ConfigError> {
        for item in value {
            if self.allowed_literals.contains(item) {
                continue;
            }
            if !self.prefixes.iter().any(|p| item.starts_with(p.as_str())) {
                return Err(ConfigError::invalid_value(
                    field,
                    item.clone(),
                    format!("value starting with {}", self.prefixes.join(" or ")),
                ));
            }
        }
        Ok(())
    }
}

/// Composite validator that runs multiple validators
pub struct CompositeValidator<T: ?Sized> {
    validators: Vec<Box<dyn ConfigValidator<T>>>,
}

impl<T: ?Sized> CompositeValidator<T> {
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    pub fn add_validator(mut self, validator: Box<dyn ConfigValidator<T>>) -> Self {
        self.validators.push(validator);
        self
    }
}

impl<T: ?Sized> Default for CompositeValidator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> ConfigValidator<T> for CompositeValidator<T> {
    fn validate(&self, field: &str, value: &T) -> Result<(), ConfigError> {
        for validator in &self.validators {
            validator.validate(field, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validator() {
        let validator = PortValidator::default();

        assert!(validator.validate("server.port", &80).is_ok());
        assert!(validator.validate("server.port", &65535).is_ok());
        assert!(validator.validate("server.port", &0).is_ok());

        let strict = PortValidator {
            allow_ephemeral: false,
            ..PortValidator::default()
        };
        assert!(strict.validate("server.port", &0).is_err());
    }

    #[test]
    fn test_length_validator() {
        let validator = LengthValidator::range(3, 10);

        assert!(validator.validate("name", "hello").is_ok());
        assert!(validator.validate("name", "hi").is_err()); // Too short
        assert!(validator.validate("name", "this is too long").is_err()); // Too long
    }

    #[test]
    fn test_prefix_validator() {
        let validator = PrefixValidator::new(&["/"]).allow_literal("none");
        let ok = vec!["/css/**".to_string(), "none".to_string()];
        let bad = vec!["css/**".to_string()];

        assert!(validator.validate("security.ignored", &ok[..]).is_ok());
        match validator.validate("security.ignored", &bad[..]) {
            Err(ConfigError::InvalidValue { field, value, .. }) => {
                assert_eq!(field, "security.ignored");
                assert_eq!(value, "css/**");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_composite_validator() {
        let validator = CompositeValidator::<str>::new()
            .add_validator(Box::new(LengthValidator::min(1)))
            .add_validator(Box::new(LengthValidator::range(0, 4)));

        assert!(validator.validate("user.name", "user").is_ok());
        assert!(validator.validate("user.name", "").is_err());
        assert!(validator.validate("user.name", "admin").is_err());
    }
}
