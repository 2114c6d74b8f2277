use crate::matcher::IgnoredRequestMatcher;
use crate::properties::SecurityProperties;
use elif_autoconfig::{ActivationCondition, AssemblyContext, AssemblyError, AutoConfiguration, OnProperty};
use elif_config::{ConfigurationProperties, PlaceholderResolver, PropertyBinder};

/// Binds [`SecurityProperties`] and registers them with the ignored-path matcher
///
/// Skipped entirely when `security.basic.enabled` is false.
#[derive(Debug, Clone)]
pub struct SecurityAutoConfiguration {
    ignore_unknown_fields: bool,
    placeholders: PlaceholderResolver,
}

impl Default for SecurityAutoConfiguration {
    fn default() -> Self {
        Self {
            ignore_unknown_fields: true,
            placeholders: PlaceholderResolver::new(),
        }
    }
}

impl SecurityAutoConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail assembly on unknown `security.*` keys
    pub fn strict(mut self) -> Self {
        self.ignore_unknown_fields = false;
        self
    }

    pub fn with_placeholder_resolver(mut self, placeholders: PlaceholderResolver) -> Self {
        self.placeholders = placeholders;
        self
    }

    /// Bind and validate the security properties found in `ctx`
    pub fn bind(&self, ctx: &AssemblyContext) -> Result<SecurityProperties, AssemblyError> {
        let mut properties = SecurityProperties::default();
        PropertyBinder::new(SecurityProperties::PREFIX)
            .ignore_unknown_fields(self.ignore_unknown_fields)
            .with_placeholder_resolver(self.placeholders.clone())
            .bind(&mut properties, ctx.properties())
            .into_result()?;
        properties.validate()?;
        Ok(properties)
    }
}

impl AutoConfiguration for SecurityAutoConfiguration {
    fn name(&self) -> &'static str {
        "SecurityAutoConfiguration"
    }

    fn conditions(&self) -> Vec<Box<dyn ActivationCondition + '_>> {
        vec![Box::new(OnProperty::enabled("security.basic.enabled"))]
    }

    fn configure(&self, ctx: &mut AssemblyContext) -> Result<(), AssemblyError> {
        let properties = self.bind(ctx)?;
        let matcher = IgnoredRequestMatcher::from_properties(&properties)
            .map_err(|e| AssemblyError::configuration_failed(self.name(), e.to_string()))?;

        if properties.user.is_default_password() {
            tracing::info!(
                "Using generated security password for user '{}'",
                properties.user.name
            );
        }
        tracing::debug!(
            "Ignoring {} path pattern(s) for security",
            matcher.patterns().len()
        );

        ctx.registry_mut().register(properties);
        ctx.registry_mut().register(matcher);
        Ok(())
    }
}
