//! Explicit application context hierarchies
//!
//! A [`ContextHierarchy`] assembles a chain of [`AppContext`]s from the root
//! down. Each level keeps an `Arc` to its parent. A level is assembled over
//! its parent's properties overlaid with its own, and its conditions and
//! configurations see the parent's components. When a web
//! environment is requested only the leaf becomes a web context, so a
//! hierarchy never starts more than one server.

use crate::assembly::{Assembly, AssemblyContext, ConditionReport};
use crate::error::ContextError;
use crate::registry::ComponentRegistry;
use elif_config::{
    bind_properties, BindContext, Bindable, ConfigEntry, ConfigValidator, ConfigurationProperties,
    FieldSpec, PortValidator, PropertyNode, PropertySet,
};
use std::sync::Arc;

/// How the leaf context serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WebEnvironment {
    /// Plain contexts only
    #[default]
    None,
    /// Web context without a listening server
    Mock,
    /// Listen on `server.port`
    DefinedPort,
    /// Listen on a port chosen by the OS
    RandomPort,
}

impl WebEnvironment {
    pub fn is_web(&self) -> bool {
        !matches!(self, WebEnvironment::None)
    }

    pub fn starts_server(&self) -> bool {
        matches!(self, WebEnvironment::DefinedPort | WebEnvironment::RandomPort)
    }
}

/// Settings bound under `server`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerProperties {
    pub port: u16,
    pub address: Option<String>,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            port: 8080,
            address: None,
        }
    }
}

impl ServerProperties {
    /// Address the server binds to, `0.0.0.0` when none is configured
    pub fn bind_address(&self) -> String {
        format!(
            "{}:{}",
            self.address.as_deref().unwrap_or("0.0.0.0"),
            self.port
        )
    }
}

impl Bindable for ServerProperties {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[
            FieldSpec::scalar("port", "u16", "Server HTTP port"),
            FieldSpec::scalar("address", "string", "Network address to bind to"),
        ];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        match field {
            "port" => {
                ctx.assign(node, &mut self.port);
            }
            "address" => {
                ctx.assign(node, &mut self.address);
            }
            _ => {}
        }
    }
}

impl ConfigurationProperties for ServerProperties {
    const PREFIX: &'static str = "server";
}

/// A started web server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebServerHandle {
    pub context: String,
    pub address: String,
}

/// Starts the server of a web context
pub trait WebServerFactory {
    fn start(&self, context: &str, properties: &ServerProperties) -> Result<WebServerHandle, String>;
}

/// One level of an assembled hierarchy
pub struct AppContext {
    name: String,
    parent: Option<Arc<AppContext>>,
    properties: PropertySet,
    registry: ComponentRegistry,
    web: bool,
    web_server: Option<WebServerHandle>,
    report: ConditionReport,
}

impl AppContext {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<AppContext>> {
        self.parent.as_ref()
    }

    pub fn is_web(&self) -> bool {
        self.web
    }

    pub fn web_server(&self) -> Option<&WebServerHandle> {
        self.web_server.as_ref()
    }

    pub fn condition_report(&self) -> &ConditionReport {
        &self.report
    }

    /// Components registered in this level only
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Latest entry for `key`; a level's properties already include everything inherited
    pub fn property(&self, key: &str) -> Option<&ConfigEntry> {
        self.properties.get(key)
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// First component of type `T` in this level or the closest parent holding one
    pub fn component<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.registry
            .get::<T>()
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.component::<T>()))
    }

    pub fn has_component<T: 'static>(&self) -> bool {
        self.ancestors().any(|ctx| ctx.registry.contains::<T>())
    }

    /// This context followed by every parent up to the root
    pub fn ancestors(&self) -> impl Iterator<Item = &AppContext> {
        std::iter::successors(Some(self), |ctx| ctx.parent.as_deref())
    }

    /// Number of servers started in this context and its parents
    pub fn started_servers(&self) -> usize {
        self.ancestors().filter(|ctx| ctx.web_server.is_some()).count()
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("name", &self.name)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("web", &self.web)
            .field("web_server", &self.web_server)
            .finish()
    }
}

struct Level {
    name: String,
    properties: PropertySet,
    assembly: Assembly,
}

/// Builder for a root-to-leaf chain of contexts
#[derive(Default)]
pub struct ContextHierarchy {
    levels: Vec<Level>,
    properties: PropertySet,
    web_environment: WebEnvironment,
}

impl ContextHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a level below the previous one
    pub fn level(self, name: impl Into<String>, assembly: Assembly) -> Self {
        self.level_with_properties(name, PropertySet::new(), assembly)
    }

    /// Append a level with properties of its own
    pub fn level_with_properties(
        mut self,
        name: impl Into<String>,
        properties: PropertySet,
        assembly: Assembly,
    ) -> Self {
        self.levels.push(Level {
            name: name.into(),
            properties,
            assembly,
        });
        self
    }

    /// Inline `key=value` properties applied to every level, overriding level properties
    pub fn properties<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.properties.merge(PropertySet::from_inline(lines));
        self
    }

    pub fn web_environment(mut self, environment: WebEnvironment) -> Self {
        self.web_environment = environment;
        self
    }

    /// Assemble every level from the root down and return the leaf
    pub fn refresh(self, factory: &dyn WebServerFactory) -> Result<Arc<AppContext>, ContextError> {
        if self.levels.is_empty() {
            return Err(ContextError::EmptyHierarchy);
        }

        let leaf_index = self.levels.len() - 1;
        let mut parent: Option<Arc<AppContext>> = None;

        for (index, level) in self.levels.into_iter().enumerate() {
            let mut properties = parent
                .as_ref()
                .map(|parent| parent.properties.clone())
                .unwrap_or_default();
            properties.merge(level.properties);
            properties.merge(self.properties.clone());

            let mut assembly_ctx = AssemblyContext::new(properties);
            if let Some(parent) = &parent {
                assembly_ctx = assembly_ctx.with_parent(parent.clone());
            }
            let report = level
                .assembly
                .run(&mut assembly_ctx)
                .map_err(|source| ContextError::Assembly {
                    context: level.name.clone(),
                    source,
                })?;
            let (properties, registry) = assembly_ctx.into_parts();

            let web = index == leaf_index && self.web_environment.is_web();
            let web_server = if web && self.web_environment.starts_server() {
                Some(start_server(&level.name, &properties, self.web_environment, factory)?)
            } else {
                None
            };

            tracing::info!(
                "Refreshed context '{}' (web: {}, parent: {})",
                level.name,
                web,
                parent.as_ref().map_or("none", |p| p.name.as_str())
            );

            parent = Some(Arc::new(AppContext {
                name: level.name,
                parent,
                properties,
                registry,
                web,
                web_server,
                report,
            }));
        }

        parent.ok_or(ContextError::EmptyHierarchy)
    }
}

fn start_server(
    context: &str,
    properties: &PropertySet,
    environment: WebEnvironment,
    factory: &dyn WebServerFactory,
) -> Result<WebServerHandle, ContextError> {
    let (mut server, result) = bind_properties::<ServerProperties>(properties, true);
    result
        .into_result()
        .and_then(|_| PortValidator::default().validate("server.port", &server.port))
        .map_err(|source| ContextError::Properties {
            context: context.to_string(),
            source,
        })?;

    if environment == WebEnvironment::RandomPort {
        server.port = 0;
    }

    let handle = factory
        .start(context, &server)
        .map_err(|message| ContextError::ServerStart {
            context: context.to_string(),
            message,
        })?;
    tracing::info!("Web server for '{}' listening on {}", context, handle.address);
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::AutoConfiguration;
    use crate::condition::{ActivationCondition, OnComponent};
    use crate::error::AssemblyError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFactory {
        started: Mutex<Vec<(String, u16)>>,
    }

    impl WebServerFactory for RecordingFactory {
        fn start(&self, context: &str, properties: &ServerProperties) -> Result<WebServerHandle, String> {
            if let Ok(mut started) = self.started.lock() {
                started.push((context.to_string(), properties.port));
            }
            Ok(WebServerHandle {
                context: context.to_string(),
                address: properties.bind_address(),
            })
        }
    }

    fn two_levels() -> ContextHierarchy {
        ContextHierarchy::new()
            .level("parent", Assembly::new())
            .level("child", Assembly::new())
    }

    #[test]
    fn test_defined_port_starts_single_server_in_leaf() {
        let factory = RecordingFactory::default();
        let leaf = two_levels()
            .web_environment(WebEnvironment::DefinedPort)
            .properties(["server.port=0", "value=123"])
            .refresh(&factory)
            .unwrap();

        let parent = leaf.parent().unwrap();
        assert!(leaf.is_web());
        assert!(!parent.is_web());
        assert_eq!(leaf.started_servers(), 1);
        assert_eq!(
            *factory.started.lock().unwrap(),
            vec![("child".to_string(), 0)]
        );
        assert_eq!(leaf.property("value").unwrap().value.as_text(), "123");
        assert_eq!(parent.property("value").unwrap().value.as_text(), "123");
    }

    #[test]
    fn test_random_port_ignores_configured_port() {
        let factory = RecordingFactory::default();
        let leaf = two_levels()
            .web_environment(WebEnvironment::RandomPort)
            .properties(["server.port=9000"])
            .refresh(&factory)
            .unwrap();

        assert_eq!(leaf.web_server().unwrap().address, "0.0.0.0:0");
    }

    #[test]
    fn test_mock_and_none_start_nothing() {
        let factory = RecordingFactory::default();

        let mock = two_levels()
            .web_environment(WebEnvironment::Mock)
            .refresh(&factory)
            .unwrap();
        assert!(mock.is_web());
        assert!(mock.web_server().is_none());

        let plain = two_levels().refresh(&factory).unwrap();
        assert!(!plain.is_web());
        assert!(factory.started.lock().unwrap().is_empty());
    }

    #[test]
    fn test_lookup_falls_back_to_parent() {
        let factory = RecordingFactory::default();
        let leaf = ContextHierarchy::new()
            .level_with_properties(
                "parent",
                PropertySet::new().with("shared.name", "root").with("only.parent", "p"),
                Assembly::new(),
            )
            .level_with_properties(
                "child",
                PropertySet::new().with("shared.name", "leaf"),
                Assembly::new(),
            )
            .refresh(&factory)
            .unwrap();

        assert_eq!(leaf.property("shared.name").unwrap().value.as_text(), "leaf");
        assert_eq!(leaf.property("only.parent").unwrap().value.as_text(), "p");
        assert!(leaf.parent().unwrap().property("missing").is_none());
        let names: Vec<_> = leaf.ancestors().map(AppContext::name).collect();
        assert_eq!(names, vec!["child", "parent"]);
    }

    #[test]
    fn test_parent_server_port_reaches_leaf_server() {
        let factory = RecordingFactory::default();
        let leaf = ContextHierarchy::new()
            .level_with_properties(
                "parent",
                PropertySet::new().with("server.port", "9123"),
                Assembly::new(),
            )
            .level("child", Assembly::new())
            .web_environment(WebEnvironment::DefinedPort)
            .refresh(&factory)
            .unwrap();

        assert_eq!(leaf.web_server().unwrap().address, "0.0.0.0:9123");
        assert_eq!(
            *factory.started.lock().unwrap(),
            vec![("child".to_string(), 9123)]
        );
    }

    #[test]
    fn test_child_sees_parent_components() {
        struct Client;

        struct NeedsClient;

        impl AutoConfiguration for NeedsClient {
            fn name(&self) -> &'static str {
                "NeedsClient"
            }

            fn conditions(&self) -> Vec<Box<dyn ActivationCondition + '_>> {
                vec![Box::new(OnComponent::<Client>::new())]
            }

            fn configure(&self, ctx: &mut AssemblyContext) -> Result<(), AssemblyError> {
                ctx.require_component::<Client>()?;
                ctx.registry_mut().register("configured");
                Ok(())
            }
        }

        struct ProvidesClient;

        impl AutoConfiguration for ProvidesClient {
            fn name(&self) -> &'static str {
                "ProvidesClient"
            }

            fn configure(&self, ctx: &mut AssemblyContext) -> Result<(), AssemblyError> {
                ctx.registry_mut().register(Client);
                Ok(())
            }
        }

        let factory = RecordingFactory::default();
        let leaf = ContextHierarchy::new()
            .level("parent", Assembly::new().with(ProvidesClient))
            .level("child", Assembly::new().with(NeedsClient))
            .refresh(&factory)
            .unwrap();

        assert!(leaf.condition_report().is_matched("NeedsClient"));
        assert!(leaf.registry().contains::<&'static str>());
        assert!(!leaf.registry().contains::<Client>());
        assert!(leaf.has_component::<Client>());
    }

    #[test]
    fn test_invalid_port_fails_refresh() {
        let factory = RecordingFactory::default();
        let result = two_levels()
            .web_environment(WebEnvironment::DefinedPort)
            .properties(["server.port=http"])
            .refresh(&factory);

        assert!(matches!(result, Err(ContextError::Properties { ref context, .. }) if context == "child"));
    }

    #[test]
    fn test_empty_hierarchy() {
        let factory = RecordingFactory::default();
        assert!(matches!(
            ContextHierarchy::new().refresh(&factory),
            Err(ContextError::EmptyHierarchy)
        ));
    }
}
