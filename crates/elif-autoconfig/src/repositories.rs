//! Repository auto-configuration for document-store clients
//!
//! Repositories for a store are created only when
//! `elif.data.<store>.repositories.enabled` is on (the default), a client of
//! type `C` is registered, and at least one [`RepositoryDefinition`] exists.

use crate::assembly::{AssemblyContext, AutoConfiguration};
use crate::condition::{
    ActivationCondition, ActivationDecision, ConditionOutcome, OnCandidates, OnComponent,
};
use crate::error::AssemblyError;
use crate::registry::ComponentRegistry;
use elif_config::{BindContext, Bindable, FieldSpec, PropertyBinder, PropertyNode};
use std::sync::Arc;

/// Flags bound under `elif.data.<store>.repositories`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoriesProperties {
    pub enabled: bool,
}

impl Default for RepositoriesProperties {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Bindable for RepositoriesProperties {
    fn fields() -> &'static [FieldSpec] {
        const FIELDS: &[FieldSpec] = &[FieldSpec::scalar(
            "enabled",
            "bool",
            "Create repositories for this store",
        )];
        FIELDS
    }

    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>) {
        if field == "enabled" {
            ctx.assign(node, &mut self.enabled);
        }
    }
}

type RepositoryFactory<C> = Box<dyn Fn(Arc<C>, &mut ComponentRegistry) + Send + Sync>;

/// A repository to build from the shared client
pub struct RepositoryDefinition<C> {
    name: &'static str,
    factory: RepositoryFactory<C>,
}

impl<C: Send + Sync + 'static> RepositoryDefinition<C> {
    pub fn new<R, F>(name: &'static str, factory: F) -> Self
    where
        R: Send + Sync + 'static,
        F: Fn(Arc<C>) -> R + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(move |client: Arc<C>, registry: &mut ComponentRegistry| {
                registry.register(factory(client));
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<C> std::fmt::Debug for RepositoryDefinition<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryDefinition")
            .field("name", &self.name)
            .finish()
    }
}

/// Auto-configuration creating repositories over a registered client `C`
pub struct RepositoriesAutoConfiguration<C> {
    store: String,
    repositories: Vec<RepositoryDefinition<C>>,
}

impl<C: Send + Sync + 'static> RepositoriesAutoConfiguration<C> {
    pub fn new(store: impl Into<String>) -> Self {
        Self {
            store: store.into(),
            repositories: Vec::new(),
        }
    }

    pub fn with_repository(mut self, definition: RepositoryDefinition<C>) -> Self {
        self.repositories.push(definition);
        self
    }

    pub fn prefix(&self) -> String {
        format!("elif.data.{}.repositories", self.store)
    }

    /// Full key of the enable flag
    pub fn property_key(&self) -> String {
        format!("{}.enabled", self.prefix())
    }

    /// Bind the store's repository flags; unreadable values keep the defaults
    pub fn properties(&self, ctx: &AssemblyContext) -> RepositoriesProperties {
        let mut properties = RepositoriesProperties::default();
        let result = PropertyBinder::new(self.prefix()).bind(&mut properties, ctx.properties());
        for error in result.errors() {
            tracing::warn!("Repository flags for '{}': {}", self.store, error);
        }
        properties
    }

    /// The gate over flag, client and candidates, checking lazily
    pub fn decision(&self, ctx: &AssemblyContext) -> ActivationDecision {
        ActivationDecision::evaluate(
            self.properties(ctx).enabled,
            || ctx.has_component::<C>(),
            || self.repositories.len(),
        )
    }
}

struct RepositoriesEnabled<'a, C: Send + Sync + 'static> {
    configuration: &'a RepositoriesAutoConfiguration<C>,
}

impl<C: Send + Sync + 'static> ActivationCondition for RepositoriesEnabled<'_, C> {
    fn describe(&self) -> String {
        format!("requires property '{}' to be true", self.configuration.property_key())
    }

    fn evaluate(&self, ctx: &AssemblyContext) -> ConditionOutcome {
        if self.configuration.properties(ctx).enabled {
            ConditionOutcome::Match
        } else {
            ConditionOutcome::NoMatch(format!(
                "property '{}' is false",
                self.configuration.property_key()
            ))
        }
    }
}

impl<C: Send + Sync + 'static> AutoConfiguration for RepositoriesAutoConfiguration<C> {
    fn name(&self) -> &'static str {
        "RepositoriesAutoConfiguration"
    }

    fn conditions(&self) -> Vec<Box<dyn ActivationCondition + '_>> {
        vec![
            Box::new(RepositoriesEnabled {
                configuration: self,
            }),
            Box::new(OnComponent::<C>::new()),
            Box::new(OnCandidates::new("repository", self.repositories.len())),
        ]
    }

    fn configure(&self, ctx: &mut AssemblyContext) -> Result<(), AssemblyError> {
        let client = ctx.require_component::<C>()?;
        for definition in &self.repositories {
            tracing::debug!("Creating {} repository '{}'", self.store, definition.name);
            (definition.factory)(client.clone(), ctx.registry_mut());
        }
        tracing::info!(
            "Created {} {} repositor{}",
            self.repositories.len(),
            self.store,
            if self.repositories.len() == 1 { "y" } else { "ies" }
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::Assembly;
    use elif_config::PropertySet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct DocumentClient {
        bucket: &'static str,
    }

    struct CityRepository {
        client: Arc<DocumentClient>,
    }

    fn city_repositories(created: Arc<AtomicUsize>) -> RepositoriesAutoConfiguration<DocumentClient> {
        RepositoriesAutoConfiguration::new("documents").with_repository(RepositoryDefinition::new(
            "cities",
            move |client| {
                created.fetch_add(1, Ordering::SeqCst);
                CityRepository { client }
            },
        ))
    }

    fn context_with_client(properties: PropertySet) -> AssemblyContext {
        let mut ctx = AssemblyContext::new(properties);
        ctx.registry_mut().register(DocumentClient { bucket: "default" });
        ctx
    }

    #[test]
    fn test_property_key() {
        let config = RepositoriesAutoConfiguration::<DocumentClient>::new("documents");
        assert_eq!(config.property_key(), "elif.data.documents.repositories.enabled");
    }

    #[test]
    fn test_default_creates_repository_from_shared_client() {
        let created = Arc::new(AtomicUsize::new(0));
        let mut ctx = context_with_client(PropertySet::new());

        let report = Assembly::new()
            .with(city_repositories(created.clone()))
            .run(&mut ctx)
            .unwrap();

        assert!(report.is_matched("RepositoriesAutoConfiguration"));
        assert_eq!(created.load(Ordering::SeqCst), 1);
        let repository = ctx.registry().require::<CityRepository>().unwrap();
        let client = ctx.registry().require::<DocumentClient>().unwrap();
        assert!(Arc::ptr_eq(&repository.client, &client));
        assert_eq!(repository.client.bucket, "default");
    }

    #[test]
    fn test_no_client_no_repositories() {
        let created = Arc::new(AtomicUsize::new(0));
        let mut ctx = AssemblyContext::new(PropertySet::new());

        Assembly::new()
            .with(city_repositories(created.clone()))
            .run(&mut ctx)
            .unwrap();

        assert_eq!(ctx.registry().count::<CityRepository>(), 0);
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_repositories() {
        let created = Arc::new(AtomicUsize::new(0));
        let mut ctx = context_with_client(
            PropertySet::new().with("elif.data.documents.repositories.enabled", "false"),
        );
        let config = city_repositories(created.clone());
        assert_eq!(config.decision(&ctx), ActivationDecision::Disabled);

        Assembly::new().with(config).run(&mut ctx).unwrap();

        assert_eq!(ctx.registry().count::<CityRepository>(), 0);
        assert_eq!(created.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_relaxed_flag_spelling() {
        let config = city_repositories(Arc::new(AtomicUsize::new(0)));
        let ctx = context_with_client(
            PropertySet::new().with("elif.data.documents.Repositories.ENABLED", "off"),
        );
        assert_eq!(config.properties(&ctx), RepositoriesProperties { enabled: false });
        assert_eq!(config.decision(&ctx), ActivationDecision::Disabled);
    }

    #[test]
    fn test_no_candidates() {
        let mut ctx = context_with_client(PropertySet::new());
        let config = RepositoriesAutoConfiguration::<DocumentClient>::new("documents");
        assert_eq!(config.decision(&ctx), ActivationDecision::NoCandidates);

        let report = Assembly::new().with(config).run(&mut ctx).unwrap();
        assert!(!report.is_matched("RepositoriesAutoConfiguration"));
        assert_eq!(ctx.registry().count::<CityRepository>(), 0);
    }
}
