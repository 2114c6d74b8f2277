//! Explicit, ordered auto-configuration
//!
//! The application entry point lists its auto-configurations in order and
//! runs them through an [`Assembly`]. Each one is configured only when all of
//! its conditions match; otherwise nothing it would build is constructed.

use crate::condition::{ActivationCondition, ConditionOutcome};
use crate::context::AppContext;
use crate::error::AssemblyError;
use crate::registry::ComponentRegistry;
use elif_config::PropertySet;
use std::sync::Arc;

/// What an auto-configuration sees and mutates while the application is assembled
#[derive(Debug, Default)]
pub struct AssemblyContext {
    properties: PropertySet,
    registry: ComponentRegistry,
    parent: Option<Arc<AppContext>>,
}

impl AssemblyContext {
    pub fn new(properties: PropertySet) -> Self {
        Self {
            properties,
            registry: ComponentRegistry::new(),
            parent: None,
        }
    }

    /// Start from an existing registry, e.g. one seeded with collaborators
    pub fn with_registry(properties: PropertySet, registry: ComponentRegistry) -> Self {
        Self {
            properties,
            registry,
            parent: None,
        }
    }

    /// Let component lookups continue in an already refreshed parent context
    pub fn with_parent(mut self, parent: Arc<AppContext>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn parent(&self) -> Option<&Arc<AppContext>> {
        self.parent.as_ref()
    }

    /// First component of type `T` registered here, else in the closest parent holding one
    pub fn component<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.registry
            .get::<T>()
            .or_else(|| self.parent.as_ref().and_then(|parent| parent.component::<T>()))
    }

    /// Like [`AssemblyContext::component`], failing with [`AssemblyError::MissingComponent`]
    pub fn require_component<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, AssemblyError> {
        self.component::<T>()
            .ok_or_else(AssemblyError::missing_component::<T>)
    }

    pub fn has_component<T: 'static>(&self) -> bool {
        self.registry.contains::<T>()
            || self.parent.as_ref().is_some_and(|parent| parent.has_component::<T>())
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    pub fn into_parts(self) -> (PropertySet, ComponentRegistry) {
        (self.properties, self.registry)
    }
}

/// A unit of conditional component registration
pub trait AutoConfiguration: Send + Sync {
    /// Name used in logs and condition reports
    fn name(&self) -> &'static str;

    /// Conditions in evaluation order; all must match
    fn conditions(&self) -> Vec<Box<dyn ActivationCondition + '_>> {
        Vec::new()
    }

    /// Register components; only called when every condition matched
    fn configure(&self, ctx: &mut AssemblyContext) -> Result<(), AssemblyError>;
}

/// Outcome of one auto-configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Matched,
    Skipped { condition: String, reason: String },
}

/// Matched/skipped record for every auto-configuration in an assembly run
#[derive(Debug, Clone, Default)]
pub struct ConditionReport {
    entries: Vec<(&'static str, Evaluation)>,
}

impl ConditionReport {
    pub fn entries(&self) -> &[(&'static str, Evaluation)] {
        &self.entries
    }

    pub fn evaluation(&self, configuration: &str) -> Option<&Evaluation> {
        self.entries
            .iter()
            .find(|(name, _)| *name == configuration)
            .map(|(_, evaluation)| evaluation)
    }

    pub fn is_matched(&self, configuration: &str) -> bool {
        matches!(self.evaluation(configuration), Some(Evaluation::Matched))
    }

    pub fn matched(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, Evaluation::Matched))
            .map(|(name, _)| *name)
            .collect()
    }

    pub fn skipped(&self) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e, Evaluation::Skipped { .. }))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Get summary statistics
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Condition Report:\n\
            - Matched: {}\n\
            - Skipped: {}",
            self.matched().len(),
            self.skipped().len()
        );
        for (name, evaluation) in &self.entries {
            if let Evaluation::Skipped { condition, reason } = evaluation {
                out.push_str(&format!("\n  {} skipped by {}: {}", name, condition, reason));
            }
        }
        out
    }
}

/// Ordered list of auto-configurations
#[derive(Default)]
pub struct Assembly {
    configurations: Vec<Box<dyn AutoConfiguration>>,
}

impl Assembly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an auto-configuration; it runs after everything added before it
    pub fn with<A: AutoConfiguration + 'static>(mut self, configuration: A) -> Self {
        self.configurations.push(Box::new(configuration));
        self
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    /// Evaluate and apply every auto-configuration in order
    pub fn run(&self, ctx: &mut AssemblyContext) -> Result<ConditionReport, AssemblyError> {
        let mut report = ConditionReport::default();

        for configuration in &self.configurations {
            let evaluation = evaluate(configuration.as_ref(), ctx);
            match &evaluation {
                Evaluation::Matched => {
                    tracing::info!("Applying auto-configuration: {}", configuration.name());
                    configuration.configure(ctx)?;
                }
                Evaluation::Skipped { condition, reason } => {
                    tracing::info!(
                        "Skipping auto-configuration {} ({}: {})",
                        configuration.name(),
                        condition,
                        reason
                    );
                }
            }
            report.entries.push((configuration.name(), evaluation));
        }

        Ok(report)
    }
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly")
            .field(
                "configurations",
                &self.configurations.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

fn evaluate(configuration: &dyn AutoConfiguration, ctx: &AssemblyContext) -> Evaluation {
    for condition in configuration.conditions() {
        if let ConditionOutcome::NoMatch(reason) = condition.evaluate(ctx) {
            return Evaluation::Skipped {
                condition: condition.describe(),
                reason,
            };
        }
    }
    Evaluation::Matched
}
