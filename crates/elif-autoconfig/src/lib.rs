//! Conditional auto-configuration for elif.rs
//!
//! Components are assembled from an explicit, ordered list of
//! [`AutoConfiguration`]s. Each one declares its activation conditions and is
//! configured only when all of them match.

pub mod assembly;
pub mod condition;
pub mod context;
pub mod error;
pub mod registry;
pub mod repositories;

pub use assembly::{Assembly, AssemblyContext, AutoConfiguration, ConditionReport, Evaluation};
pub use condition::{
    should_activate, ActivationCondition, ActivationDecision, ConditionOutcome, OnCandidates,
    OnComponent, OnProperty,
};
pub use context::{
    AppContext, ContextHierarchy, ServerProperties, WebEnvironment, WebServerFactory,
    WebServerHandle,
};
pub use error::{AssemblyError, ContextError};
pub use registry::ComponentRegistry;
pub use repositories::{RepositoriesAutoConfiguration, RepositoriesProperties, RepositoryDefinition};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
