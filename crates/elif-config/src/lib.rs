//! Relaxed configuration property binding for elif.rs
//!
//! Flat `key=value` entries from any source are bound onto typed
//! configuration structs. Keys are matched loosely (`enable-csrf`,
//! `enableCsrf` and `ENABLE_CSRF` are one property), lists may be written
//! comma-separated or indexed, and unresolved `${...}` placeholders count as
//! absent for fields that generate their own defaults.

pub mod binder;
pub mod conversion;
pub mod error;
pub mod naming;
pub mod placeholder;
pub mod schema;
pub mod sources;
pub mod tree;
pub mod validation;
pub mod value;

pub use binder::{
    bind, bind_properties, Assignment, BindContext, Bindable, BindingResult,
    ConfigurationProperties, FieldKind, FieldSpec, FromConfig, PropertyBinder,
};
pub use conversion::{ConversionService, DefaultConversionService};
pub use error::{ConfigError, ConversionError, FieldError, FieldErrorKind};
pub use placeholder::{PlaceholderResolver, Resolution};
pub use schema::{ConfigField, ConfigSchema};
pub use sources::{ConfigEntry, ConfigSource, PropertySet};
pub use tree::{NodeKind, PropertyNode};
pub use validation::{
    CompositeValidator, ConfigValidator, LengthValidator, PortValidator, PrefixValidator,
};
pub use value::{ConfigValue, OrderedSet};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
