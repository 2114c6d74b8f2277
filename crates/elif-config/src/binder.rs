//! Relaxed property binding
//!
//! A [`PropertyBinder`] walks the entries below its prefix, matches every
//! name against the target's declared fields with [`naming::matches`], and
//! converts values through a pluggable [`ConversionService`]. Problems are
//! collected per key in the returned [`BindingResult`]; one bad field never
//! stops the others from binding.

use crate::conversion::{ConversionService, DefaultConversionService};
use crate::error::{ConfigError, ConversionError, FieldError};
use crate::naming::{self, PropertyPath};
use crate::placeholder::PlaceholderResolver;
use crate::sources::{ConfigEntry, ConfigSource, PropertySet};
use crate::tree::{build_tree, NodeKind, PropertyNode};
use crate::value::{ConfigValue, OrderedSet};
use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

/// Shape of a declared field, used by the binder and by schema tooling
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Scalar(&'static str),
    Sequence(&'static str),
    Nested(fn() -> &'static [FieldSpec]),
}

/// A field a [`Bindable`] target accepts, under its canonical name
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn scalar(name: &'static str, type_name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Scalar(type_name),
            description,
        }
    }

    pub const fn sequence(name: &'static str, element: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Sequence(element),
            description,
        }
    }

    pub const fn nested(
        name: &'static str,
        fields: fn() -> &'static [FieldSpec],
        description: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Nested(fields),
            description,
        }
    }
}

/// A typed configuration target
pub trait Bindable {
    /// Declared fields under their canonical (dashed) names
    fn fields() -> &'static [FieldSpec];

    /// Bind one recognized field; `field` is the canonical name from [`Bindable::fields`]
    fn bind_field(&mut self, field: &'static str, node: &PropertyNode, ctx: &mut BindContext<'_>);
}

/// A bindable target with a default state and a fixed prefix
pub trait ConfigurationProperties: Bindable + Default {
    const PREFIX: &'static str;
}

/// Conversion from a property node into a field type
pub trait FromConfig: Sized {
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError>;

    /// Values for which the field keeps its own default instead of converting
    fn falls_back(_value: &ConfigValue) -> bool {
        false
    }
}

/// Outcome of assigning one field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Assigned,
    /// The value asked for the field's own default
    FellBack,
    /// Conversion failed; the error is recorded and the field untouched
    Failed,
}

/// Per-call binding state handed to [`Bindable::bind_field`]
pub struct BindContext<'a> {
    conversion: &'a dyn ConversionService,
    ignore_unknown_fields: bool,
    errors: Vec<FieldError>,
}

impl<'a> BindContext<'a> {
    fn new(conversion: &'a dyn ConversionService, ignore_unknown_fields: bool) -> Self {
        Self {
            conversion,
            ignore_unknown_fields,
            errors: Vec::new(),
        }
    }

    pub fn conversion(&self) -> &dyn ConversionService {
        self.conversion
    }

    /// Convert `node` into `slot`, leaving the slot untouched on failure or fallback
    pub fn assign<T: FromConfig>(&mut self, node: &PropertyNode, slot: &mut T) -> Assignment {
        if let NodeKind::Value(value) = node.kind() {
            if T::falls_back(value) {
                tracing::debug!("'{}' keeps its default value", node.key());
                return Assignment::FellBack;
            }
        }
        match T::from_config(node, self.conversion) {
            Ok(value) => {
                *slot = value;
                Assignment::Assigned
            }
            Err(error) => {
                self.errors.push(FieldError::conversion(node.key(), error));
                Assignment::Failed
            }
        }
    }

    /// Bind a nested object from a group node
    pub fn nested<T: Bindable>(&mut self, node: &PropertyNode, target: &mut T) {
        self.bind_group(node, target);
    }

    /// Record an error for a recognized field rejected by the target itself
    pub fn reject(&mut self, node: &PropertyNode, error: ConversionError) {
        self.errors.push(FieldError::conversion(node.key(), error));
    }

    fn bind_group<T: Bindable>(&mut self, node: &PropertyNode, target: &mut T) {
        let children = match node.kind() {
            NodeKind::Group(children) => children,
            _ => {
                self.reject(node, ConversionError::ExpectedNested);
                return;
            }
        };

        for (name, child) in children {
            match T::fields().iter().find(|spec| naming::matches(spec.name, name)) {
                Some(spec) => target.bind_field(spec.name, child, self),
                None if self.ignore_unknown_fields => {
                    tracing::debug!("Ignoring unknown property '{}'", child.key());
                }
                None => {
                    for key in child.leaf_keys() {
                        self.errors.push(FieldError::unknown_field(key));
                    }
                }
            }
        }
    }
}

/// Field errors collected by one bind call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingResult {
    errors: Vec<FieldError>,
}

impl BindingResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// First error recorded for `key`, compared under relaxed rules
    pub fn field_error(&self, key: &str) -> Option<&FieldError> {
        let wanted = naming::normalize_key(key);
        self.errors
            .iter()
            .find(|error| naming::normalize_key(&error.key) == wanted)
    }

    pub fn into_result(self) -> Result<(), ConfigError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Binding {
                errors: self.errors,
            })
        }
    }
}

/// Binds entries below a prefix onto a [`Bindable`] target
#[derive(Clone)]
pub struct PropertyBinder {
    prefix: String,
    ignore_unknown_fields: bool,
    conversion: Arc<dyn ConversionService>,
    placeholders: PlaceholderResolver,
}

impl PropertyBinder {
    /// Lenient binder for `prefix` using the default conversion service
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ignore_unknown_fields: true,
            conversion: Arc::new(DefaultConversionService::new()),
            placeholders: PlaceholderResolver::new(),
        }
    }

    pub fn ignore_unknown_fields(mut self, ignore: bool) -> Self {
        self.ignore_unknown_fields = ignore;
        self
    }

    pub fn with_conversion_service(mut self, conversion: Arc<dyn ConversionService>) -> Self {
        self.conversion = conversion;
        self
    }

    pub fn with_placeholder_resolver(mut self, placeholders: PlaceholderResolver) -> Self {
        self.placeholders = placeholders;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Bind every entry below the prefix onto `target`
    pub fn bind<T: Bindable>(&self, target: &mut T, properties: &PropertySet) -> BindingResult {
        let prefix = match PropertyPath::parse(&self.prefix) {
            Ok(prefix) => prefix,
            Err(reason) => {
                return BindingResult {
                    errors: vec![FieldError::invalid_key(&self.prefix, reason)],
                };
            }
        };

        let properties = align_env_keys(properties, &prefix, T::fields());
        let (root, mut errors) = build_tree(&properties, &prefix, &self.placeholders);
        if let Some(root) = root {
            let mut ctx = BindContext::new(self.conversion.as_ref(), self.ignore_unknown_fields);
            ctx.bind_group(&root, target);
            errors.append(&mut ctx.errors);
        }

        if errors.is_empty() {
            tracing::debug!("Bound properties under '{}'", self.prefix);
        } else {
            tracing::warn!(
                "Binding properties under '{}' reported {} error(s)",
                self.prefix,
                errors.len()
            );
        }
        BindingResult { errors }
    }
}

impl std::fmt::Debug for PropertyBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyBinder")
            .field("prefix", &self.prefix)
            .field("ignore_unknown_fields", &self.ignore_unknown_fields)
            .finish()
    }
}

/// Re-key environment entries by joining their `_` words into the declared field names.
///
/// Entries whose words spell no field path keep their dotted key, so strict
/// binding still reports them as unknown.
fn align_env_keys<'p>(
    properties: &'p PropertySet,
    prefix: &PropertyPath,
    fields: &'static [FieldSpec],
) -> Cow<'p, PropertySet> {
    if !properties.iter().any(|entry| entry.source.is_env_var()) {
        return Cow::Borrowed(properties);
    }

    let aligned = properties
        .iter()
        .map(|entry| {
            let key = match &entry.source {
                ConfigSource::EnvVar(name) => env_key(name, prefix, fields),
                _ => None,
            };
            match key {
                Some(key) => ConfigEntry {
                    key,
                    ..entry.clone()
                },
                None => entry.clone(),
            }
        })
        .collect();
    Cow::Owned(aligned)
}

fn env_key(name: &str, prefix: &PropertyPath, fields: &'static [FieldSpec]) -> Option<String> {
    let words = naming::env_words(name);
    let start = prefix.consume_words(&words)?;
    let tail = field_path(&words[start..], fields)?;
    Some(if prefix.is_empty() {
        tail
    } else {
        format!("{}.{}", prefix, tail)
    })
}

/// First declared field path spelled by all of `words`
fn field_path(words: &[String], fields: &'static [FieldSpec]) -> Option<String> {
    fields.iter().find_map(|spec| {
        let end = naming::join_words(words, 0, spec.name)?;
        let rest = &words[end..];
        let tail = match (spec.kind, rest) {
            (FieldKind::Scalar(_), []) | (FieldKind::Sequence(_), []) => String::new(),
            (FieldKind::Sequence(_), [index]) => format!("[{}]", index.parse::<usize>().ok()?),
            (FieldKind::Nested(nested), _) => format!(".{}", field_path(rest, nested())?),
            _ => return None,
        };
        Some(format!("{}{}", spec.name, tail))
    })
}

/// Bind all entries onto `target` without a prefix
pub fn bind<T: Bindable>(target: &mut T, properties: &PropertySet, ignore_unknown_fields: bool) -> BindingResult {
    PropertyBinder::new("")
        .ignore_unknown_fields(ignore_unknown_fields)
        .bind(target, properties)
}

/// Create `T` from its defaults and bind the entries under `T::PREFIX`
pub fn bind_properties<T: ConfigurationProperties>(
    properties: &PropertySet,
    ignore_unknown_fields: bool,
) -> (T, BindingResult) {
    let mut target = T::default();
    let result = PropertyBinder::new(T::PREFIX)
        .ignore_unknown_fields(ignore_unknown_fields)
        .bind(&mut target, properties);
    (target, result)
}

impl FromConfig for bool {
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
        conversion.to_bool(node.scalar("bool")?)
    }
}

impl FromConfig for String {
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
        conversion.to_text(node.scalar("string")?)
    }
}

macro_rules! impl_from_config_for_integer {
    ($($ty:ty),+) => {$(
        impl FromConfig for $ty {
            fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
                let value = node.scalar(stringify!($ty))?;
                let wide = conversion.to_integer(value).map_err(|_| ConversionError::InvalidNumber {
                    value: value.as_text(),
                    target: stringify!($ty),
                })?;
                <$ty>::try_from(wide).map_err(|_| ConversionError::InvalidNumber {
                    value: value.as_text(),
                    target: stringify!($ty),
                })
            }
        }
    )+};
}

impl_from_config_for_integer!(i32, i64, u16, u32, u64, usize);

impl FromConfig for Vec<String> {
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
        match node.kind() {
            NodeKind::Value(value) => conversion.to_list(value),
            NodeKind::Indexed(items) => items
                .values()
                .map(|item| conversion.to_text(item.scalar("list element")?))
                .collect(),
            NodeKind::Group(_) => Err(ConversionError::ExpectedScalar { target: "list" }),
        }
    }
}

impl<T: FromConfig> FromConfig for Option<T> {
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
        match node.kind() {
            NodeKind::Value(value) if value.is_empty_text() => Ok(None),
            _ => T::from_config(node, conversion).map(Some),
        }
    }
}

impl<T> FromConfig for OrderedSet<T>
where
    T: FromStr + PartialEq,
{
    fn from_config(node: &PropertyNode, conversion: &dyn ConversionService) -> Result<Self, ConversionError> {
        let tokens = Vec::<String>::from_config(node, conversion)?;
        let mut set = OrderedSet::new();
        for token in tokens {
            let item = token.parse::<T>().map_err(|_| ConversionError::InvalidToken {
                value: token.clone(),
                target: std::any::type_name::<T>(),
            })?;
            set.insert(item);
        }
        Ok(set)
    }
}

/// Implement [`FromConfig`] for types parsed with [`std::str::FromStr`], typically enums.
#[macro_export]
macro_rules! impl_from_config_via_str {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::FromConfig for $ty {
            fn from_config(
                node: &$crate::PropertyNode,
                conversion: &dyn $crate::ConversionService,
            ) -> ::std::result::Result<Self, $crate::ConversionError> {
                let text = conversion.to_text(node.scalar(stringify!($ty))?)?;
                text.trim()
                    .parse::<$ty>()
                    .map_err(|_| $crate::ConversionError::InvalidToken {
                        value: text.clone(),
                        target: stringify!($ty),
                    })
            }
        }
    )+};
}
