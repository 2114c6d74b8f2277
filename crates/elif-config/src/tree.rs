//! Flat entries regrouped into a tree of named, indexed and leaf nodes

use crate::error::{ConversionError, FieldError};
use crate::naming::{self, PathSegment, PropertyPath};
use crate::placeholder::PlaceholderResolver;
use crate::sources::PropertySet;
use crate::value::ConfigValue;
use std::collections::BTreeMap;

/// One node of the property tree, remembering the key it was written under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyNode {
    key: String,
    kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Value(ConfigValue),
    Indexed(BTreeMap<usize, PropertyNode>),
    /// Children in first-seen order, keyed by their name as written
    Group(Vec<(String, PropertyNode)>),
}

impl PropertyNode {
    pub fn group(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: NodeKind::Group(Vec::new()),
        }
    }

    pub fn value(key: impl Into<String>, value: ConfigValue) -> Self {
        Self {
            key: key.into(),
            kind: NodeKind::Value(value),
        }
    }

    /// Full key of this node as written in the source
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The leaf value, or an error naming the expected target type
    pub fn scalar(&self, target: &'static str) -> Result<&ConfigValue, ConversionError> {
        match &self.kind {
            NodeKind::Value(value) => Ok(value),
            _ => Err(ConversionError::ExpectedScalar { target }),
        }
    }

    /// Relaxed lookup of a direct child
    pub fn child(&self, name: &str) -> Option<&PropertyNode> {
        match &self.kind {
            NodeKind::Group(children) => children
                .iter()
                .find(|(own, _)| naming::matches(own, name))
                .map(|(_, node)| node),
            _ => None,
        }
    }

    /// Keys of every leaf below this node
    pub fn leaf_keys(&self) -> Vec<String> {
        match &self.kind {
            NodeKind::Value(_) => vec![self.key.clone()],
            NodeKind::Indexed(items) => items.values().flat_map(|n| n.leaf_keys()).collect(),
            NodeKind::Group(children) => children.iter().flat_map(|(_, n)| n.leaf_keys()).collect(),
        }
    }

    fn insert(&mut self, segments: &[PathSegment], key: &str, value: ConfigValue) {
        let Some((first, rest)) = segments.split_first() else {
            if !matches!(self.kind, NodeKind::Value(_)) && self.has_children() {
                tracing::debug!("'{}' replaces nested properties below it", key);
            }
            self.key = key.to_string();
            self.kind = NodeKind::Value(value);
            return;
        };

        match first {
            PathSegment::Name(name) => {
                if !matches!(self.kind, NodeKind::Group(_)) {
                    self.kind = NodeKind::Group(Vec::new());
                }
                let child_key = if self.key.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", self.key, name)
                };
                if let NodeKind::Group(children) = &mut self.kind {
                    let position = children
                        .iter()
                        .position(|(own, _)| naming::matches(own, name));
                    let child = match position {
                        Some(index) => &mut children[index].1,
                        None => {
                            children.push((name.clone(), PropertyNode::group(child_key.clone())));
                            let last = children.len() - 1;
                            &mut children[last].1
                        }
                    };
                    child.key = child_key;
                    child.insert(rest, key, value);
                }
            }
            PathSegment::Index(index) => {
                if !matches!(self.kind, NodeKind::Indexed(_)) {
                    self.kind = NodeKind::Indexed(BTreeMap::new());
                }
                let child_key = format!("{}[{}]", self.key, index);
                if let NodeKind::Indexed(items) = &mut self.kind {
                    let child = items
                        .entry(*index)
                        .or_insert_with(|| PropertyNode::group(child_key.clone()));
                    child.key = child_key;
                    child.insert(rest, key, value);
                }
            }
        }
    }

    fn has_children(&self) -> bool {
        match &self.kind {
            NodeKind::Value(_) => false,
            NodeKind::Indexed(items) => !items.is_empty(),
            NodeKind::Group(children) => !children.is_empty(),
        }
    }
}

/// Build the subtree rooted at `prefix` from a property set.
///
/// Entries outside the prefix are not reported. Malformed keys that look like
/// they belong to the prefix are returned as field errors. Placeholders are
/// resolved against the full property set.
pub fn build_tree(
    properties: &PropertySet,
    prefix: &PropertyPath,
    resolver: &PlaceholderResolver,
) -> (Option<PropertyNode>, Vec<FieldError>) {
    let mut root: Option<PropertyNode> = None;
    let mut errors = Vec::new();
    let normalized_prefix = prefix.normalized();

    for entry in properties {
        let path = match PropertyPath::parse(&entry.key) {
            Ok(path) => path,
            Err(reason) => {
                if belongs_to_prefix(&entry.key, &normalized_prefix) {
                    errors.push(FieldError::invalid_key(&entry.key, reason));
                }
                continue;
            }
        };
        if path.is_empty() {
            continue;
        }
        let Some(relative) = path.strip_prefix(prefix) else {
            continue;
        };

        let value = resolver.resolve_value(&entry.value, properties);
        root.get_or_insert_with(|| PropertyNode::group(prefix.to_string()))
            .insert(relative.segments(), &entry.key, value);
    }

    (root, errors)
}

fn belongs_to_prefix(raw_key: &str, normalized_prefix: &str) -> bool {
    if normalized_prefix.is_empty() {
        return true;
    }
    let raw = naming::normalize(raw_key.split(['.', '[']).next().unwrap_or_default());
    let first_prefix = normalized_prefix.split(['.', '[']).next().unwrap_or_default();
    raw == first_prefix
}
