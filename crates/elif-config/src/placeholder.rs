//! `${NAME}` and `${NAME:default}` substitution

use crate::sources::PropertySet;
use crate::value::ConfigValue;
use regex::Regex;
use std::sync::OnceLock;

const MAX_DEPTH: usize = 32;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // Innermost placeholder first: no braces inside the name/default part.
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^{}]*)\}").expect("static placeholder pattern"))
}

/// Result of resolving one raw string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved(String),
}

/// Resolves placeholders against a property set and, optionally, the process environment
#[derive(Debug, Clone)]
pub struct PlaceholderResolver {
    use_environment: bool,
}

impl PlaceholderResolver {
    pub fn new() -> Self {
        Self {
            use_environment: true,
        }
    }

    /// Disable lookups in the process environment
    pub fn without_environment(mut self) -> Self {
        self.use_environment = false;
        self
    }

    /// Check if a string contains a placeholder token
    pub fn has_placeholder(raw: &str) -> bool {
        placeholder_pattern().is_match(raw)
    }

    /// Resolve every placeholder in `raw`.
    ///
    /// Any token without a value or default, or a chain deeper than the
    /// recursion limit, leaves the whole string unresolved.
    pub fn resolve(&self, raw: &str, properties: &PropertySet) -> Resolution {
        let pattern = placeholder_pattern();
        let mut current = raw.to_string();

        for _ in 0..MAX_DEPTH {
            if !pattern.is_match(&current) {
                return Resolution::Resolved(current);
            }

            let mut missing = false;
            let next = pattern
                .replace_all(&current, |caps: &regex::Captures<'_>| {
                    let body = &caps[1];
                    let (name, default) = match body.split_once(':') {
                        Some((name, default)) => (name.trim(), Some(default)),
                        None => (body.trim(), None),
                    };
                    match self.lookup(name, properties).or(default.map(str::to_string)) {
                        Some(value) => value,
                        None => {
                            missing = true;
                            caps[0].to_string()
                        }
                    }
                })
                .into_owned();

            if missing {
                tracing::debug!("Unresolved placeholder in '{}'", raw);
                return Resolution::Unresolved(raw.to_string());
            }
            current = next;
        }

        tracing::warn!("Placeholder recursion limit reached while resolving '{}'", raw);
        Resolution::Unresolved(raw.to_string())
    }

    /// Resolve a raw value; only text values carry placeholders
    pub fn resolve_value(&self, value: &ConfigValue, properties: &PropertySet) -> ConfigValue {
        match value {
            ConfigValue::Text(text) if Self::has_placeholder(text) => {
                match self.resolve(text, properties) {
                    Resolution::Resolved(resolved) => ConfigValue::Text(resolved),
                    Resolution::Unresolved(raw) => ConfigValue::Unresolved(raw),
                }
            }
            other => other.clone(),
        }
    }

    fn lookup(&self, name: &str, properties: &PropertySet) -> Option<String> {
        if name.is_empty() {
            return None;
        }
        if let Some(entry) = properties.get(name) {
            return Some(entry.value.as_text());
        }
        if self.use_environment {
            return std::env::var(name).ok();
        }
        None
    }
}

impl Default for PlaceholderResolver {
    fn default() -> Self {
        Self::new()
    }
}
