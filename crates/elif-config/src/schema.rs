use crate::binder::{Bindable, ConfigurationProperties, FieldKind, FieldSpec};
use crate::naming::{self, PropertyPath};
use crate::sources::{ConfigEntry, ConfigSource, PropertySet};
use crate::ConfigError;

/// Documented configuration key
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ConfigField {
    pub name: String,
    pub field_type: String,
    pub description: Option<String>,
}

impl ConfigField {
    /// Create a new configuration field
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            description: None,
        }
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Every key a configuration target understands, for docs and validation tooling
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConfigSchema {
    pub prefix: String,
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    /// Create an empty schema
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            fields: Vec::new(),
        }
    }

    /// Schema of a properties type under its own prefix
    pub fn for_properties<T: ConfigurationProperties>() -> Self {
        Self::for_bindable::<T>(T::PREFIX)
    }

    /// Schema of any bindable target under `prefix`
    pub fn for_bindable<T: Bindable>(prefix: &str) -> Self {
        let mut schema = Self::new(prefix);
        collect(prefix, T::fields(), &mut schema.fields);
        schema
    }

    /// Add a field to the schema
    pub fn add_field(mut self, field: ConfigField) -> Self {
        self.fields.push(field);
        self
    }

    /// Find the documented field for any relaxed spelling of `key`, list indices included
    pub fn find(&self, key: &str) -> Option<&ConfigField> {
        let wanted = strip_indices(&naming::normalize_key(key));
        self.fields
            .iter()
            .find(|field| naming::normalize_key(&field.name) == wanted)
    }

    /// Keys under this schema's prefix that strict binding would reject
    pub fn unknown_keys(&self, properties: &PropertySet) -> Vec<String> {
        let Ok(prefix) = PropertyPath::parse(&self.prefix) else {
            return Vec::new();
        };
        properties
            .iter()
            .filter(|entry| match &entry.source {
                ConfigSource::EnvVar(name) => prefix.consume_words(&naming::env_words(name)).is_some(),
                _ => PropertyPath::parse(&entry.key)
                    .ok()
                    .and_then(|path| path.strip_prefix(&prefix))
                    .is_some(),
            })
            .filter(|entry| !self.documents(entry))
            .map(|entry| entry.key.clone())
            .collect()
    }

    /// Environment entries match a field whenever their words spell it, dots aside
    fn documents(&self, entry: &ConfigEntry) -> bool {
        if self.find(&entry.key).is_some() {
            return true;
        }
        if !entry.source.is_env_var() {
            return false;
        }
        let wanted = strip_indices(&naming::normalize_key(&entry.key)).replace('.', "");
        self.fields
            .iter()
            .any(|field| naming::normalize_key(&field.name).replace('.', "") == wanted)
    }

    /// Pretty JSON rendering of the schema
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn collect(prefix: &str, specs: &[FieldSpec], out: &mut Vec<ConfigField>) {
    for spec in specs {
        let name = if prefix.is_empty() {
            spec.name.to_string()
        } else {
            format!("{}.{}", prefix, spec.name)
        };
        let field_type = match spec.kind {
            FieldKind::Scalar(type_name) => type_name.to_string(),
            FieldKind::Sequence(element) => format!("list<{}>", element),
            FieldKind::Nested(fields) => {
                collect(&name, fields(), out);
                continue;
            }
        };
        out.push(ConfigField::new(name, field_type).with_description(spec.description));
    }
}

fn strip_indices(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut depth = 0;
    for c in key.chars() {
        match c {
            '[' => depth += 1,
            ']' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_indices() {
        assert_eq!(strip_indices("security.ignored[0]"), "security.ignored");
        assert_eq!(strip_indices("a[1][2].b"), "a.b");
    }

    #[test]
    fn test_manual_schema_lookup() {
        let schema = ConfigSchema::new("server")
            .add_field(ConfigField::new("server.port", "u16"))
            .add_field(ConfigField::new("server.bind-address", "string"));

        assert!(schema.find("SERVER_PORT").is_none());
        assert_eq!(schema.find("server.bindAddress").unwrap().field_type, "string");

        let properties = PropertySet::new()
            .with("server.port", "8080")
            .with("server.timeout", "5")
            .with("security.enable-csrf", "true");
        assert_eq!(schema.unknown_keys(&properties), vec!["server.timeout"]);
    }

    #[test]
    fn test_unknown_keys_from_environment() {
        let schema = ConfigSchema::new("server")
            .add_field(ConfigField::new("server.bind-address", "string"))
            .add_field(ConfigField::new("server.allowed-hosts", "list<string>"));

        let vars = vec![
            ("SERVER_BIND_ADDRESS".to_string(), "0.0.0.0".to_string()),
            ("SERVER_ALLOWED_HOSTS_0".to_string(), "a.example".to_string()),
            ("SERVER_IDLE_TIMEOUT".to_string(), "5".to_string()),
        ];
        let properties = PropertySet::from_env_vars(vars, "server");
        assert_eq!(schema.unknown_keys(&properties), vec!["server.idle.timeout"]);
    }

    #[test]
    fn test_schema_json() {
        let schema = ConfigSchema::new("server")
            .add_field(ConfigField::new("server.port", "u16").with_description("Listen port"));
        let json = schema.to_json().unwrap();
        assert!(json.contains("\"server.port\""));
        assert!(json.contains("Listen port"));
    }
}
