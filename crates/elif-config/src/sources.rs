use crate::naming;
use crate::value::ConfigValue;
use crate::ConfigError;
use std::path::Path;

/// Where a configuration entry came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value loaded from environment variable
    EnvVar(String),
    /// Value loaded from file
    File(String),
    /// Value provided programmatically
    Programmatic,
}

impl ConfigSource {
    /// Check if source is environment variable
    pub fn is_env_var(&self) -> bool {
        matches!(self, ConfigSource::EnvVar(_))
    }

    /// Check if source is from file
    pub fn is_file(&self) -> bool {
        matches!(self, ConfigSource::File(_))
    }

    /// Get source description
    pub fn description(&self) -> String {
        match self {
            ConfigSource::EnvVar(var) => format!("Environment variable: {}", var),
            ConfigSource::File(path) => format!("Configuration file: {}", path),
            ConfigSource::Programmatic => "Programmatically set".to_string(),
        }
    }
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A single key/value configuration entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    pub value: ConfigValue,
    pub source: ConfigSource,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            source: ConfigSource::Programmatic,
        }
    }

    pub fn with_source(mut self, source: ConfigSource) -> Self {
        self.source = source;
        self
    }
}

/// Ordered set of configuration entries; later entries win for the same key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: Vec<ConfigEntry>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from programmatic key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.push(ConfigEntry::new(key, value));
        }
        set
    }

    /// Build from `key=value` strings, as used for inline test properties.
    ///
    /// A colon also separates key and value; a line without either binds an empty value.
    pub fn from_inline<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for line in lines {
            if let Some((key, value)) = split_inline(line.as_ref()) {
                set.push(ConfigEntry::new(key, value));
            }
        }
        set
    }

    /// Collect environment variables whose name spells out `prefix`
    ///
    /// Keys are stored with every `_` read as a dot; the binder re-joins the
    /// words against the target's field names, so `SECURITY_ENABLE_CSRF`
    /// still binds `security.enable-csrf`.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_env_vars(std::env::vars(), prefix)
    }

    /// Same as [`PropertySet::from_env`] over an explicit variable list
    pub fn from_env_vars<I>(vars: I, prefix: &str) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let prefix_path = match naming::PropertyPath::parse(prefix) {
            Ok(path) => path,
            Err(_) => return Self::new(),
        };

        let mut vars: Vec<(String, String)> = vars.into_iter().collect();
        vars.sort();

        let mut set = Self::new();
        for (name, value) in vars {
            let Some(key) = env_var_to_key(&name) else {
                continue;
            };
            if prefix_path.consume_words(&naming::env_words(&name)).is_some() {
                set.push(ConfigEntry::new(key, value).with_source(ConfigSource::EnvVar(name)));
            }
        }
        set
    }

    /// Parse and flatten a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        let mut set = Self::new();
        flatten_yaml("", &document, &ConfigSource::Programmatic, &mut set);
        Ok(set)
    }

    /// Parse and flatten a JSON document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let document: serde_json::Value = serde_json::from_str(content)?;
        let mut set = Self::new();
        flatten_json("", &document, &ConfigSource::Programmatic, &mut set);
        Ok(set)
    }

    /// Load a `.yaml`/`.yml`, `.json` or `.properties` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let source = ConfigSource::File(display.clone());
        let content = std::fs::read_to_string(path)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let mut set = Self::new();
        match extension.as_deref() {
            Some("yaml") | Some("yml") => {
                let document: serde_yaml::Value = serde_yaml::from_str(&content)?;
                flatten_yaml("", &document, &source, &mut set);
            }
            Some("json") => {
                let document: serde_json::Value = serde_json::from_str(&content)?;
                flatten_json("", &document, &source, &mut set);
            }
            Some("properties") => {
                let lines = content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty() && !l.starts_with('#') && !l.starts_with('!'));
                for line in lines {
                    if let Some((key, value)) = split_inline(line) {
                        set.push(ConfigEntry::new(key, value).with_source(source.clone()));
                    }
                }
            }
            _ => return Err(ConfigError::UnsupportedFile { path: display }),
        }

        tracing::debug!("Loaded {} entries from {}", set.len(), path.display());
        Ok(set)
    }

    pub fn push(&mut self, entry: ConfigEntry) {
        self.entries.push(entry);
    }

    /// Builder-style insert of a programmatic entry
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.push(ConfigEntry::new(key, value));
        self
    }

    /// Append every entry of `other`; its entries override ours
    pub fn merge(&mut self, other: PropertySet) {
        self.entries.extend(other.entries);
    }

    /// Latest entry matching `key` under relaxed rules
    ///
    /// Environment entries also match when only their word boundaries differ,
    /// so `SECURITY_ENABLE_CSRF` answers for `security.enable-csrf`.
    pub fn get(&self, key: &str) -> Option<&ConfigEntry> {
        let wanted = naming::normalize_key(key);
        let wanted_flat = wanted.replace('.', "");
        self.entries.iter().rev().find(|entry| {
            let own = naming::normalize_key(&entry.key);
            own == wanted || (entry.source.is_env_var() && own.replace('.', "") == wanted_flat)
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = &'a ConfigEntry;
    type IntoIter = std::slice::Iter<'a, ConfigEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<ConfigEntry> for PropertySet {
    fn from_iter<I: IntoIterator<Item = ConfigEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

fn split_inline(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let split_at = line.find(['=', ':']);
    Some(match split_at {
        Some(index) => (
            line[..index].trim().to_string(),
            line[index + 1..].trim().to_string(),
        ),
        None => (line.to_string(), String::new()),
    })
}

/// `SECURITY_USER_PASSWORD` → `security.user.password`, `SECURITY_IGNORED_0` → `security.ignored[0]`
fn env_var_to_key(name: &str) -> Option<String> {
    let mut key = String::new();
    for part in name.split('_').filter(|p| !p.is_empty()) {
        if let Ok(index) = part.parse::<usize>() {
            if key.is_empty() {
                return None;
            }
            key.push_str(&format!("[{}]", index));
        } else {
            if !key.is_empty() {
                key.push('.');
            }
            key.push_str(&part.to_ascii_lowercase());
        }
    }
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

fn child_key(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn flatten_yaml(key: &str, value: &serde_yaml::Value, source: &ConfigSource, set: &mut PropertySet) {
    use serde_yaml::Value;

    let leaf = match value {
        Value::Mapping(map) => {
            for (name, child) in map {
                let name = match name {
                    Value::String(s) => s.clone(),
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => continue,
                };
                flatten_yaml(&child_key(key, &name), child, source, set);
            }
            return;
        }
        Value::Sequence(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_yaml(&format!("{}[{}]", key, index), child, source, set);
            }
            return;
        }
        Value::Sequence(_) | Value::Null => ConfigValue::Text(String::new()),
        Value::Bool(b) => ConfigValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Integer(i),
            None => ConfigValue::Text(n.to_string()),
        },
        Value::String(s) => ConfigValue::Text(s.clone()),
        Value::Tagged(tagged) => {
            flatten_yaml(key, &tagged.value, source, set);
            return;
        }
    };

    if !key.is_empty() {
        set.push(ConfigEntry::new(key, leaf).with_source(source.clone()));
    }
}

fn flatten_json(key: &str, value: &serde_json::Value, source: &ConfigSource, set: &mut PropertySet) {
    use serde_json::Value;

    let leaf = match value {
        Value::Object(map) => {
            for (name, child) in map {
                flatten_json(&child_key(key, name), child, source, set);
            }
            return;
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, child) in items.iter().enumerate() {
                flatten_json(&format!("{}[{}]", key, index), child, source, set);
            }
            return;
        }
        Value::Array(_) | Value::Null => ConfigValue::Text(String::new()),
        Value::Bool(b) => ConfigValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ConfigValue::Integer(i),
            None => ConfigValue::Text(n.to_string()),
        },
        Value::String(s) => ConfigValue::Text(s.clone()),
    };

    if !key.is_empty() {
        set.push(ConfigEntry::new(key, leaf).with_source(source.clone()));
    }
}
