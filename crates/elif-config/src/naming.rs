//! Relaxed property names
//!
//! `enable-csrf`, `enableCsrf`, `enable_csrf` and `ENABLE_CSRF` all name the
//! same logical property. Every place that compares names (the binder, the
//! schema lookups, validation tooling) goes through [`normalize`].

use std::fmt;

/// Strip separators and case from a single name segment.
pub fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Compare two name segments under relaxed rules.
pub fn matches(left: &str, right: &str) -> bool {
    normalize(left) == normalize(right)
}

/// Normalize a whole dotted/indexed key, segment by segment.
///
/// Malformed keys fall back to normalizing the raw text so that lookups
/// still behave predictably.
pub fn normalize_key(key: &str) -> String {
    match PropertyPath::parse(key) {
        Ok(path) => path.normalized(),
        Err(_) => normalize(key),
    }
}

/// Split an environment variable name into lowercase words on `_`.
///
/// Underscores are ambiguous: `SECURITY_ENABLE_CSRF` may be one name or
/// three, so the words are only joined once a target's field names are known.
pub fn env_words(name: &str) -> Vec<String> {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(normalize)
        .collect()
}

/// End index of the run of `words` starting at `start` that spells `name`.
///
/// At most one run can match, since each added word lengthens the join.
pub fn join_words(words: &[String], start: usize, name: &str) -> Option<usize> {
    let target = normalize(name);
    let mut joined = String::new();
    for (end, word) in words.iter().enumerate().skip(start) {
        joined.push_str(word);
        if joined == target {
            return Some(end + 1);
        }
        if !target.starts_with(&joined) {
            return None;
        }
    }
    None
}

/// One step of a property path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Name(String),
    Index(usize),
}

/// A parsed configuration key such as `security.ignored[0]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Parse a dot/bracket key.
    pub fn parse(key: &str) -> Result<Self, String> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(Self { segments: Vec::new() });
        }

        let mut segments = Vec::new();
        for part in key.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(open) => part.split_at(open),
                None => (part, ""),
            };
            if name.is_empty() {
                return Err("empty name segment".to_string());
            }
            segments.push(PathSegment::Name(name.to_string()));

            while !rest.is_empty() {
                let inner = rest
                    .strip_prefix('[')
                    .ok_or_else(|| format!("unexpected '{}' after index", rest))?;
                let close = inner
                    .find(']')
                    .ok_or_else(|| "unbalanced '['".to_string())?;
                let index = inner[..close]
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("'{}' is not a list index", &inner[..close]))?;
                segments.push(PathSegment::Index(index));
                rest = &inner[close + 1..];
            }
        }

        if segments
            .iter()
            .any(|s| matches!(s, PathSegment::Name(n) if n.contains(']')))
        {
            return Err("unbalanced ']'".to_string());
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Canonical relaxed form, used as a lookup key.
    pub fn normalized(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                PathSegment::Name(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(&normalize(name));
                }
                PathSegment::Index(index) => {
                    out.push_str(&format!("[{}]", index));
                }
            }
        }
        out
    }

    /// Drop a leading prefix if every prefix segment matches under relaxed rules.
    pub fn strip_prefix(&self, prefix: &PropertyPath) -> Option<PropertyPath> {
        if prefix.segments.len() > self.segments.len() {
            return None;
        }
        let leading = self.segments.iter().zip(&prefix.segments);
        for (own, expected) in leading {
            let same = match (own, expected) {
                (PathSegment::Name(a), PathSegment::Name(b)) => matches(a, b),
                (PathSegment::Index(a), PathSegment::Index(b)) => a == b,
                _ => false,
            };
            if !same {
                return None;
            }
        }
        Some(PropertyPath {
            segments: self.segments[prefix.segments.len()..].to_vec(),
        })
    }

    /// Number of leading env `words` this path spells, names spanning any number of words.
    pub fn consume_words(&self, words: &[String]) -> Option<usize> {
        let mut at = 0;
        for segment in &self.segments {
            at = match segment {
                PathSegment::Name(name) => join_words(words, at, name)?,
                PathSegment::Index(index) if words.get(at)? == &index.to_string() => at + 1,
                PathSegment::Index(_) => return None,
            };
        }
        Some(at)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for segment in &self.segments {
            match segment {
                PathSegment::Name(name) => {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(index) => write!(f, "[{}]", index)?,
            }
            first = false;
        }
        Ok(())
    }
}
