//! Matching request paths against ignored Ant-style patterns

use crate::properties::SecurityProperties;
use crate::{SecurityError, SecurityResult};
use regex::Regex;

/// Compiled `security.ignored` patterns
///
/// Patterns use Ant syntax: `?` matches one character, `*` anything within a
/// path segment, and `**` any number of segments.
#[derive(Debug, Clone)]
pub struct IgnoredRequestMatcher {
    patterns: Vec<(String, Regex)>,
}

impl IgnoredRequestMatcher {
    pub fn new<I, S>(patterns: I) -> SecurityResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref().trim().to_string();
                let regex = Regex::new(&ant_to_regex(&pattern)).map_err(|e| {
                    SecurityError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    }
                })?;
                Ok((pattern, regex))
            })
            .collect::<SecurityResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Matcher over the effective ignored paths of `properties`
    pub fn from_properties(properties: &SecurityProperties) -> SecurityResult<Self> {
        Self::new(properties.effective_ignored())
    }

    /// Check if a request path bypasses security; any query string is ignored
    pub fn matches(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path);
        self.patterns.iter().any(|(_, regex)| regex.is_match(path))
    }

    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(|(p, _)| p.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn ant_to_regex(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::from("^");
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                let segment_start = i == 0 || chars[i - 1] == '/';
                if segment_start && chars.get(i + 2) == Some(&'/') {
                    // "**/" spans zero or more whole segments
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else if segment_start && i > 0 && i + 2 == chars.len() {
                    // trailing "/**" also matches the bare prefix
                    out.pop();
                    out.push_str("(?:/.*)?");
                    i += 2;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
            }
            '*' => {
                out.push_str("[^/]*");
                i += 1;
            }
            '?' => {
                out.push_str("[^/]");
                i += 1;
            }
            c => {
                out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
                i += 1;
            }
        }
    }

    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(patterns: &[&str]) -> IgnoredRequestMatcher {
        IgnoredRequestMatcher::new(patterns).unwrap()
    }

    #[test]
    fn test_double_star_suffix() {
        let m = matcher(&["/css/**"]);
        assert!(m.matches("/css"));
        assert!(m.matches("/css/site.css"));
        assert!(m.matches("/css/themes/dark/site.css"));
        assert!(!m.matches("/cssx/site.css"));
        assert!(!m.matches("/js/app.js"));
    }

    #[test]
    fn test_double_star_prefix() {
        let m = matcher(&["**/favicon.ico"]);
        assert!(m.matches("/favicon.ico"));
        assert!(m.matches("/static/img/favicon.ico"));
        assert!(!m.matches("/favicon.png"));
    }

    #[test]
    fn test_single_star_and_question_mark() {
        let m = matcher(&["/api/*/status", "/v?/health"]);
        assert!(m.matches("/api/orders/status"));
        assert!(!m.matches("/api/orders/items/status"));
        assert!(m.matches("/v1/health"));
        assert!(!m.matches("/v10/health"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let m = matcher(&["/files/report.pdf"]);
        assert!(m.matches("/files/report.pdf"));
        assert!(!m.matches("/files/reportXpdf"));
    }

    #[test]
    fn test_query_string_is_ignored() {
        assert!(matcher(&["/js/**"]).matches("/js/app.js?v=3"));
    }

    #[test]
    fn test_from_properties() {
        let mut properties = SecurityProperties::default();
        let defaults = IgnoredRequestMatcher::from_properties(&properties).unwrap();
        assert!(defaults.matches("/webjars/jquery/jquery.js"));
        assert!(!defaults.matches("/admin"));

        properties.ignored = vec!["none".to_string()];
        let none = IgnoredRequestMatcher::from_properties(&properties).unwrap();
        assert!(none.is_empty());
        assert!(!none.matches("/css/site.css"));
    }
}
