//! Not-found path matching.
//!
//! # Responsibilities
//! - Recognize the upstream's dead-end page paths
//! - Exact rules and prefix rules (trailing `*`)
//!
//! # Design Decisions
//! - Paths compared case-insensitively, trailing slash ignored
//! - No regex to guarantee O(n) matching

/// A single path rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRule {
    /// Path equals the rule.
    Exact(String),
    /// Path starts with the rule.
    Prefix(String),
}

impl PathRule {
    /// Parse a configured rule. Returns `None` for rules that are not
    /// absolute paths.
    pub fn parse(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        if !rule.starts_with('/') {
            return None;
        }
        match rule.strip_suffix('*') {
            Some(prefix) => Some(PathRule::Prefix(prefix.to_ascii_lowercase())),
            None => Some(PathRule::Exact(normalize(rule))),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathRule::Exact(expected) => normalize(path) == *expected,
            PathRule::Prefix(prefix) => path.to_ascii_lowercase().starts_with(prefix.as_str()),
        }
    }
}

/// The set of paths recognized as the upstream's not-found page.
#[derive(Debug, Clone, Default)]
pub struct NotFoundPatterns {
    rules: Vec<PathRule>,
}

impl NotFoundPatterns {
    pub fn new(rules: Vec<PathRule>) -> Self {
        Self { rules }
    }

    /// Returns true if `path` (without query) is a not-found page.
    pub fn matches(&self, path: &str) -> bool {
        self.rules.iter().any(|r| r.matches(path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(rules: &[&str]) -> NotFoundPatterns {
        NotFoundPatterns::new(rules.iter().filter_map(|r| PathRule::parse(r)).collect())
    }

    #[test]
    fn test_exact_rule() {
        let p = patterns(&["/page-not-found"]);
        assert!(p.matches("/page-not-found"));
        assert!(p.matches("/page-not-found/"));
        assert!(p.matches("/Page-Not-Found"));
        assert!(!p.matches("/page-not-found/extra"));
        assert!(!p.matches("/"));
    }

    #[test]
    fn test_prefix_rule() {
        let p = patterns(&["/errors/*"]);
        assert!(p.matches("/errors/404"));
        assert!(p.matches("/ERRORS/gone"));
        assert!(!p.matches("/errors"));
        assert!(!p.matches("/products"));
    }

    #[test]
    fn test_rejects_relative_rule() {
        assert_eq!(PathRule::parse("page-not-found"), None);
        assert_eq!(PathRule::parse(" /404 "), Some(PathRule::Exact("/404".into())));
    }

    #[test]
    fn test_root_rule_only_matches_root() {
        let p = patterns(&["/"]);
        assert!(p.matches("/"));
        assert!(!p.matches("/products"));
    }
}
