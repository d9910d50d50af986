//! Host allow-list for declarative tools.
//!
//! Each definition carries its own list of hosts. Entries are either exact
//! hostnames or `*.domain` wildcards.

use std::fmt;

/// Pattern for matching allowed hosts.
#[derive(Debug, Clone)]
pub struct HostPattern {
    /// The pattern as written in the definition (e.g. "api.example.com" or "*.example.com").
    pattern: String,
    is_wildcard: bool,
    /// Lowercased host, or the base domain for wildcards.
    base_domain: String,
}

impl HostPattern {
    pub fn new(pattern: &str) -> Self {
        let trimmed = pattern.trim().trim_end_matches('.');
        let (is_wildcard, base) = match trimmed.strip_prefix("*.") {
            Some(base) => (true, base),
            None => (false, trimmed),
        };

        Self {
            pattern: pattern.to_string(),
            is_wildcard,
            base_domain: base.to_lowercase(),
        }
    }

    /// Check if a host matches this pattern.
    pub fn matches(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.').to_lowercase();
        if self.base_domain.is_empty() {
            return false;
        }

        if self.is_wildcard {
            // *.example.com matches example.com and any depth of subdomain
            host == self.base_domain
                || host
                    .strip_suffix(&self.base_domain)
                    .is_some_and(|prefix| prefix.ends_with('.'))
        } else {
            host == self.base_domain
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

/// Validates hosts against a definition's allow-list.
#[derive(Debug, Clone)]
pub struct HostAllowlist {
    patterns: Vec<HostPattern>,
}

impl HostAllowlist {
    pub fn new<S: AsRef<str>>(hosts: &[S]) -> Self {
        Self {
            patterns: hosts.iter().map(|h| HostPattern::new(h.as_ref())).collect(),
        }
    }

    /// Whether any pattern matches. An empty list denies everything.
    pub fn is_allowed(&self, host: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(host))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl fmt::Display for HostAllowlist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .patterns
            .iter()
            .map(HostPattern::pattern)
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{joined}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let pattern = HostPattern::new("api.example.com");
        assert!(pattern.matches("api.example.com"));
        assert!(pattern.matches("API.EXAMPLE.COM"));
        assert!(!pattern.matches("foo.api.example.com"));
        assert!(!pattern.matches("example.com"));
    }

    #[test]
    fn test_wildcard_match() {
        let pattern = HostPattern::new("*.example.com");
        assert!(pattern.matches("example.com"));
        assert!(pattern.matches("api.example.com"));
        assert!(pattern.matches("a.b.c.example.com"));
        assert!(!pattern.matches("evilexample.com"));
        assert!(!pattern.matches("example.com.evil.com"));
        assert!(!pattern.matches("other.com"));
    }

    #[test]
    fn test_trailing_dot_is_ignored() {
        let pattern = HostPattern::new("api.example.com");
        assert!(pattern.matches("api.example.com."));
    }

    #[test]
    fn test_degenerate_wildcard_matches_nothing() {
        let pattern = HostPattern::new("*.");
        assert!(!pattern.matches("example.com"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn test_subdomain_bypass_attempts() {
        let allowlist = HostAllowlist::new(&["api.example.com"]);

        assert!(allowlist.is_allowed("api.example.com"));
        assert!(!allowlist.is_allowed("evil.api.example.com"));
        assert!(!allowlist.is_allowed("api.example.com.evil.com"));
        assert!(!allowlist.is_allowed("api-example.com"));
        assert!(!allowlist.is_allowed("notapi.example.com"));
    }

    #[test]
    fn test_empty_allowlist_denies() {
        let allowlist = HostAllowlist::new::<&str>(&[]);
        assert!(allowlist.is_empty());
        assert!(!allowlist.is_allowed("anything.com"));
    }

    #[test]
    fn test_display_lists_patterns() {
        let allowlist = HostAllowlist::new(&["api.example.com", "*.github.com"]);
        assert_eq!(allowlist.to_string(), "[api.example.com, *.github.com]");
    }
}
