//! Route matching logic.
//!
//! # Responsibilities
//! - Normalize configured prefixes
//! - Match request paths on segment boundaries
//! - Compute the forwarded path when the prefix is stripped
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/api/users` matches `/api/users` and `/api/users/42`, never `/api/usersx`
//! - No regex to guarantee O(n) matching

/// Normalize a prefix: no trailing slash, except for the root prefix.
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. The prefix is normalized.
    pub fn new(prefix: impl AsRef<str>) -> Self {
        Self {
            prefix: normalize_prefix(prefix.as_ref()),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of bytes matched; longer wins.
    pub fn specificity(&self) -> usize {
        if self.prefix == "/" {
            0
        } else {
            self.prefix.len()
        }
    }

    /// Returns true if `path` lies under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return path.starts_with('/');
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The path left after removing the prefix. Always starts with `/`.
    pub fn strip(&self, path: &str) -> String {
        if self.prefix == "/" {
            return path.to_string();
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some("") | None => "/".to_string(),
            Some(rest) => rest.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/api/users/"), "/api/users");
        assert_eq!(normalize_prefix("/api/users"), "/api/users");
        assert_eq!(normalize_prefix("/"), "/");
        assert_eq!(normalize_prefix("//"), "/");
    }

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/users");

        assert!(matcher.matches("/api/users"));
        assert!(matcher.matches("/api/users/42"));
        assert!(matcher.matches("/api/users/"));
        assert!(!matcher.matches("/api/usersx"));
        assert!(!matcher.matches("/api/orders/1"));
        assert!(!matcher.matches("/API/users"));
    }

    #[test]
    fn test_root_matcher() {
        let matcher = PathPrefixMatcher::new("/");
        assert!(matcher.matches("/anything"));
        assert_eq!(matcher.specificity(), 0);
        assert_eq!(matcher.strip("/anything"), "/anything");
    }

    #[test]
    fn test_strip() {
        let matcher = PathPrefixMatcher::new("/users/");
        assert_eq!(matcher.strip("/users/42"), "/42");
        assert_eq!(matcher.strip("/users"), "/");
        assert_eq!(matcher.strip("/users/"), "/");
    }
}
