//! Route matching logic.
//!
//! # Responsibilities
//! - Match a request path against a mounted subpath
//! - Return the remainder of the path below the subpath
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Matching respects segment boundaries: `/a` matches `/a/x`, never `/ab`
//! - Empty prefix = always matches (catch-all mount)
//! - No regex to guarantee O(n) matching

/// Matches a request path against a subpath prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if the path falls under this prefix.
    pub fn matches(&self, path: &str) -> bool {
        self.strip(path).is_some()
    }

    /// Strip the prefix from `path`, returning what is left below it.
    ///
    /// Returns `None` if the path is not under the prefix.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;

        let on_boundary = self.prefix.is_empty()
            || self.prefix.ends_with('/')
            || rest.is_empty()
            || rest.starts_with('/');

        on_boundary.then_some(rest)
    }
}
