//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Mount one forwarder per proxy mapping
//! - Look up the forwarder for a request path
//! - Return matched route or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Longest mounted prefix wins
//! - Identical subpaths: the later mapping replaces the earlier one
//! - O(n) prefix scan over routes sorted longest-first (acceptable for typical route counts)

use crate::http::forwarder::Forwarder;
use crate::routing::descriptor::ProxyMapping;
use crate::routing::matcher::PathPrefixMatcher;

/// A mounted subpath and the forwarder serving it.
#[derive(Debug)]
pub struct Route {
    matcher: PathPrefixMatcher,
    forwarder: Forwarder,
}

impl Route {
    fn new(mapping: &ProxyMapping) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(mapping.subpath.as_str()),
            forwarder: Forwarder::new(mapping),
        }
    }

    pub fn subpath(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn forwarder(&self) -> &Forwarder {
        &self.forwarder
    }
}

/// A matched route plus the path left below its subpath.
#[derive(Debug)]
pub struct RouteMatch<'r, 'p> {
    pub route: &'r Route,
    pub remainder: &'p str,
}

/// Prefix router over the configured proxy mappings.
#[derive(Debug, Default)]
pub struct RoutingTable {
    /// Sorted by subpath length, longest first.
    routes: Vec<Route>,
}

impl RoutingTable {
    /// Mount `mappings` in order.
    pub fn build(mappings: impl IntoIterator<Item = ProxyMapping>) -> Self {
        let mut routes: Vec<Route> = Vec::new();

        for mapping in mappings {
            if !mapping.subpath.is_empty() && !mapping.subpath.starts_with('/') {
                tracing::warn!(
                    subpath = %mapping.subpath,
                    "Subpath does not start with '/' and will never match a request path"
                );
            }

            match routes.iter().position(|r| r.subpath() == mapping.subpath) {
                Some(index) => {
                    tracing::warn!(
                        subpath = %mapping.subpath,
                        replaced = %routes[index].forwarder.upstream(),
                        upstream = %mapping.upstream,
                        "Duplicate subpath, later mapping replaces earlier one"
                    );
                    routes[index] = Route::new(&mapping);
                }
                None => routes.push(Route::new(&mapping)),
            }
        }

        // Stable sort keeps registration order among equal lengths.
        routes.sort_by(|a, b| b.subpath().len().cmp(&a.subpath().len()));

        Self { routes }
    }

    /// Find the most specific route for `path`.
    pub fn match_path<'r, 'p>(&'r self, path: &'p str) -> Option<RouteMatch<'r, 'p>> {
        self.routes.iter().find_map(|route| {
            route
                .matcher
                .strip(path)
                .map(|remainder| RouteMatch { route, remainder })
        })
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
