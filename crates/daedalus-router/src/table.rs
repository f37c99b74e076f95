//! Registered route enumeration.

use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;

/// Every registered pattern, grouped by method.
///
/// Methods appear in the order their first route was registered; patterns
/// in registration order. The table is never consulted for matching.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    by_method: IndexMap<Method, Vec<Arc<str>>>,
}

impl RouteTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, method: &Method, pattern: Arc<str>) {
        self.by_method
            .entry(method.clone())
            .or_default()
            .push(pattern);
    }

    /// Returns the patterns registered for `method`.
    #[must_use]
    pub fn patterns(&self, method: &Method) -> &[Arc<str>] {
        self.by_method.get(method).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns true if the exact pattern is registered for `method`.
    #[must_use]
    pub fn contains(&self, method: &Method, pattern: &str) -> bool {
        self.patterns(method).iter().any(|p| &**p == pattern)
    }

    /// Iterates the methods that have at least one route.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.by_method.keys()
    }

    /// Iterates every `(method, pattern)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.by_method
            .iter()
            .flat_map(|(method, patterns)| patterns.iter().map(move |p| (method, &**p)))
    }

    /// Total number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_method.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_method.is_empty()
    }
}
