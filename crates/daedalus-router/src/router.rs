//! Per-method router and dispatch resolution.

use std::borrow::Cow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use http::Method;

use crate::error::RouteError;
use crate::methods::MethodRegistry;
use crate::node::{Endpoint, InsertFailure, Node};
use crate::params::Params;
use crate::path::{clean_path, toggle_trailing_slash};
use crate::pattern;
use crate::table::RouteTable;

/// Options that shape [`Router::resolve`] when there is no exact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Redirect `/a/` to `/a` (and back) when only the other form exists.
    pub redirect_trailing_slash: bool,
    /// Redirect to the cleaned, case-corrected path when it exists.
    pub redirect_fixed_path: bool,
    /// Answer `405` when the path exists under other methods.
    pub handle_method_not_allowed: bool,
    /// Answer `OPTIONS` automatically.
    pub handle_options: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
        }
    }
}

/// Outcome of resolving a request against the router.
#[derive(Debug)]
pub enum Resolution<'r, T> {
    /// An exact match; captures were written to the params buffer.
    Matched(&'r Endpoint<T>),
    /// The path with its trailing slash toggled matches.
    RedirectTrailingSlash(String),
    /// The cleaned, case-corrected path matches.
    RedirectFixedPath(String),
    /// Automatic `OPTIONS` answer carrying the `Allow` value.
    Options(Cow<'r, str>),
    /// The path exists only under other methods; carries the `Allow` value.
    MethodNotAllowed(String),
    /// Nothing matches.
    NotFound,
}

impl<T> Resolution<'_, T> {
    /// Returns true for either redirect outcome.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(
            self,
            Self::RedirectTrailingSlash(_) | Self::RedirectFixedPath(_)
        )
    }
}

/// A set of radix trees, one per HTTP method.
///
/// Routes are inserted during a mutable build phase. Once [`freeze`] has been
/// called every further insert fails with [`RouteError::Frozen`] and the
/// router is only read.
///
/// [`freeze`]: Router::freeze
#[derive(Debug)]
pub struct Router<T> {
    methods: MethodRegistry,
    trees: Vec<Option<Node<T>>>,
    table: RouteTable,
    global_allowed: OnceLock<String>,
    frozen: AtomicBool,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        let methods = MethodRegistry::new();
        let mut trees = Vec::new();
        trees.resize_with(methods.len(), || None);
        Self {
            methods,
            trees,
            table: RouteTable::new(),
            global_allowed: OnceLock::new(),
            frozen: AtomicBool::new(false),
        }
    }

    /// Registers `pattern` under `method`.
    ///
    /// # Errors
    ///
    /// - [`RouteError::Frozen`] after [`Router::freeze`]
    /// - [`RouteError::InvalidPattern`] if the pattern does not parse
    /// - [`RouteError::Duplicate`] if the pair is already registered
    /// - [`RouteError::Conflict`] if a capture clashes with an existing one
    pub fn insert(&mut self, method: &Method, pattern: &str, value: T) -> Result<(), RouteError> {
        if self.is_frozen() {
            return Err(RouteError::Frozen {
                method: method.clone(),
                pattern: pattern.to_owned(),
            });
        }

        let tokens = pattern::parse(pattern)?;
        let slot = self.methods.register(method);
        if self.trees.len() <= slot {
            self.trees.resize_with(slot + 1, || None);
        }

        let tree = self.trees[slot].get_or_insert_with(Node::root);
        let was_empty = tree.is_empty();
        let endpoint = Endpoint::new(pattern, value);
        let shared = endpoint.pattern_arc();

        tree.insert(&tokens, endpoint).map_err(|failure| match failure {
            InsertFailure::Duplicate => RouteError::Duplicate {
                method: method.clone(),
                pattern: pattern.to_owned(),
            },
            InsertFailure::Conflict { segment, existing } => RouteError::Conflict {
                method: method.clone(),
                pattern: pattern.to_owned(),
                segment,
                existing,
            },
        })?;

        self.table.record(method, shared);
        if was_empty {
            self.global_allowed.take();
        }

        tracing::debug!(method = %method, pattern, "route registered");
        Ok(())
    }

    /// Makes the router read-only.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// Returns true once [`Router::freeze`] has been called.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    fn tree(&self, method: &Method) -> Option<&Node<T>> {
        let slot = self.methods.slot(method)?;
        self.trees.get(slot)?.as_ref()
    }

    /// Looks up an exact match, appending captures to `params`.
    pub fn find<'r>(
        &'r self,
        method: &Method,
        path: &str,
        params: &mut Params,
    ) -> Option<&'r Endpoint<T>> {
        self.tree(method)?.find(path, params)
    }

    /// Resolves a request path into a dispatch decision.
    ///
    /// Precedence: exact match, trailing-slash redirect, fixed-path redirect,
    /// automatic `OPTIONS`, method not allowed, not found. Redirects are
    /// never produced for `CONNECT` or for the root path.
    pub fn resolve<'r>(
        &'r self,
        method: &Method,
        path: &str,
        options: &MatchOptions,
        params: &mut Params,
    ) -> Resolution<'r, T> {
        if path == "*" {
            if *method == Method::OPTIONS && options.handle_options {
                let allowed = self.global_allowed();
                if !allowed.is_empty() {
                    return Resolution::Options(Cow::Borrowed(allowed));
                }
            }
            return Resolution::NotFound;
        }

        if let Some(tree) = self.tree(method) {
            if let Some(endpoint) = tree.find(path, params) {
                return Resolution::Matched(endpoint);
            }

            if *method != Method::CONNECT && path != "/" {
                if let Some(redirect) = Self::correct(tree, path, options, params) {
                    return redirect;
                }
            }
        }

        if *method == Method::OPTIONS && options.handle_options {
            if let Some(allow) = self.allowed(path) {
                return Resolution::Options(Cow::Owned(allow));
            }
        } else if options.handle_method_not_allowed {
            if let Some(allow) = self.allowed(path) {
                return Resolution::MethodNotAllowed(allow);
            }
        }

        Resolution::NotFound
    }

    fn correct<'r>(
        tree: &Node<T>,
        path: &str,
        options: &MatchOptions,
        params: &mut Params,
    ) -> Option<Resolution<'r, T>> {
        if options.redirect_trailing_slash {
            if let Some(toggled) = toggle_trailing_slash(path) {
                let found = tree.find(&toggled, params).is_some();
                params.clear();
                if found {
                    return Some(Resolution::RedirectTrailingSlash(toggled));
                }
            }
        }

        if options.redirect_fixed_path {
            let cleaned = clean_path(path);
            let mut fixed = String::with_capacity(cleaned.len() + 1);
            if tree.find_case_insensitive(&cleaned, &mut fixed) && fixed != path {
                return Some(Resolution::RedirectFixedPath(fixed));
            }

            if options.redirect_trailing_slash {
                if let Some(toggled) = toggle_trailing_slash(&cleaned) {
                    fixed.clear();
                    if tree.find_case_insensitive(&toggled, &mut fixed) && fixed != path {
                        return Some(Resolution::RedirectFixedPath(fixed));
                    }
                }
            }
        }

        None
    }

    /// Returns the `Allow` value for `path`: every method with an exact
    /// match, in canonical order, joined by `", "`. `None` if no method
    /// matches.
    #[must_use]
    pub fn allowed(&self, path: &str) -> Option<String> {
        let mut scratch = Params::new();
        let mut allow = String::new();

        for (slot, method) in self.methods.iter() {
            let Some(Some(tree)) = self.trees.get(slot) else {
                continue;
            };
            if tree.find(path, &mut scratch).is_some() {
                if !allow.is_empty() {
                    allow.push_str(", ");
                }
                allow.push_str(method.as_str());
            }
            scratch.clear();
        }

        (!allow.is_empty()).then_some(allow)
    }

    /// Returns every method with at least one route, in canonical order.
    ///
    /// Computed on first use and cached until a method gains its first
    /// route.
    pub fn global_allowed(&self) -> &str {
        self.global_allowed.get_or_init(|| {
            let mut allow = String::new();
            for (slot, method) in self.methods.iter() {
                let registered = matches!(self.trees.get(slot), Some(Some(tree)) if !tree.is_empty());
                if registered {
                    if !allow.is_empty() {
                        allow.push_str(", ");
                    }
                    allow.push_str(method.as_str());
                }
            }
            allow
        })
    }

    /// Returns the registered routes.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    /// Returns the method registry.
    #[must_use]
    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }
}
