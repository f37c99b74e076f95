//! Ordered middleware composition.
//!
//! Middlewares run in registration order on the way in and in reverse order
//! on the way out: the first one added is the outermost wrapper.
//!
//! ```text
//! request → m1 → m2 → route m3 → handler
//! response ← m1 ← m2 ← route m3 ←──┘
//! ```

use daedalus_core::Handler;

use crate::middleware::Middleware;

/// An ordered list of middlewares.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    middlewares: Vec<Middleware>,
}

impl Chain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware; it runs after every middleware already present.
    pub fn push(&mut self, middleware: Middleware) {
        self.middlewares.push(middleware);
    }

    /// Builder form of [`Chain::push`].
    #[must_use]
    pub fn with(mut self, middleware: Middleware) -> Self {
        self.push(middleware);
        self
    }

    /// Number of middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Returns true if the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Iterates middlewares in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Middleware> {
        self.middlewares.iter()
    }

    /// Wraps `handler` with this chain followed by `route`.
    #[must_use]
    pub fn compose(&self, route: &[Middleware], handler: Handler) -> Handler {
        self.middlewares
            .iter()
            .chain(route)
            .rev()
            .fold(handler, |next, middleware| middleware.wrap(next))
    }
}

impl FromIterator<Middleware> for Chain {
    fn from_iter<I: IntoIterator<Item = Middleware>>(iter: I) -> Self {
        Self {
            middlewares: iter.into_iter().collect(),
        }
    }
}
