//! The middleware value type.

use std::fmt;
use std::sync::Arc;

use daedalus_core::{BoxFuture, Context, Handler};

type WrapFn = dyn Fn(Handler) -> Handler + Send + Sync;

/// A function from the next handler in the chain to a new handler.
///
/// Wrapping happens once, when a route is registered; the resulting handler
/// is reused for every request to that route.
///
/// # Example
///
/// ```
/// use daedalus_core::{Context, Handler};
/// use daedalus_middleware::Middleware;
/// use http::HeaderValue;
///
/// let powered_by = Middleware::around("powered_by", |ctx: &mut Context, next: Handler| {
///     Box::pin(async move {
///         next.call(ctx).await;
///         ctx.insert_header(
///             http::header::SERVER,
///             HeaderValue::from_static("daedalus"),
///         );
///     })
/// });
/// assert_eq!(powered_by.name(), "powered_by");
/// ```
#[derive(Clone)]
pub struct Middleware {
    name: &'static str,
    wrap: Arc<WrapFn>,
}

impl Middleware {
    /// Creates a middleware from a wrapping function.
    pub fn new<F>(name: &'static str, wrap: F) -> Self
    where
        F: Fn(Handler) -> Handler + Send + Sync + 'static,
    {
        Self {
            name,
            wrap: Arc::new(wrap),
        }
    }

    /// Creates a middleware from a function that receives the context and
    /// the next handler for every request.
    pub fn around<F>(name: &'static str, f: F) -> Self
    where
        F: for<'c> Fn(&'c mut Context, Handler) -> BoxFuture<'c, ()> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(name, move |next| {
            let f = Arc::clone(&f);
            Handler::new(move |ctx| f(ctx, next.clone()))
        })
    }

    /// Returns the name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Wraps `next`.
    #[must_use]
    pub fn wrap(&self, next: Handler) -> Handler {
        (self.wrap)(next)
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
