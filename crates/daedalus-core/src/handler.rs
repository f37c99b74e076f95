//! Type-erased request handlers.
//!
//! A [`Handler`] borrows the request [`Context`] mutably for the duration of
//! the returned future. Anything captured by the closure must be cloned into
//! the future, since the future may not borrow the closure itself.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;

/// A boxed, `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type HandlerFn = dyn for<'c> Fn(&'c mut Context) -> BoxFuture<'c, ()> + Send + Sync;

/// A cheaply clonable request handler.
///
/// # Example
///
/// ```
/// use daedalus_core::{Context, Handler};
///
/// let hello = Handler::new(|ctx: &mut Context| {
///     Box::pin(async move {
///         let name = ctx.param("name").unwrap_or("world").to_owned();
///         ctx.text(format!("hello, {name}"));
///     })
/// });
///
/// let static_page = Handler::sync(|ctx| ctx.text("about"));
/// # let _ = (hello, static_page);
/// ```
#[derive(Clone)]
pub struct Handler {
    inner: Arc<HandlerFn>,
}

impl Handler {
    /// Wraps an async handler function.
    pub fn new<F>(f: F) -> Self
    where
        F: for<'c> Fn(&'c mut Context) -> BoxFuture<'c, ()> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Wraps a handler that completes without awaiting.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self::new(move |ctx| {
            f(ctx);
            Box::pin(std::future::ready(()))
        })
    }

    /// Runs the handler against `ctx`.
    pub fn call<'c>(&self, ctx: &'c mut Context) -> BoxFuture<'c, ()> {
        (self.inner)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}
