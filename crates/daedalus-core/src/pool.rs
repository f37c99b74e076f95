//! Recycling of request contexts.
//!
//! The pool belongs to one application instance; separate apps never share
//! contexts. [`ContextPool::acquire`] always succeeds, allocating when no
//! idle context is available, and the returned guard puts the context back
//! when it is dropped, including while unwinding from a panic.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::context::Context;

/// Default cap on idle contexts kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// A pool of reusable [`Context`] values.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextPool {
    /// Creates a pool retaining up to [`DEFAULT_MAX_IDLE`] contexts.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Creates a pool retaining up to `max_idle` contexts.
    #[must_use]
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Hands out a pristine context.
    pub fn acquire(&self) -> PooledContext<'_> {
        let recycled = self.idle.lock().pop();
        let ctx = match recycled {
            Some(mut ctx) => {
                ctx.reset();
                ctx
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                Box::new(Context::new())
            }
        };
        PooledContext {
            pool: self,
            ctx: Some(ctx),
        }
    }

    fn release(&self, mut ctx: Box<Context>) {
        ctx.release_buffers();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }

    /// Number of contexts waiting for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of contexts allocated over the pool's lifetime.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// A context on loan from a [`ContextPool`].
///
/// Dereferences to [`Context`]. The context returns to the pool exactly once,
/// when the guard is dropped.
#[derive(Debug)]
pub struct PooledContext<'p> {
    pool: &'p ContextPool,
    ctx: Option<Box<Context>>,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        // Only `Drop` empties the slot.
        self.ctx.as_deref().expect("pooled context used after release")
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        self.ctx
            .as_deref_mut()
            .expect("pooled context used after release")
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            self.pool.release(ctx);
        }
    }
}
