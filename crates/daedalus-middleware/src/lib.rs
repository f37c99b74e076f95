//! # Daedalus Middleware
//!
//! Middleware composition for Daedalus routes.
//!
//! A [`Middleware`] receives the next [`Handler`](daedalus_core::Handler) and
//! returns a new one. A [`Chain`] composes the application-wide middlewares
//! with a route's own middlewares around the route handler once, at
//! registration time.
//!
//! ## Execution Order
//!
//! ```text
//! Request → global[0] → global[1] → route[0] → Handler
//!                                                  ↓
//! Response ← global[0] ← global[1] ← route[0] ←────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use daedalus_core::{Context, Handler};
//! use daedalus_middleware::{stages, Chain};
//!
//! # tokio_test::block_on(async {
//! let chain = Chain::new()
//!     .with(stages::recover())
//!     .with(stages::request_id(Default::default()));
//!
//! let handler = chain.compose(&[], Handler::sync(|ctx| ctx.text("ok")));
//!
//! let mut ctx = Context::new();
//! handler.call(&mut ctx).await;
//! assert!(ctx.response_headers().contains_key("x-request-id"));
//! # });
//! ```

pub mod chain;
pub mod middleware;
pub mod stages;

pub use chain::Chain;
pub use middleware::Middleware;
