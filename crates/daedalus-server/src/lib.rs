//! Application and HTTP server for the Daedalus router.
//!
//! [`App`] collects routes and middleware, dispatches requests in-process
//! through [`App::dispatch`], and serves them over TCP with hyper through
//! [`App::start`] or [`App::serve`].
//!
//! # Lifecycle
//!
//! ```text
//!   App::new / App::from_config
//!        │
//!        ▼
//!   use_middleware, get/post/...   (router mutable)
//!        │
//!        ▼
//!   dispatch / start / serve       (router frozen)
//!        │
//!        ▼
//!   App::stop or SIGINT/SIGTERM → stop accepting → drain connections
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use daedalus_core::Handler;
//! use daedalus_middleware::stages;
//! use daedalus_server::App;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), daedalus_server::AppError> {
//!     let mut app = App::new();
//!     app.set_name("Greeter");
//!     app.use_middleware(stages::recover())?;
//!     app.use_middleware(stages::access_log())?;
//!     app.get("/hello/:name", Handler::sync(|ctx| {
//!         let name = ctx.param("name").unwrap_or("world").to_owned();
//!         ctx.text(format!("hello, {name}"));
//!     }))?;
//!
//!     app.background().cancel_on_signal();
//!     Arc::new(app).start().await
//! }
//! ```

mod app;
pub mod background;
mod dispatch;
mod error;
mod server;
pub mod shutdown;

pub use app::{App, ServeOptions};
pub use background::Background;
pub use error::AppError;
