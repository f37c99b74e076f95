//! # Daedalus
//!
//! An HTTP router built on per-method radix trees, with an application
//! server on top of hyper.
//!
//! - Static segments, `:name` parameters and `*name` wildcards
//! - Trailing-slash and case/cleaned-path redirects
//! - Automatic `405 Method Not Allowed` and `OPTIONS` answers with `Allow`
//! - Pooled request contexts and an ordered middleware chain
//! - Layered configuration and structured logging
//!
//! ## Quick Start
//!
//! ```rust
//! use daedalus::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let mut app = App::new();
//! app.use_middleware(stages::recover()).unwrap();
//! app.get("/users/:id", Handler::sync(|ctx| {
//!     let id = ctx.param("id").unwrap_or_default().to_owned();
//!     ctx.text(format!("user {id}"));
//! }))
//! .unwrap();
//!
//! let request = http::Request::get("/users/7").body(bytes::Bytes::new()).unwrap();
//! let response = app.dispatch(request, None).await;
//! assert_eq!(response.status(), 200);
//! # });
//! ```
//!
//! ## Request flow
//!
//! ```text
//! accept → buffer body → acquire Context → strip base path → resolve
//!    │
//!    ├─ Matched           → global middleware → route middleware → handler
//!    ├─ Redirect          → 301 (GET) / 308 with Location
//!    ├─ Options           → 200 with Allow
//!    ├─ MethodNotAllowed  → 405 with Allow
//!    └─ NotFound          → 404
//! ```

pub use daedalus_config as config;
pub use daedalus_core as core;
pub use daedalus_middleware as middleware;
pub use daedalus_router as router;
pub use daedalus_server as server;
pub use daedalus_telemetry as telemetry;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use daedalus_config::{ConfigLoader, DaedalusConfig};
    pub use daedalus_core::{
        Context, Environment, ErrorKind, Handler, HttpError, HttpResult, ProxyOptions,
        RouterOptions,
    };
    pub use daedalus_middleware::{stages, Chain, Middleware};
    pub use daedalus_router::RouteError;
    pub use daedalus_server::{App, AppError, Background, ServeOptions};
    pub use daedalus_telemetry::{LogConfig, LogFormat};
}
