//! Core types for the Daedalus router.
//!
//! This crate holds the state that travels with a request:
//!
//! - [`Context`] - per-request request/response state
//! - [`ContextPool`] / [`PooledContext`] - recycling of contexts
//! - [`Handler`] - type-erased async request handlers
//! - [`RouterOptions`] / [`ProxyOptions`] - dispatch and client address settings
//! - [`HttpError`] - errors that map onto HTTP responses
//! - [`Environment`] - deployment environment

mod context;
mod environment;
mod error;
mod handler;
mod options;
mod pool;
mod proxy;

pub use context::{Context, RequestId};
pub use environment::{Environment, UnknownEnvironment};
pub use error::{ErrorDetail, ErrorEnvelope, ErrorKind, HttpError, HttpResult};
pub use handler::{BoxFuture, Handler};
pub use options::RouterOptions;
pub use pool::{ContextPool, PooledContext, DEFAULT_MAX_IDLE};
pub use proxy::{InvalidRange, ProxyOptions, ProxyTrust, TrustedRange, X_FORWARDED_FOR, X_REAL_IP};

pub use daedalus_router::Params;
