//! Stock middleware stages.
//!
//! | Stage | Constructor | Purpose |
//! |-------|-------------|---------|
//! | Request ID | [`request_id`] | Assign or propagate `X-Request-ID` (UUID v7) |
//! | Access log | [`access_log`] | One structured log event per request |
//! | Recover | [`recover`] | Turn handler panics into `500` responses |
//!
//! Register `recover` first so it also guards the stages after it.

mod access_log;
mod recover;
mod request_id;

pub use access_log::access_log;
pub use recover::recover;
pub use request_id::{request_id, RequestIdConfig, REQUEST_ID_HEADER};
