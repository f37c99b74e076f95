//! Logging setup for Daedalus services.
//!
//! Daedalus crates emit events through the [`tracing`] macros. This crate
//! installs the process-wide subscriber that turns those events into either
//! JSON lines (production) or human-readable output (development).
//!
//! # Example
//!
//! ```rust,no_run
//! use daedalus_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development()).expect("logging");
//! tracing::info!(route = "/users/:id", "route registered");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
