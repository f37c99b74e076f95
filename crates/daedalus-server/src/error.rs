//! Application errors.

use daedalus_config::ConfigError;
use daedalus_router::RouteError;
use daedalus_telemetry::TelemetryError;
use thiserror::Error;

/// Errors returned by [`App`](crate::App).
#[derive(Debug, Error)]
pub enum AppError {
    /// A route could not be registered.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// Middleware or fallbacks were changed after the router froze.
    #[error("cannot register {what} after the application started serving")]
    Frozen {
        /// What was being registered.
        what: String,
    },

    /// Logging could not be set up.
    #[error(transparent)]
    Logging(#[from] TelemetryError),

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was requested.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The listener failed while serving.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The configuration could not be applied.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AppError {
    pub(crate) fn frozen(what: impl Into<String>) -> Self {
        Self::Frozen { what: what.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::frozen("middleware `access_log`");
        assert_eq!(
            err.to_string(),
            "cannot register middleware `access_log` after the application started serving"
        );

        let err = AppError::Bind {
            addr: "0.0.0.0:80".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("failed to bind 0.0.0.0:80"));
    }
}
