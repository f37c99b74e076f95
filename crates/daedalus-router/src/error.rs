//! Route registration errors.

use http::Method;
use thiserror::Error;

/// Errors raised while registering a route.
///
/// Registration errors are fatal to the offending call only. The router is
/// left exactly as it was before the failed insert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The pattern text could not be parsed.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The rejected pattern.
        pattern: String,
        /// Why the pattern was rejected.
        reason: &'static str,
    },

    /// The exact (method, pattern) pair is already registered.
    #[error("route `{method} {pattern}` is already registered")]
    Duplicate {
        /// Method of the rejected route.
        method: Method,
        /// The rejected pattern.
        pattern: String,
    },

    /// A parameter or wildcard segment clashes with one already present at
    /// the same position.
    #[error("route `{method} {pattern}`: segment `{segment}` conflicts with existing `{existing}`")]
    Conflict {
        /// Method of the rejected route.
        method: Method,
        /// The rejected pattern.
        pattern: String,
        /// The segment of the new pattern that clashes.
        segment: String,
        /// The segment already registered at that position.
        existing: String,
    },

    /// The router no longer accepts registrations.
    #[error("cannot register `{method} {pattern}`: routes are frozen once dispatch begins")]
    Frozen {
        /// Method of the rejected route.
        method: Method,
        /// The rejected pattern.
        pattern: String,
    },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: &'static str) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        }
    }

    /// Returns the pattern the error refers to.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::InvalidPattern { pattern, .. }
            | Self::Duplicate { pattern, .. }
            | Self::Conflict { pattern, .. }
            | Self::Frozen { pattern, .. } => pattern,
        }
    }
}
