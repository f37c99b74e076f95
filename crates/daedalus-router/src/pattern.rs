//! Route pattern parsing.
//!
//! A pattern is split into a flat list of tokens. Consecutive literal
//! segments, including their `/` separators, are merged into a single
//! [`Token::Static`] so the tree can compress them into one edge.

use std::sync::Arc;

use crate::error::RouteError;

/// One parsed unit of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Literal text, possibly spanning several `/`-separated segments.
    Static(String),
    /// `:name`, matches one non-empty segment.
    Param(Arc<str>),
    /// `*name`, matches the remainder of the path.
    Wildcard(Arc<str>),
}

/// Parses a route pattern into tokens.
pub(crate) fn parse(pattern: &str) -> Result<Vec<Token>, RouteError> {
    let Some(body) = pattern.strip_prefix('/') else {
        return Err(RouteError::invalid(pattern, "pattern must start with '/'"));
    };

    let segments: Vec<&str> = body.split('/').collect();
    let mut tokens = Vec::with_capacity(segments.len());
    let mut literal = String::from("/");

    for (i, segment) in segments.iter().enumerate() {
        let last = i + 1 == segments.len();

        if let Some(name) = segment.strip_prefix(':') {
            let name = capture_name(pattern, name)?;
            tokens.push(Token::Static(std::mem::take(&mut literal)));
            tokens.push(Token::Param(name));
        } else if let Some(name) = segment.strip_prefix('*') {
            if !last {
                return Err(RouteError::invalid(
                    pattern,
                    "wildcard must be the last segment",
                ));
            }
            let name = capture_name(pattern, name)?;
            tokens.push(Token::Static(std::mem::take(&mut literal)));
            tokens.push(Token::Wildcard(name));
        } else {
            if segment.is_empty() && !last {
                return Err(RouteError::invalid(pattern, "empty path segment"));
            }
            literal.push_str(segment);
        }

        if !last {
            literal.push('/');
        }
    }

    if !literal.is_empty() {
        tokens.push(Token::Static(literal));
    }

    Ok(tokens)
}

fn capture_name(pattern: &str, name: &str) -> Result<Arc<str>, RouteError> {
    if name.is_empty() {
        return Err(RouteError::invalid(pattern, "capture name must not be empty"));
    }
    if name.contains([':', '*']) {
        return Err(RouteError::invalid(
            pattern,
            "capture name must not contain ':' or '*'",
        ));
    }
    Ok(Arc::from(name))
}
