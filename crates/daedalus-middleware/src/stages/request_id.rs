//! Request ID stage.
//!
//! Every request gets a [`RequestId`] stored in the context extensions and
//! echoed in the `X-Request-ID` response header. An incoming header is
//! reused only when [`RequestIdConfig::trust_incoming`] is set and it parses
//! as a UUID.

use daedalus_core::{Context, RequestId};
use http::HeaderValue;
use uuid::Uuid;

use crate::middleware::Middleware;

/// The header name for request ID propagation.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Settings for the [`request_id`] stage.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdConfig {
    /// Reuse a valid incoming `X-Request-ID`.
    pub trust_incoming: bool,
}

fn incoming(ctx: &Context) -> Option<RequestId> {
    ctx.header(REQUEST_ID_HEADER)
        .and_then(|s| Uuid::parse_str(s).ok())
        .map(RequestId::from_uuid)
}

/// Creates the request ID stage.
#[must_use]
pub fn request_id(config: RequestIdConfig) -> Middleware {
    Middleware::around("request_id", move |ctx, next| {
        Box::pin(async move {
            let id = config
                .trust_incoming
                .then(|| incoming(ctx))
                .flatten()
                .unwrap_or_else(RequestId::new);
            ctx.extensions_mut().insert(id);

            next.call(ctx).await;

            if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
                ctx.insert_header(http::header::HeaderName::from_static(REQUEST_ID_HEADER), value);
            }
        })
    })
}
