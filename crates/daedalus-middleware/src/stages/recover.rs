//! Panic recovery stage.

use std::panic::AssertUnwindSafe;

use daedalus_core::HttpError;
use futures_util::FutureExt;

use crate::middleware::Middleware;

/// Creates a stage that converts a panic further down the chain into a
/// `500` error envelope.
///
/// Whatever the panicking handler had written to the response is discarded.
#[must_use]
pub fn recover() -> Middleware {
    Middleware::around("recover", |ctx, next| {
        Box::pin(async move {
            let outcome = AssertUnwindSafe(async { next.call(ctx).await })
                .catch_unwind()
                .await;
            if let Err(panic) = outcome {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(ToString::to_string)
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_owned());
                tracing::error!(
                    method = %ctx.method(),
                    path = ctx.path(),
                    panic = %message,
                    "handler panicked"
                );
                ctx.response_headers_mut().clear();
                ctx.error(&HttpError::internal("internal server error"));
            }
        })
    })
}
