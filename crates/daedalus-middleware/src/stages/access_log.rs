//! Access log stage.

use crate::middleware::Middleware;

/// Creates a stage logging one `info` event per completed request.
#[must_use]
pub fn access_log() -> Middleware {
    Middleware::around("access_log", |ctx, next| {
        Box::pin(async move {
            next.call(ctx).await;

            let status = ctx.status();
            let latency_us = u64::try_from(ctx.elapsed().as_micros()).unwrap_or(u64::MAX);
            let request_id = ctx.request_id().map(|id| id.to_string());
            tracing::info!(
                method = %ctx.method(),
                path = ctx.path(),
                route = ctx.route_pattern().unwrap_or("-"),
                status = status.as_u16(),
                latency_us,
                client_ip = ?ctx.client_ip(),
                request_id = request_id.as_deref().unwrap_or("-"),
                "request completed"
            );
        })
    })
}

#[cfg(test)]
mod tests {
    use daedalus_core::{Context, Handler};
    use http::StatusCode;

    use super::*;

    #[tokio::test]
    async fn test_passes_response_through() {
        let handler = access_log().wrap(Handler::sync(|ctx| {
            ctx.set_status(StatusCode::ACCEPTED);
            ctx.text("queued");
        }));
        let mut ctx = Context::new();
        handler.call(&mut ctx).await;
        assert_eq!(ctx.status(), StatusCode::ACCEPTED);
        assert_eq!(ctx.response_body(), b"queued");
    }
}
