//! Request dispatch: base path, routing decision, automatic responses.

use std::net::SocketAddr;

use bytes::Bytes;
use daedalus_core::{Context, ErrorKind, HttpError};
use daedalus_router::Resolution;
use http::header::{HeaderValue, ALLOW};
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;

use crate::app::App;

impl App {
    /// Runs one request through the application and returns its response.
    ///
    /// The first call freezes the router. Redirects, automatic `OPTIONS`
    /// answers and the default `404`/`405` responses are written without
    /// running any middleware.
    pub async fn dispatch(
        &self,
        request: Request<Bytes>,
        remote_addr: Option<SocketAddr>,
    ) -> Response<Full<Bytes>> {
        self.router.freeze();

        let mut ctx = self.pool.acquire();
        ctx.begin(request, remote_addr, &self.options.proxy);
        self.route_request(&mut ctx).await;
        ctx.take_response()
    }

    async fn route_request(&self, ctx: &mut Context) {
        // Asterisk-form targets address the whole server, not the mount point.
        let base_path = self.options.base_path();
        if ctx.path() != "*" && !ctx.strip_path_prefix(base_path) {
            tracing::debug!(path = ctx.path(), base_path, "request outside base path");
            self.not_found(ctx).await;
            return;
        }

        let match_options = self.options.match_options();
        let resolution = {
            let (method, path, params) = ctx.routing_parts();
            self.router.resolve(method, path, &match_options, params)
        };

        match resolution {
            Resolution::Matched(endpoint) => {
                if self.options.save_matched_route_path {
                    ctx.set_route_pattern(endpoint.pattern_arc());
                }
                endpoint.value().call(ctx).await;
            }
            Resolution::RedirectTrailingSlash(path) | Resolution::RedirectFixedPath(path) => {
                self.redirect(ctx, &path);
            }
            Resolution::Options(allow) => {
                set_allow(ctx, &allow);
                ctx.set_status(StatusCode::OK);
            }
            Resolution::MethodNotAllowed(allow) => {
                tracing::debug!(method = %ctx.method(), path = ctx.path(), allow = %allow, "method not allowed");
                set_allow(ctx, &allow);
                match &self.fallbacks.method_not_allowed {
                    Some(handler) => {
                        ctx.set_status(StatusCode::METHOD_NOT_ALLOWED);
                        handler.call(ctx).await;
                    }
                    None => ctx.error(&HttpError::new(
                        ErrorKind::MethodNotAllowed,
                        "method not allowed",
                    )),
                }
            }
            Resolution::NotFound => {
                tracing::debug!(method = %ctx.method(), path = ctx.path(), "no route matched");
                self.not_found(ctx).await;
            }
        }
    }

    async fn not_found(&self, ctx: &mut Context) {
        match &self.fallbacks.not_found {
            Some(handler) => {
                ctx.set_status(StatusCode::NOT_FOUND);
                handler.call(ctx).await;
            }
            None => ctx.error(&HttpError::not_found("route not found")),
        }
    }

    fn redirect(&self, ctx: &mut Context, path: &str) {
        let base_path = self.options.base_path();
        let query = ctx.query();
        let mut location =
            String::with_capacity(base_path.len() + path.len() + query.map_or(0, |q| q.len() + 1));
        location.push_str(base_path);
        location.push_str(path);
        if let Some(query) = query {
            location.push('?');
            location.push_str(query);
        }

        let status = if ctx.method() == Method::GET {
            StatusCode::MOVED_PERMANENTLY
        } else {
            StatusCode::PERMANENT_REDIRECT
        };
        tracing::debug!(from = ctx.path(), to = %location, status = status.as_u16(), "redirecting");

        if let Err(err) = ctx.redirect(&location, status) {
            ctx.error(&err);
        }
    }
}

fn set_allow(ctx: &mut Context, allow: &str) {
    match HeaderValue::from_str(allow) {
        Ok(value) => ctx.insert_header(ALLOW, value),
        Err(_) => tracing::warn!(allow, "allow value is not a valid header"),
    }
}
