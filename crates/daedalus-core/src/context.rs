//! Per-request state.
//!
//! A [`Context`] carries one request through the middleware chain to its
//! handler and collects the response on the way. Contexts are recycled by
//! the [`ContextPool`](crate::ContextPool): every field is reset when a
//! context is handed out again, so nothing survives from a previous request.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, Bytes, BytesMut};
use daedalus_router::Params;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::{Extensions, Method, Request, Response, StatusCode, Uri};
use http_body_util::Full;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{HttpError, HttpResult};
use crate::proxy::ProxyOptions;

/// Response bodies whose buffer grew beyond this are not kept when a context
/// is recycled.
const MAX_RETAINED_BODY: usize = 64 * 1024;

/// Unique identifier assigned to a request.
///
/// Uses UUID v7, so identifiers are time-ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new request id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Mutable state of one in-flight request.
#[derive(Debug)]
pub struct Context {
    method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    client_ip: Option<IpAddr>,
    params: Params,
    route: Option<Arc<str>>,
    status: StatusCode,
    response_headers: HeaderMap,
    response_body: BytesMut,
    extensions: Extensions,
    started_at: Instant,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Creates a context for `GET /` with an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            uri: Uri::default(),
            path: String::from("/"),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            client_ip: None,
            params: Params::new(),
            route: None,
            status: StatusCode::OK,
            response_headers: HeaderMap::new(),
            response_body: BytesMut::new(),
            extensions: Extensions::new(),
            started_at: Instant::now(),
        }
    }

    /// Resets every field to the state of [`Context::new`], keeping buffers.
    pub(crate) fn reset(&mut self) {
        self.method = Method::GET;
        self.uri = Uri::default();
        self.path.clear();
        self.path.push('/');
        self.headers.clear();
        self.body = Bytes::new();
        self.remote_addr = None;
        self.client_ip = None;
        self.params.clear();
        self.route = None;
        self.status = StatusCode::OK;
        self.response_headers.clear();
        self.response_body.clear();
        self.extensions.clear();
        self.started_at = Instant::now();
    }

    /// Drops everything that references the finished request.
    pub(crate) fn release_buffers(&mut self) {
        self.body = Bytes::new();
        self.headers.clear();
        self.extensions.clear();
        self.params.clear();
        self.route = None;
        if self.response_body.capacity() > MAX_RETAINED_BODY {
            self.response_body = BytesMut::new();
        } else {
            self.response_body.clear();
        }
    }

    /// Loads a request into the context.
    ///
    /// The routed path starts out as the full URI path; the dispatcher strips
    /// the base path with [`Context::strip_path_prefix`].
    pub fn begin(
        &mut self,
        request: Request<Bytes>,
        remote_addr: Option<SocketAddr>,
        proxy: &ProxyOptions,
    ) {
        let (parts, body) = request.into_parts();
        self.method = parts.method;
        self.uri = parts.uri;
        self.path.clear();
        self.path.push_str(self.uri.path());
        self.headers = parts.headers;
        self.extensions = parts.extensions;
        self.body = body;
        self.remote_addr = remote_addr;
        self.client_ip = proxy.client_ip(remote_addr.map(|a| a.ip()), &self.headers);
        self.started_at = Instant::now();
    }

    /// Removes `prefix` from the routed path.
    ///
    /// Returns false, leaving the path unchanged, if the path is not
    /// `prefix` itself or below it.
    pub fn strip_path_prefix(&mut self, prefix: &str) -> bool {
        if prefix.is_empty() {
            return true;
        }
        let Some(rest) = self.path.strip_prefix(prefix) else {
            return false;
        };
        if !(rest.is_empty() || rest.starts_with('/')) {
            return false;
        }
        self.path.drain(..prefix.len());
        if self.path.is_empty() {
            self.path.push('/');
        }
        true
    }

    /// Splits the context into the pieces the router needs.
    pub fn routing_parts(&mut self) -> (&Method, &str, &mut Params) {
        (&self.method, &self.path, &mut self.params)
    }

    // ----- request -----

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the full request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the path used for routing, without the base path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string.
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    /// Returns a request header as text.
    #[must_use]
    pub fn header(&self, name: impl header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns all request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the buffered request body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialises the request body as JSON.
    pub fn body_json<T: serde::de::DeserializeOwned>(&self) -> HttpResult<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| HttpError::bad_request(format!("invalid JSON body: {e}")))
    }

    /// Returns a captured path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Returns all captured path parameters.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns the matched route pattern, if recorded.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Records the matched route pattern.
    pub fn set_route_pattern(&mut self, pattern: Arc<str>) {
        self.route = Some(pattern);
    }

    /// Returns the address of the connected peer.
    #[must_use]
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Returns the client address after proxy resolution.
    #[must_use]
    pub fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    /// Returns the time elapsed since the request was loaded.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Returns the request-scoped extensions.
    #[must_use]
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Returns the request-scoped extensions mutably.
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }

    /// Returns the request id assigned by middleware, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        self.extensions.get::<RequestId>().copied()
    }

    // ----- response -----

    /// Returns the response status.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the response status.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Sets a response header, replacing previous values.
    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.response_headers.insert(name, value);
    }

    /// Sets a response header from text.
    pub fn set_header(&mut self, name: &str, value: &str) -> HttpResult<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| HttpError::internal("invalid response header name").with_source(e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| HttpError::internal("invalid response header value").with_source(e))?;
        self.response_headers.insert(name, value);
        Ok(())
    }

    /// Returns the response headers.
    #[must_use]
    pub fn response_headers(&self) -> &HeaderMap {
        &self.response_headers
    }

    /// Returns the response headers mutably.
    pub fn response_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.response_headers
    }

    /// Returns the response body written so far.
    #[must_use]
    pub fn response_body(&self) -> &[u8] {
        &self.response_body
    }

    /// Appends raw bytes to the response body.
    pub fn write(&mut self, bytes: &[u8]) {
        self.response_body.extend_from_slice(bytes);
    }

    /// Replaces the response body with UTF-8 text.
    pub fn text(&mut self, body: impl AsRef<str>) {
        self.response_body.clear();
        self.response_body.extend_from_slice(body.as_ref().as_bytes());
        self.response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
    }

    /// Replaces the response body with `value` encoded as JSON.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> HttpResult<()> {
        self.response_body.clear();
        serde_json::to_writer((&mut self.response_body).writer(), value)?;
        self.response_headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        Ok(())
    }

    /// Redirects to `location`.
    pub fn redirect(&mut self, location: &str, status: StatusCode) -> HttpResult<()> {
        let value = HeaderValue::from_str(location)
            .map_err(|e| HttpError::internal("invalid redirect location").with_source(e))?;
        self.status = status;
        self.response_headers.insert(header::LOCATION, value);
        self.response_body.clear();
        Ok(())
    }

    /// Writes `err` as a JSON error envelope.
    pub fn error(&mut self, err: &HttpError) {
        let request_id = self.request_id().map(|id| id.to_string());
        let envelope = err.to_envelope(request_id.as_deref());
        self.status = err.status();
        if self.json(&envelope).is_err() {
            self.text(err.message());
        }
        if err.status().is_server_error() {
            tracing::error!(status = err.status().as_u16(), error = ?err, "request failed");
        } else {
            tracing::debug!(status = err.status().as_u16(), error = %err, "request rejected");
        }
    }

    /// Moves the response out of the context.
    ///
    /// The response body buffer keeps its capacity for the next request.
    pub fn take_response(&mut self) -> Response<Full<Bytes>> {
        let body = self.response_body.split().freeze();
        let mut response = Response::new(Full::new(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = std::mem::take(&mut self.response_headers);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: Method, uri: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "198.51.100.1")
            .body(Bytes::from_static(b"{\"n\":1}"))
            .unwrap()
    }

    #[test]
    fn test_begin_loads_request() {
        let mut ctx = Context::new();
        let peer: SocketAddr = "10.0.0.1:5000".parse().unwrap();
        ctx.begin(request(Method::POST, "/items/7?full=1"), Some(peer), &ProxyOptions::trust_all());

        assert_eq!(ctx.method(), Method::POST);
        assert_eq!(ctx.path(), "/items/7");
        assert_eq!(ctx.query(), Some("full=1"));
        assert_eq!(ctx.remote_addr(), Some(peer));
        assert_eq!(ctx.client_ip(), Some("198.51.100.1".parse().unwrap()));
        assert_eq!(ctx.header("x-forwarded-for"), Some("198.51.100.1"));

        #[derive(serde::Deserialize)]
        struct Body {
            n: u32,
        }
        assert_eq!(ctx.body_json::<Body>().unwrap().n, 1);
    }

    #[test]
    fn test_strip_path_prefix() {
        let mut ctx = Context::new();
        ctx.begin(request(Method::GET, "/api/users"), None, &ProxyOptions::default());
        assert!(!ctx.strip_path_prefix("/ap"));
        assert_eq!(ctx.path(), "/api/users");
        assert!(ctx.strip_path_prefix("/api"));
        assert_eq!(ctx.path(), "/users");

        ctx.begin(request(Method::GET, "/api"), None, &ProxyOptions::default());
        assert!(ctx.strip_path_prefix("/api"));
        assert_eq!(ctx.path(), "/");
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = Context::new();
        ctx.begin(request(Method::PUT, "/x"), None, &ProxyOptions::default());
        ctx.routing_parts().2.push("id", "1");
        ctx.set_route_pattern(Arc::from("/x"));
        ctx.set_status(StatusCode::ACCEPTED);
        ctx.text("body");
        ctx.extensions_mut().insert(RequestId::new());

        ctx.reset();
        assert_eq!(ctx.method(), Method::GET);
        assert_eq!(ctx.path(), "/");
        assert!(ctx.params().is_empty());
        assert!(ctx.route_pattern().is_none());
        assert_eq!(ctx.status(), StatusCode::OK);
        assert!(ctx.response_body().is_empty());
        assert!(ctx.response_headers().is_empty());
        assert!(ctx.headers().is_empty());
        assert!(ctx.body().is_empty());
        assert!(ctx.request_id().is_none());
    }

    #[test]
    fn test_json_and_take_response() {
        let mut ctx = Context::new();
        ctx.set_status(StatusCode::CREATED);
        ctx.json(&serde_json::json!({"id": 7})).unwrap();
        ctx.set_header("x-trace", "abc").unwrap();

        let response = ctx.take_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()["x-trace"], "abc");
        assert!(ctx.response_body().is_empty());
    }

    #[test]
    fn test_error_envelope_includes_request_id() {
        let mut ctx = Context::new();
        let id = RequestId::new();
        ctx.extensions_mut().insert(id);
        ctx.error(&HttpError::not_found("no such user"));

        assert_eq!(ctx.status(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = serde_json::from_slice(ctx.response_body()).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["request_id"], id.to_string());
    }

    #[test]
    fn test_redirect_rejects_invalid_location() {
        let mut ctx = Context::new();
        assert!(ctx.redirect("/ok", StatusCode::FOUND).is_ok());
        assert_eq!(ctx.response_headers()["location"], "/ok");
        assert!(ctx.redirect("/bad\nheader", StatusCode::FOUND).is_err());
    }

    #[test]
    fn test_request_id_parses() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }
}
