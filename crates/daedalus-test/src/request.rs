//! Test request building.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request};
use serde::Serialize;

use crate::error::TestError;

/// A request ready to be dispatched by a [`TestApp`](crate::TestApp).
#[derive(Debug)]
pub struct TestRequest {
    /// The HTTP request.
    pub request: Request<Bytes>,
    /// Peer address reported to the application.
    pub remote_addr: Option<SocketAddr>,
}

/// Builder for [`TestRequest`].
///
/// Invalid input is remembered and reported by [`TestRequestBuilder::build`]
/// so calls can be chained without intermediate results.
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a builder for `method` and `uri`.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
            error: None,
        }
    }

    fn fail(&mut self, error: TestError) {
        self.error.get_or_insert(error);
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(TestError::InvalidHeader(name.to_string())),
        }
        self
    }

    /// Appends a query parameter; both parts are percent-encoded.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a plain text body and `Content-Type: text/plain`.
    pub fn text(self, body: impl Into<String>) -> Self {
        self.body(body.into())
            .header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
    }

    /// Sets a JSON body and `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self
                .body(bytes)
                .header(header::CONTENT_TYPE.as_str(), "application/json"),
            Err(e) => {
                self.fail(TestError::Json(e));
                self
            }
        }
    }

    /// Sets the peer address the request appears to come from.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Builds the request.
    pub fn build(self) -> Result<TestRequest, TestError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let mut uri = self.uri;
        if !self.query.is_empty() {
            uri.push(if uri.contains('?') { '&' } else { '?' });
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            uri.push_str(&pairs.join("&"));
        }

        let mut request = Request::builder()
            .method(self.method)
            .uri(uri)
            .body(self.body)
            .map_err(|e| TestError::RequestBuild(e.to_string()))?;
        *request.headers_mut() = self.headers;

        Ok(TestRequest {
            request,
            remote_addr: self.remote_addr,
        })
    }
}
