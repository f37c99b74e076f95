//! Request builders bound to an application.

use bytes::Bytes;
use daedalus_server::App;
use http::Method;
use serde::Serialize;
use std::net::SocketAddr;
use tracing::instrument::WithSubscriber;
use tracing::Dispatch;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Sends requests to an [`App`] without a network connection.
///
/// Requests run through [`App::dispatch`], so the router is frozen by the
/// first one sent.
#[must_use]
#[derive(Debug, Clone)]
pub struct TestClient<'a> {
    app: &'a App,
    default_headers: Vec<(String, String)>,
    subscriber: Option<Dispatch>,
}

impl<'a> TestClient<'a> {
    /// Creates a client for `app`.
    pub fn new(app: &'a App) -> Self {
        Self {
            app,
            default_headers: Vec::new(),
            subscriber: None,
        }
    }

    /// Routes events emitted while handling requests to `subscriber`.
    pub(crate) fn with_subscriber(mut self, subscriber: Dispatch) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::DELETE, uri)
    }

    /// Starts an `OPTIONS` request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a `HEAD` request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        self.request(Method::HEAD, uri)
    }

    /// Starts a request with any method, including extension verbs.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'a> {
        let builder = self
            .default_headers
            .iter()
            .fold(TestRequestBuilder::new(method, uri), |builder, (name, value)| {
                builder.header(name, value)
            });
        TestClientRequest {
            app: self.app,
            builder,
            subscriber: self.subscriber.clone(),
        }
    }
}

/// Dispatches a built request and buffers the response.
pub(crate) async fn execute(
    app: &App,
    request: TestRequest,
    subscriber: Option<&Dispatch>,
) -> Result<TestResponse, TestError> {
    let dispatched = app.dispatch(request.request, request.remote_addr);
    let response = match subscriber {
        Some(subscriber) => dispatched.with_subscriber(subscriber.clone()).await,
        None => dispatched.await,
    };
    TestResponse::from_http(response).await
}

/// A request under construction, bound to a [`TestClient`]'s application.
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    app: &'a App,
    builder: TestRequestBuilder,
    subscriber: Option<Dispatch>,
}

impl TestClientRequest<'_> {
    /// Sets a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Appends a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.builder = self.builder.query(name, value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a plain text body.
    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.builder = self.builder.text(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets the peer address.
    pub fn remote_addr(mut self, addr: SocketAddr) -> Self {
        self.builder = self.builder.remote_addr(addr);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built; use [`Self::try_send`] to
    /// inspect the error instead.
    pub async fn send(self) -> TestResponse {
        self.try_send().await.expect("test request should be valid")
    }

    /// Sends the request, returning build and body errors.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        execute(self.app, request, self.subscriber.as_ref()).await
    }
}

#[cfg(test)]
mod tests {
    use daedalus_core::Handler;
    use http::StatusCode;
    use serde_json::json;

    use super::*;

    fn echo_app() -> App {
        let mut app = App::new();
        let echo = Handler::sync(|ctx| {
            let body = json!({
                "method": ctx.method().as_str(),
                "path": ctx.path(),
                "query": ctx.query(),
                "custom": ctx.header("x-custom"),
                "body": String::from_utf8_lossy(ctx.body()),
            });
            let _ = ctx.json(&body);
        });
        for method in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
            Method::HEAD,
        ] {
            app.route(method, "/echo", echo.clone()).unwrap();
        }
        app
    }

    #[tokio::test]
    async fn test_all_verbs() {
        let app = echo_app();
        let client = TestClient::new(&app);

        for (response, method) in [
            (client.get("/echo").send().await, "GET"),
            (client.post("/echo").send().await, "POST"),
            (client.put("/echo").send().await, "PUT"),
            (client.patch("/echo").send().await, "PATCH"),
            (client.delete("/echo").send().await, "DELETE"),
            (client.options("/echo").send().await, "OPTIONS"),
            (client.head("/echo").send().await, "HEAD"),
        ] {
            response
                .assert_status(StatusCode::OK)
                .assert_json_field("method", &json!(method));
        }
    }

    #[tokio::test]
    async fn test_headers_query_and_body() {
        let app = echo_app();
        let client = TestClient::new(&app).with_default_header("x-custom", "from-default");

        let response = client
            .post("/echo")
            .query("page", "2")
            .text("hello")
            .send()
            .await;
        response
            .assert_json_field("query", &json!("page=2"))
            .assert_json_field("custom", &json!("from-default"))
            .assert_json_field("body", &json!("hello"));

        let response = client.get("/echo").header("x-custom", "override").send().await;
        response.assert_json_field("custom", &json!("override"));
    }

    #[tokio::test]
    async fn test_try_send_reports_build_errors() {
        let app = echo_app();
        let result = TestClient::new(&app)
            .get("/echo")
            .header("bad header", "x")
            .try_send()
            .await;
        assert!(matches!(result, Err(TestError::InvalidHeader(_))));
    }
}
