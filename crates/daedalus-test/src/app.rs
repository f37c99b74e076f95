//! The test application wrapper.

use std::ops::{Deref, DerefMut};

use bytes::Bytes;
use daedalus_config::DaedalusConfig;
use daedalus_core::{Context, Environment, ProxyOptions};
use daedalus_server::{App, AppError};
use http::Request;
use tracing::Dispatch;

use crate::client::{execute, TestClient};
use crate::error::TestError;
use crate::logs::LogCapture;
use crate::request::TestRequest;
use crate::response::TestResponse;

/// An [`App`] prepared for tests.
///
/// It trusts forwarding headers from every peer, runs in the development
/// environment and is named `Daedalus TestApp` version `1.0` unless an
/// existing app is wrapped with [`TestApp::from_app`]. It dereferences to
/// the wrapped [`App`], so routes are registered on it directly.
///
/// Events logged while the test app handles a request are recorded in
/// [`TestApp::logs`] instead of reaching the global subscriber.
#[derive(Debug)]
pub struct TestApp {
    app: App,
    logs: LogCapture,
    subscriber: Dispatch,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    /// Creates a fresh test application.
    #[must_use]
    pub fn new() -> Self {
        let mut app = App::new();
        app.set_name("Daedalus TestApp");
        app.set_version("1.0", "");
        app.set_env(Environment::Development);
        Self::from_app(app)
    }

    /// Wraps an existing application, keeping its metadata.
    #[must_use]
    pub fn from_app(mut app: App) -> Self {
        app.router_options_mut().proxy = ProxyOptions::trust_all();
        let logs = LogCapture::new();
        let subscriber = logs.dispatch();
        Self {
            app,
            logs,
            subscriber,
        }
    }

    /// Creates a test application from a loaded configuration.
    ///
    /// The environment is forced to development and every proxy is trusted.
    /// Name and version fall back to the test defaults when unset.
    pub fn from_config(config: &DaedalusConfig) -> Result<Self, AppError> {
        let mut app = App::from_config(config)?;
        if config.name.is_none() {
            app.set_name("Daedalus TestApp");
        }
        if config.version.is_none() {
            app.set_version("1.0", "");
        }
        app.set_env(Environment::Development);

        let mut test_app = Self::from_app(app);
        test_app.apply_config(config);
        Ok(test_app)
    }

    /// Mounts the application under the configured `server.path`, if any.
    pub fn apply_config(&mut self, config: &DaedalusConfig) {
        if !config.server.path.is_empty() {
            self.app
                .router_options_mut()
                .set_base_path(&config.server.path);
        }
    }

    /// Returns the events logged while handling requests.
    pub fn logs(&self) -> &LogCapture {
        &self.logs
    }

    /// Returns a client that dispatches to this application.
    pub fn client(&self) -> TestClient<'_> {
        TestClient::new(&self.app).with_subscriber(self.subscriber.clone())
    }

    /// Dispatches a built request.
    pub async fn dispatch(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        execute(&self.app, request, Some(&self.subscriber)).await
    }

    /// Runs `f` against a pooled context loaded with `GET /`.
    ///
    /// The context goes back to the pool when `f` returns, or when it
    /// panics.
    pub fn mock_context<R>(&self, f: impl FnOnce(&mut Context) -> R) -> R {
        tracing::dispatcher::with_default(&self.subscriber, || {
            let mut ctx = self.app.context_pool().acquire();
            ctx.begin(Request::new(Bytes::new()), None, &self.app.router_options().proxy);
            f(&mut *ctx)
        })
    }

    /// Returns the wrapped application.
    #[must_use]
    pub fn into_inner(self) -> App {
        self.app
    }
}

impl Deref for TestApp {
    type Target = App;

    fn deref(&self) -> &App {
        &self.app
    }
}

impl DerefMut for TestApp {
    fn deref_mut(&mut self) -> &mut App {
        &mut self.app
    }
}
