//! The application: metadata, route registration and lifecycle.

use std::time::Duration;

use daedalus_config::DaedalusConfig;
use daedalus_core::{ContextPool, Environment, Handler, RouterOptions};
use daedalus_middleware::{Chain, Middleware};
use daedalus_router::{RouteTable, Router};
use daedalus_telemetry::LogConfig;
use http::Method;

use crate::background::Background;
use crate::error::AppError;

const DEFAULT_NAME: &str = "Daedalus";

/// Listener settings used by [`App::start`] and [`App::serve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// `address:port` for [`App::start`].
    pub bind_addr: String,
    /// Accept HTTP/2 as well as HTTP/1.1.
    pub http2: bool,
    /// How long to wait for open connections after [`App::stop`].
    pub shutdown_timeout: Duration,
    /// Largest accepted request body; larger bodies answer `413`.
    pub max_body_bytes: usize,
}

impl Default for ServeOptions {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            http2: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Handlers used when routing produces no match.
#[derive(Debug, Clone, Default)]
pub(crate) struct Fallbacks {
    pub(crate) not_found: Option<Handler>,
    pub(crate) method_not_allowed: Option<Handler>,
}

/// A Daedalus application.
///
/// Routes are registered through `&mut self`; the first call to
/// [`App::dispatch`], [`App::start`] or [`App::serve`] freezes the router,
/// after which registration fails with [`RouteError::Frozen`].
///
/// [`RouteError::Frozen`]: daedalus_router::RouteError::Frozen
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use daedalus_core::Handler;
/// use daedalus_server::App;
///
/// # tokio_test::block_on(async {
/// let mut app = App::new();
/// app.get("/users/:id", Handler::sync(|ctx| {
///     let id = ctx.param("id").unwrap_or_default().to_owned();
///     ctx.text(id);
/// }))
/// .unwrap();
///
/// let request = http::Request::get("/users/42").body(Bytes::new()).unwrap();
/// let response = app.dispatch(request, None).await;
/// assert_eq!(response.status(), 200);
/// # });
/// ```
#[derive(Debug)]
pub struct App {
    name: Option<String>,
    version: String,
    built_with: String,
    env: Environment,

    pub(crate) router: Router<Handler>,
    middlewares: Chain,
    pub(crate) fallbacks: Fallbacks,
    pub(crate) options: RouterOptions,
    pub(crate) pool: ContextPool,

    pub(crate) background: Background,
    pub(crate) serve: ServeOptions,
    pub(crate) logging: LogConfig,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Creates an application with default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: None,
            version: String::new(),
            built_with: String::new(),
            env: Environment::default(),
            router: Router::new(),
            middlewares: Chain::new(),
            fallbacks: Fallbacks::default(),
            options: RouterOptions::default(),
            pool: ContextPool::new(),
            background: Background::new(),
            serve: ServeOptions::default(),
            logging: LogConfig::default(),
        }
    }

    /// Creates an application from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the router options cannot be built.
    pub fn from_config(config: &DaedalusConfig) -> Result<Self, AppError> {
        let mut app = Self::new();
        app.env = config.environment;
        app.name.clone_from(&config.name);
        if let Some(version) = &config.version {
            app.version.clone_from(version);
        }
        app.options = config.router_options()?;
        app.serve = ServeOptions {
            bind_addr: config.server.bind_addr(),
            http2: config.server.http2,
            shutdown_timeout: config.shutdown_timeout(),
            max_body_bytes: config.server.max_body_bytes,
        };
        app.logging = config.log_config();
        Ok(app)
    }

    // ----- metadata -----

    /// Sets the name shown in the startup banner.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// Returns the application name, `Daedalus` unless set.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Sets the version and the toolchain it was built with.
    pub fn set_version(&mut self, version: impl Into<String>, built_with: impl Into<String>) {
        self.version = version.into();
        self.built_with = built_with.into();
    }

    /// Returns the application version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the build description passed to [`App::set_version`].
    #[must_use]
    pub fn built_with(&self) -> &str {
        &self.built_with
    }

    /// `"<name> server <version> (built with <built_with>)"`, without the
    /// parenthesis when no build description is set.
    #[must_use]
    pub fn banner(&self) -> String {
        let mut banner = format!("{} server", self.name());
        if !self.version.is_empty() {
            banner.push(' ');
            banner.push_str(&self.version);
        }
        if !self.built_with.is_empty() {
            banner.push_str(" (built with ");
            banner.push_str(&self.built_with);
            banner.push(')');
        }
        banner
    }

    /// Returns the deployment environment.
    #[must_use]
    pub fn env(&self) -> Environment {
        self.env
    }

    /// Sets the deployment environment.
    pub fn set_env(&mut self, env: Environment) {
        self.env = env;
    }

    // ----- options -----

    /// Returns the dispatch options.
    #[must_use]
    pub fn router_options(&self) -> &RouterOptions {
        &self.options
    }

    /// Returns the dispatch options for modification.
    pub fn router_options_mut(&mut self) -> &mut RouterOptions {
        &mut self.options
    }

    /// Returns the listener settings.
    #[must_use]
    pub fn serve_options(&self) -> &ServeOptions {
        &self.serve
    }

    /// Returns the listener settings for modification.
    pub fn serve_options_mut(&mut self) -> &mut ServeOptions {
        &mut self.serve
    }

    /// Replaces the logging setup installed by [`App::start`].
    pub fn set_log_config(&mut self, config: LogConfig) {
        self.logging = config;
    }

    /// Returns the request context pool.
    #[must_use]
    pub fn context_pool(&self) -> &ContextPool {
        &self.pool
    }

    // ----- lifecycle -----

    /// Returns the background scope cancelled by [`App::stop`].
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Cancels the background scope, which stops a running server.
    ///
    /// Calling this more than once has no further effect.
    pub fn stop(&self) {
        self.background.cancel();
    }

    /// Returns true once the router is read-only.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.router.is_frozen()
    }

    // ----- registration -----

    /// Adds a middleware that wraps every route registered after this call.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Frozen`] once the router is frozen.
    pub fn use_middleware(&mut self, middleware: Middleware) -> Result<(), AppError> {
        if self.is_frozen() {
            return Err(AppError::frozen(format!("middleware `{}`", middleware.name())));
        }
        if !self.router.routes().is_empty() {
            tracing::warn!(
                middleware = middleware.name(),
                routes = self.router.routes().len(),
                "middleware added after routes only applies to routes registered later"
            );
        }
        self.middlewares.push(middleware);
        Ok(())
    }

    /// Registers `handler` for `method` and `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Route`] for an invalid, duplicate or conflicting
    /// pattern, or once the router is frozen.
    pub fn route(&mut self, method: Method, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route_with(method, pattern, handler, &[])
    }

    /// Registers `handler` wrapped in route-specific `middlewares`, which run
    /// inside the application-wide ones.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn route_with(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        middlewares: &[Middleware],
    ) -> Result<(), AppError> {
        let composed = self.middlewares.compose(middlewares, handler);
        self.router.insert(&method, pattern, composed)?;
        Ok(())
    }

    /// Registers a `GET` route.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a `POST` route.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a `PUT` route.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a `PATCH` route.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn patch(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Registers a `DELETE` route.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Registers a `HEAD` route.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn head(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::HEAD, pattern, handler)
    }

    /// Registers an `OPTIONS` route, which takes precedence over automatic
    /// `OPTIONS` answers for its path.
    ///
    /// # Errors
    ///
    /// Same as [`App::route`].
    pub fn options(&mut self, pattern: &str, handler: Handler) -> Result<(), AppError> {
        self.route(Method::OPTIONS, pattern, handler)
    }

    /// Replaces the default `404` response.
    ///
    /// The handler is wrapped by the application middlewares added so far.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Frozen`] once the router is frozen.
    pub fn set_not_found(&mut self, handler: Handler) -> Result<(), AppError> {
        if self.is_frozen() {
            return Err(AppError::frozen("not-found handler"));
        }
        self.fallbacks.not_found = Some(self.middlewares.compose(&[], handler));
        Ok(())
    }

    /// Replaces the default `405` response. The `Allow` header is set before
    /// the handler runs.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Frozen`] once the router is frozen.
    pub fn set_method_not_allowed(&mut self, handler: Handler) -> Result<(), AppError> {
        if self.is_frozen() {
            return Err(AppError::frozen("method-not-allowed handler"));
        }
        self.fallbacks.method_not_allowed = Some(self.middlewares.compose(&[], handler));
        Ok(())
    }

    /// Returns every registered `(method, pattern)` pair, grouped per method
    /// in first-registration order.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        self.router.routes()
    }
}

#[cfg(test)]
mod tests {
    use daedalus_router::RouteError;

    use super::*;

    fn noop() -> Handler {
        Handler::sync(|_ctx| {})
    }

    #[test]
    fn test_metadata_defaults() {
        let app = App::new();
        assert_eq!(app.name(), "Daedalus");
        assert_eq!(app.version(), "");
        assert_eq!(app.env(), Environment::Production);
        assert_eq!(app.banner(), "Daedalus server");
    }

    #[test]
    fn test_banner() {
        let mut app = App::new();
        app.set_name("Orders");
        app.set_version("1.2.0", "rustc 1.84");
        assert_eq!(app.banner(), "Orders server 1.2.0 (built with rustc 1.84)");

        app.set_version("1.2.1", "");
        assert_eq!(app.banner(), "Orders server 1.2.1");
    }

    #[test]
    fn test_routes_grouped_per_method() {
        let mut app = App::new();
        app.get("/a", noop()).unwrap();
        app.post("/a", noop()).unwrap();
        app.get("/b", noop()).unwrap();
        app.route(Method::from_bytes(b"PURGE").unwrap(), "/cache", noop())
            .unwrap();

        let pairs: Vec<(String, String)> = app
            .routes()
            .iter()
            .map(|(m, p)| (m.to_string(), p.to_string()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("GET".to_string(), "/a".to_string()),
                ("GET".to_string(), "/b".to_string()),
                ("POST".to_string(), "/a".to_string()),
                ("PURGE".to_string(), "/cache".to_string()),
            ]
        );
    }

    #[test]
    fn test_registration_errors_surface() {
        let mut app = App::new();
        app.get("/users/:id", noop()).unwrap();
        assert!(matches!(
            app.get("/users/:id", noop()),
            Err(AppError::Route(RouteError::Duplicate { .. }))
        ));
        assert!(matches!(
            app.get("/users/:name/posts", noop()),
            Err(AppError::Route(RouteError::Conflict { .. }))
        ));
        assert!(matches!(
            app.get("users", noop()),
            Err(AppError::Route(RouteError::InvalidPattern { .. }))
        ));
    }

    #[test]
    fn test_frozen_rejects_changes() {
        let mut app = App::new();
        app.get("/", noop()).unwrap();
        app.router.freeze();

        assert!(matches!(
            app.get("/late", noop()),
            Err(AppError::Route(RouteError::Frozen { .. }))
        ));
        assert!(matches!(
            app.use_middleware(daedalus_middleware::stages::access_log()),
            Err(AppError::Frozen { .. })
        ));
        assert!(matches!(app.set_not_found(noop()), Err(AppError::Frozen { .. })));
    }

    #[test]
    fn test_from_config() {
        let mut config = DaedalusConfig::development();
        config.name = Some("billing".to_string());
        config.version = Some("3.1".to_string());
        config.server.port = 8088;
        config.server.path = "/billing".to_string();
        config.server.http2 = false;

        let app = App::from_config(&config).unwrap();
        assert_eq!(app.name(), "billing");
        assert_eq!(app.version(), "3.1");
        assert!(app.env().is_development());
        assert_eq!(app.router_options().base_path(), "/billing");
        assert_eq!(app.serve_options().bind_addr, "0.0.0.0:8088");
        assert!(!app.serve_options().http2);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let app = App::new();
        app.stop();
        app.stop();
        assert!(app.background().is_cancelled());
    }
}
