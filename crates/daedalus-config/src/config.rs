//! The top-level [`DaedalusConfig`].

use std::time::Duration;

use daedalus_core::{Environment, ProxyOptions, RouterOptions, TrustedRange};
use daedalus_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LoggingSection, ProxyMode, ProxySection, RouterSection, ServerSection};

/// Complete application configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use daedalus_config::DaedalusConfig;
///
/// let config = DaedalusConfig::default();
/// assert_eq!(config.server.port, 3000);
/// assert!(config.environment.is_production());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct DaedalusConfig {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,

    /// Application name shown in the startup banner.
    #[serde(default)]
    pub name: Option<String>,

    /// Application version shown in the startup banner.
    #[serde(default)]
    pub version: Option<String>,

    /// Listener settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Dispatch switches.
    #[serde(default)]
    pub router: RouterSection,

    /// Reverse proxy trust.
    #[serde(default)]
    pub proxy: ProxySection,

    /// Logging.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl DaedalusConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if:
    /// - the port is zero or the bind address is empty
    /// - `server.path` is not empty and not an absolute path without
    ///   parameters
    /// - `server.max_body_bytes` is zero
    /// - the log level is not a valid filter directive
    /// - a trusted proxy entry is not an address or CIDR block, or the list
    ///   is empty in `list` mode
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.address.trim().is_empty() {
            return Err(ConfigError::invalid_value("server.address", "must not be empty"));
        }
        if self.server.port == 0 {
            return Err(ConfigError::invalid_value("server.port", "must be between 1 and 65535"));
        }
        validate_base_path(&self.server.path)?;
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::invalid_value(
                "server.max_body_bytes",
                "must be greater than zero",
            ));
        }

        if self.logging.enabled {
            daedalus_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        if self.proxy.mode == ProxyMode::List && self.proxy.trusted.is_empty() {
            return Err(ConfigError::invalid_value(
                "proxy.trusted",
                "must not be empty when mode is 'list'",
            ));
        }
        self.trusted_ranges()?;

        Ok(())
    }

    /// Development preset: pretty debug logging with source locations.
    ///
    /// ```
    /// use daedalus_config::DaedalusConfig;
    ///
    /// let config = DaedalusConfig::development();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Development;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON logging at `info`.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Production;
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }

    /// Builds the router options described by the `[server]`, `[router]`
    /// and `[proxy]` sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for an unparsable trusted range.
    pub fn router_options(&self) -> Result<RouterOptions, ConfigError> {
        let proxy = match self.proxy.mode {
            ProxyMode::None => ProxyOptions::default(),
            ProxyMode::All => ProxyOptions::trust_all(),
            ProxyMode::List => ProxyOptions::trust_listed(self.trusted_ranges()?),
        };

        let mut options = RouterOptions::default();
        options.save_matched_route_path = self.router.save_matched_route_path;
        options.redirect_trailing_slash = self.router.redirect_trailing_slash;
        options.redirect_fixed_path = self.router.redirect_fixed_path;
        options.handle_method_not_allowed = self.router.handle_method_not_allowed;
        options.handle_options = self.router.handle_options;
        options.proxy = proxy;
        Ok(options.with_base_path(&self.server.path))
    }

    /// Builds the logging setup described by `[logging]`.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        let preset = match self.logging.format {
            LogFormat::Json => LogConfig::production(),
            LogFormat::Pretty => LogConfig::development(),
        };
        LogConfig {
            enabled: self.logging.enabled,
            level: self.logging.level.clone(),
            format: self.logging.format,
            include_location: self.logging.include_location,
            ..preset
        }
    }

    /// Graceful shutdown budget.
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.server.shutdown_timeout_secs)
    }

    fn trusted_ranges(&self) -> Result<Vec<TrustedRange>, ConfigError> {
        self.proxy
            .trusted
            .iter()
            .map(|entry| {
                entry
                    .parse::<TrustedRange>()
                    .map_err(|e| ConfigError::invalid_value("proxy.trusted", e.to_string()))
            })
            .collect()
    }
}

fn validate_base_path(path: &str) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Ok(());
    }
    if !path.starts_with('/') {
        return Err(ConfigError::invalid_value("server.path", "must start with '/'"));
    }
    if path.contains("//") {
        return Err(ConfigError::invalid_value("server.path", "must not contain empty segments"));
    }
    if path.split('/').any(|s| s.starts_with(':') || s.starts_with('*')) {
        return Err(ConfigError::invalid_value(
            "server.path",
            "must not contain parameters or wildcards",
        ));
    }
    if path.contains(['?', '#']) {
        return Err(ConfigError::invalid_value(
            "server.path",
            "must not contain a query or fragment",
        ));
    }
    Ok(())
}
