//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use daedalus_core::Environment;
use daedalus_telemetry::LogFormat;

use crate::{ConfigError, DaedalusConfig, ProxyMode};

/// Configuration loader with layered approach.
///
/// Later layers override earlier ones:
/// 1. Default values (or a preset)
/// 2. Configuration file (TOML or JSON)
/// 3. Environment variables (`PREFIX__SECTION__KEY`)
///
/// # Example
///
/// ```no_run
/// use daedalus_config::ConfigLoader;
///
/// # fn main() -> Result<(), daedalus_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_dotenv()
///     .with_optional_file("daedalus.toml")?
///     .with_env_prefix("DAEDALUS")
///     .load()?;
/// println!("listening on {}", config.server.bind_addr());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: DaedalusConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader starting from [`DaedalusConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert!(config.environment.is_development());
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = DaedalusConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = DaedalusConfig::production();
        self
    }

    /// Loads a file; the format follows the `.toml` or `.json` extension.
    ///
    /// The file replaces the current configuration. Sections and fields it
    /// omits take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, unreadable, malformed,
    /// has an unsupported extension or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;

        self.config = parse(&content, format)?;
        Ok(self)
    }

    /// Like [`ConfigLoader::with_file`], but a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `format` (`"toml"` or `"json"`).
    ///
    /// ```
    /// use daedalus_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nport = 8080", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    /// assert_eq!(config.server.port, 8080);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if parsing fails or the format is unknown.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, format)?;
        Ok(self)
    }

    /// Enables environment overrides under `prefix` (upper-cased).
    ///
    /// With prefix `DAEDALUS`:
    /// - `DAEDALUS__ENVIRONMENT=development`
    /// - `DAEDALUS__SERVER__PORT=8080`
    /// - `DAEDALUS__PROXY__TRUSTED=10.0.0.0/8,192.168.0.1`
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads variables from a `.env` file into the process environment if
    /// one is found.
    #[must_use]
    pub fn with_dotenv(self) -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation
    /// fails.
    pub fn load(mut self) -> Result<DaedalusConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> DaedalusConfig {
        self.config
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        let marker = format!("{prefix}__");
        let mut vars: Vec<(String, String)> =
            env::vars().filter(|(k, _)| k.starts_with(&marker)).collect();
        vars.sort();

        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let rest = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
            .ok_or_else(|| ConfigError::env_parse_error(key, "invalid key format"))?;

        let parts: Vec<&str> = rest.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["ENVIRONMENT"] => {
                config.environment = value
                    .parse::<Environment>()
                    .map_err(|e| ConfigError::env_parse_error(key, e.to_string()))?;
            }
            ["NAME"] => config.name = non_empty(value),
            ["VERSION"] => config.version = non_empty(value),

            ["SERVER", "ADDRESS"] => config.server.address = value.to_string(),
            ["SERVER", "PORT"] => config.server.port = parse_number(key, value)?,
            ["SERVER", "PATH"] => config.server.path = value.to_string(),
            ["SERVER", "HTTP2"] => config.server.http2 = parse_flag(key, value)?,
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_BYTES"] => {
                config.server.max_body_bytes = parse_number(key, value)?;
            }

            ["ROUTER", "REDIRECT_TRAILING_SLASH"] => {
                config.router.redirect_trailing_slash = parse_flag(key, value)?;
            }
            ["ROUTER", "REDIRECT_FIXED_PATH"] => {
                config.router.redirect_fixed_path = parse_flag(key, value)?;
            }
            ["ROUTER", "HANDLE_METHOD_NOT_ALLOWED"] => {
                config.router.handle_method_not_allowed = parse_flag(key, value)?;
            }
            ["ROUTER", "HANDLE_OPTIONS"] => {
                config.router.handle_options = parse_flag(key, value)?;
            }
            ["ROUTER", "SAVE_MATCHED_ROUTE_PATH"] => {
                config.router.save_matched_route_path = parse_flag(key, value)?;
            }

            ["PROXY", "MODE"] => {
                config.proxy.mode = match value.to_lowercase().as_str() {
                    "none" => ProxyMode::None,
                    "all" => ProxyMode::All,
                    "list" => ProxyMode::List,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'none', 'all' or 'list'",
                        ))
                    }
                };
            }
            ["PROXY", "TRUSTED"] => {
                config.proxy.trusted = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }

            ["LOGGING", "ENABLED"] => config.logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "INCLUDE_LOCATION"] => {
                config.logging.include_location = parse_flag(key, value)?;
            }

            _ => tracing::warn!(var = key, "ignoring unknown configuration variable"),
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<DaedalusConfig, ConfigError> {
    match format.to_lowercase().as_str() {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parse a boolean from a string.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:3000");
        assert!(config.environment.is_production());
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Pretty);

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"name": "billing", "server": {"path": "/billing"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.name.as_deref(), Some("billing"));
        assert_eq!(config.server.path, "/billing");
    }

    #[test]
    fn test_loader_unknown_format() {
        let result = ConfigLoader::new().with_string("port: 1", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ref f)) if f == "yaml"));
    }

    #[test]
    fn test_loader_unknown_field() {
        let result = ConfigLoader::new().with_string("[server]\nbase = \"/x\"", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_validation_runs_on_load() {
        let result = ConfigLoader::new()
            .with_string("[server]\npath = \"api\"", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_loader_with_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "environment = \"development\"\n[router]\nhandle_options = false").unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert!(config.environment.is_development());
        assert!(!config.router.handle_options);
        assert!(config.router.redirect_fixed_path);
    }

    #[test]
    fn test_loader_file_without_extension() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = ConfigLoader::new().with_file(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_loader_missing_files() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/daedalus.toml"),
            Err(ConfigError::FileNotFound { .. })
        ));
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/daedalus.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "True", "1", "yes", "on"] {
            assert_eq!(parse_bool(yes), Some(true));
        }
        for no in ["false", "FALSE", "0", "no", "off"] {
            assert_eq!(parse_bool(no), Some(false));
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    // Overrides are exercised through apply_env_var directly; mutating the
    // process environment requires unsafe code, which the workspace forbids.

    #[test]
    fn test_env_server_overrides() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("APP__SERVER__PORT", "8081", "APP").unwrap();
        loader.apply_env_var("APP__SERVER__PATH", "/v2", "APP").unwrap();
        loader.apply_env_var("APP__SERVER__HTTP2", "off", "APP").unwrap();
        assert_eq!(loader.config.server.port, 8081);
        assert_eq!(loader.config.server.path, "/v2");
        assert!(!loader.config.server.http2);
    }

    #[test]
    fn test_env_top_level_overrides() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("APP__ENVIRONMENT", "dev", "APP").unwrap();
        loader.apply_env_var("APP__NAME", "orders", "APP").unwrap();
        loader.apply_env_var("APP__VERSION", "", "APP").unwrap();
        assert!(loader.config.environment.is_development());
        assert_eq!(loader.config.name.as_deref(), Some("orders"));
        assert_eq!(loader.config.version, None);
    }

    #[test]
    fn test_env_proxy_overrides() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("APP__PROXY__MODE", "list", "APP").unwrap();
        loader
            .apply_env_var("APP__PROXY__TRUSTED", "10.0.0.0/8, ::1,", "APP")
            .unwrap();
        assert_eq!(loader.config.proxy.mode, ProxyMode::List);
        assert_eq!(loader.config.proxy.trusted, vec!["10.0.0.0/8", "::1"]);
        assert!(loader.config.validate().is_ok());
    }

    #[test]
    fn test_env_router_and_logging_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("APP__ROUTER__REDIRECT_FIXED_PATH", "false", "APP")
            .unwrap();
        loader.apply_env_var("APP__LOGGING__FORMAT", "pretty", "APP").unwrap();
        loader.apply_env_var("APP__LOGGING__LEVEL", "debug", "APP").unwrap();
        assert!(!loader.config.router.redirect_fixed_path);
        assert_eq!(loader.config.logging.format, LogFormat::Pretty);
        assert_eq!(loader.config.logging.level, "debug");
    }

    #[test]
    fn test_env_invalid_values() {
        let mut loader = ConfigLoader::new();
        assert!(loader.apply_env_var("APP__SERVER__PORT", "http", "APP").is_err());
        assert!(loader.apply_env_var("APP__SERVER__PORT", "70000", "APP").is_err());
        assert!(loader.apply_env_var("APP__ROUTER__HANDLE_OPTIONS", "sure", "APP").is_err());
        assert!(loader.apply_env_var("APP__PROXY__MODE", "some", "APP").is_err());
        assert!(loader.apply_env_var("APP__ENVIRONMENT", "qa", "APP").is_err());
        assert!(loader.apply_env_var("APP__UNKNOWN__KEY", "1", "APP").is_ok());
    }
}
