//! Typed configuration for Daedalus applications.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`PREFIX__SECTION__KEY`)
//! - Strict parsing: unknown fields are errors
//! - Layered loading: defaults → file → environment
//!
//! # Configuration File Format
//!
//! ```toml
//! environment = "production"
//! name = "orders"
//! version = "1.4.2"
//!
//! [server]
//! address = "0.0.0.0"
//! port = 3000
//! path = "/api"
//! http2 = true
//! shutdown_timeout_secs = 30
//! max_body_bytes = 4194304
//!
//! [router]
//! redirect_trailing_slash = true
//! redirect_fixed_path = true
//! handle_method_not_allowed = true
//! handle_options = true
//! save_matched_route_path = true
//!
//! [proxy]
//! mode = "list"
//! trusted = ["10.0.0.0/8", "::1"]
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! include_location = false
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::DaedalusConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LoggingSection, ProxyMode, ProxySection, RouterSection, ServerSection};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_example_parses() {
        let toml = r#"
            environment = "production"
            name = "orders"
            version = "1.4.2"

            [server]
            address = "0.0.0.0"
            port = 3000
            path = "/api"

            [proxy]
            mode = "list"
            trusted = ["10.0.0.0/8", "::1"]

            [logging]
            level = "info"
            format = "json"
        "#;
        let config = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.version.as_deref(), Some("1.4.2"));
        assert_eq!(config.router_options().unwrap().base_path(), "/api");
    }
}
