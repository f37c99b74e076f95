//! Configuration sections.

use daedalus_telemetry::LogFormat;
use serde::{Deserialize, Serialize};

/// HTTP listener settings.
///
/// # Example
///
/// ```
/// use daedalus_config::ServerSection;
///
/// let server = ServerSection {
///     port: 8080,
///     path: "/api".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(server.bind_addr(), "0.0.0.0:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Interface to bind.
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base path all routes are served under; empty for none.
    #[serde(default)]
    pub path: String,

    /// Accept HTTP/2 in addition to HTTP/1.1.
    #[serde(default = "default_true")]
    pub http2: bool,

    /// How long to wait for open connections on shutdown.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl ServerSection {
    /// `address:port`, with IPv6 literals bracketed.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            path: String::new(),
            http2: true,
            shutdown_timeout_secs: default_shutdown_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_shutdown_timeout() -> u64 {
    30
}

fn default_max_body_bytes() -> usize {
    4 * 1024 * 1024
}

/// Dispatch behaviour switches.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RouterSection {
    /// Redirect `/a/` to `/a` (and back) when only the other form exists.
    #[serde(default = "default_true")]
    pub redirect_trailing_slash: bool,

    /// Redirect to the cleaned, case-corrected path when it exists.
    #[serde(default = "default_true")]
    pub redirect_fixed_path: bool,

    /// Answer `405` with `Allow` when another method matches.
    #[serde(default = "default_true")]
    pub handle_method_not_allowed: bool,

    /// Answer `OPTIONS` automatically.
    #[serde(default = "default_true")]
    pub handle_options: bool,

    /// Record the matched pattern on the request context.
    #[serde(default = "default_true")]
    pub save_matched_route_path: bool,
}

impl Default for RouterSection {
    fn default() -> Self {
        Self {
            redirect_trailing_slash: true,
            redirect_fixed_path: true,
            handle_method_not_allowed: true,
            handle_options: true,
            save_matched_route_path: true,
        }
    }
}

/// Which peers may set forwarding headers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Ignore forwarding headers.
    #[default]
    None,
    /// Trust every peer.
    All,
    /// Trust peers in [`ProxySection::trusted`].
    List,
}

/// Reverse proxy trust.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProxySection {
    /// Trust mode.
    #[serde(default)]
    pub mode: ProxyMode,

    /// Addresses or CIDR blocks, used when `mode = "list"`.
    #[serde(default)]
    pub trusted: Vec<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (trace, debug, info, warn, error or per-target).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Include source file and line in logs.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_section_default() {
        let server = ServerSection::default();
        assert_eq!(server.address, "0.0.0.0");
        assert_eq!(server.port, 3000);
        assert_eq!(server.path, "");
        assert!(server.http2);
        assert_eq!(server.shutdown_timeout_secs, 30);
        assert_eq!(server.max_body_bytes, 4_194_304);
    }

    #[test]
    fn test_server_section_partial() {
        let server: ServerSection = toml::from_str("port = 8080\npath = \"/v1\"").unwrap();
        assert_eq!(server.port, 8080);
        assert_eq!(server.path, "/v1");
        assert_eq!(server.address, "0.0.0.0");
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(toml::from_str::<ServerSection>("prot = 8080").is_err());
        assert!(toml::from_str::<RouterSection>("redirect_slash = false").is_err());
    }

    #[test]
    fn test_bind_addr_brackets_ipv6() {
        let server = ServerSection {
            address: "::1".to_string(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(server.bind_addr(), "[::1]:9000");
    }

    #[test]
    fn test_router_section_default_all_on() {
        let router = RouterSection::default();
        assert!(router.redirect_trailing_slash);
        assert!(router.redirect_fixed_path);
        assert!(router.handle_method_not_allowed);
        assert!(router.handle_options);
        assert!(router.save_matched_route_path);
    }

    #[test]
    fn test_proxy_mode_deserialize() {
        let proxy: ProxySection =
            toml::from_str("mode = \"list\"\ntrusted = [\"10.0.0.0/8\"]").unwrap();
        assert_eq!(proxy.mode, ProxyMode::List);
        assert_eq!(proxy.trusted, vec!["10.0.0.0/8"]);
        assert!(toml::from_str::<ProxySection>("mode = \"some\"").is_err());
    }
}
