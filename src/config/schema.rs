//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the development server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener and server identity settings.
    pub server: ServerConfig,

    /// CGI interpreter settings.
    pub cgi: CgiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Ordered handler rules; first match wins.
    pub handlers: Vec<HandlerConfig>,
}

impl AppConfig {
    /// True when at least one handler runs a CGI script.
    pub fn has_script_handlers(&self) -> bool {
        self.handlers.iter().any(|h| h.script.is_some())
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Port to listen on.
    pub port: u16,

    /// `SERVER_NAME` used when a request carries no Host.
    pub server_name: String,

    /// Application root for relative script and static paths.
    /// Relative values resolve against the config file's directory.
    pub approot: Option<PathBuf>,

    /// Reload handlers when the config file changes.
    pub watch: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            server_name: "devserver".to_string(),
            approot: None,
            watch: false,
        }
    }
}

/// CGI interpreter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CgiConfig {
    /// Interpreter executed for every script request (e.g., php-cgi).
    pub binary: Option<PathBuf>,

    /// Kill the interpreter after this many seconds. Unset = no limit.
    pub timeout_secs: Option<u64>,

    /// Upper bound for buffered interpreter output.
    pub max_output_bytes: usize,
}

impl Default for CgiConfig {
    fn default() -> Self {
        Self {
            binary: None,
            timeout_secs: None,
            max_output_bytes: 64 * 1024 * 1024, // 64MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Prometheus scrape address; metrics endpoint disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

/// A single handler rule.
///
/// Exactly one of `script` and `static_files` must be set. Both templates may
/// reference capture groups of `url` as `\1`, `\2`, ...
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct HandlerConfig {
    /// Regular expression searched for in the request URL.
    pub url: String,

    /// Script path template, run through the CGI interpreter.
    #[serde(default)]
    pub script: Option<String>,

    /// Static file path template.
    #[serde(default)]
    pub static_files: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.server_name, "devserver");
        assert_eq!(config.cgi.max_output_bytes, 64 * 1024 * 1024);
        assert!(config.cgi.binary.is_none());
        assert!(config.handlers.is_empty());
    }

    #[test]
    fn test_handlers_keep_order() {
        let config: AppConfig = toml::from_str(
            r#"
            [cgi]
            binary = "/usr/bin/php-cgi"
            timeout_secs = 10

            [[handlers]]
            url = '^/static/(.*)$'
            static_files = 'public/\1'

            [[handlers]]
            url = '^/(.*)$'
            script = 'index.php'
            "#,
        )
        .unwrap();

        assert_eq!(config.cgi.timeout_secs, Some(10));
        assert_eq!(config.handlers.len(), 2);
        assert_eq!(config.handlers[0].static_files.as_deref(), Some(r"public/\1"));
        assert_eq!(config.handlers[1].script.as_deref(), Some("index.php"));
        assert!(config.has_script_handlers());
    }
}
