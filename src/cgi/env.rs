//! CGI/1.1 environment construction.
//!
//! # Responsibilities
//! - Snapshot the inherited process environment once, at startup
//! - Overlay the per-request CGI meta-variables onto a fresh copy
//! - Expose every request header as `HTTP_<NAME>`
//!
//! # Design Decisions
//! - Pure: no I/O, no shared mutable state; each call returns a new map
//! - The snapshot is immutable and shared via `Arc`
//! - Repeated headers are joined into one value (`; ` for Cookie)

use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::sync::Arc;

use axum::http::header;

use crate::http::request::RequestContext;

/// `SERVER_SOFTWARE` reported to scripts.
pub const SERVER_SOFTWARE: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Read-only snapshot of the environment scripts inherit.
#[derive(Debug, Clone, Default)]
pub struct InheritedEnv {
    vars: Arc<BTreeMap<OsString, OsString>>,
}

impl InheritedEnv {
    /// Capture the current process environment.
    pub fn capture() -> Self {
        Self::from_vars(std::env::vars_os())
    }

    pub fn from_vars<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self {
            vars: Arc::new(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// The complete environment of one CGI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CgiEnvironment {
    vars: BTreeMap<OsString, OsString>,
}

impl CgiEnvironment {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(OsStr::new(key)).and_then(|v| v.to_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(OsStr::new(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OsString, &OsString)> {
        self.vars.iter()
    }

    fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }
}

/// Builds per-request environments on top of an [`InheritedEnv`].
#[derive(Debug, Clone)]
pub struct EnvironmentBuilder {
    inherited: InheritedEnv,
    default_server_name: String,
    default_server_port: u16,
}

impl EnvironmentBuilder {
    pub fn new(
        inherited: InheritedEnv,
        default_server_name: impl Into<String>,
        default_server_port: u16,
    ) -> Self {
        Self {
            inherited,
            default_server_name: default_server_name.into(),
            default_server_port,
        }
    }

    /// Build the environment for running `script` on behalf of `request`.
    pub fn build(&self, request: &RequestContext, script: &Path) -> CgiEnvironment {
        let mut env = CgiEnvironment {
            vars: (*self.inherited.vars).clone(),
        };

        let (server_name, server_port) = self.server_address(request.host.as_deref());

        env.set("REDIRECT_STATUS", "200");
        env.set("SERVER_SOFTWARE", SERVER_SOFTWARE);
        env.set("SERVER_PROTOCOL", "HTTP/1.1");
        env.set("GATEWAY_INTERFACE", "CGI/1.1");
        env.set("SCRIPT_FILENAME", script.as_os_str());
        env.set("SCRIPT_NAME", script.as_os_str());
        env.set("SERVER_NAME", server_name);
        env.set("SERVER_PORT", server_port);
        env.set("PATH_INFO", &request.pathname);
        env.set("REQUEST_METHOD", request.method.as_str());
        env.set("REQUEST_URI", &request.raw_url);
        env.set("QUERY_STRING", request.query_string.as_deref().unwrap_or(""));
        env.set("REMOTE_ADDR", request.remote_addr.ip().to_string());
        env.set("REMOTE_PORT", request.remote_addr.port().to_string());

        for name in request.headers.keys() {
            let separator = if name == header::COOKIE { "; " } else { ", " };
            let value = request
                .headers
                .get_all(name)
                .iter()
                .map(|v| String::from_utf8_lossy(v.as_bytes()))
                .collect::<Vec<_>>()
                .join(separator);

            let key = format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"));
            env.set(key, &value);

            if name == header::CONTENT_LENGTH {
                env.set("CONTENT_LENGTH", &value);
            } else if name == header::CONTENT_TYPE {
                env.set("CONTENT_TYPE", &value);
            } else if name == header::AUTHORIZATION {
                if let Some(scheme) = value.split_whitespace().next() {
                    env.set("AUTH_TYPE", scheme);
                }
            }
        }

        env
    }

    /// Split a Host value into name and port, falling back to the defaults.
    fn server_address(&self, host: Option<&str>) -> (String, String) {
        let (name, port) = match host {
            Some(host) => split_host(host),
            None => (None, None),
        };
        (
            name.map(str::to_string).unwrap_or_else(|| self.default_server_name.clone()),
            port.map(str::to_string).unwrap_or_else(|| self.default_server_port.to_string()),
        )
    }
}

/// `example.test:8000` → (`example.test`, `8000`); `[::1]:80` → (`[::1]`, `80`).
fn split_host(host: &str) -> (Option<&str>, Option<&str>) {
    let (name, port) = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => (&host[..=end], host[end + 1..].strip_prefix(':')),
            None => (host, None),
        }
    } else {
        match host.split_once(':') {
            Some((name, port)) => (name, Some(port)),
            None => (host, None),
        }
    };
    (Some(name).filter(|n| !n.is_empty()), port.filter(|p| !p.is_empty()))
}
