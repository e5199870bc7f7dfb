//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use cgi_devserver::config::{AppConfig, HandlerConfig, Settings};

/// Write an executable `/bin/sh` script.
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

pub fn script_handler(url: &str, script: &str) -> HandlerConfig {
    HandlerConfig {
        url: url.into(),
        script: Some(script.into()),
        static_files: None,
    }
}

pub fn static_handler(url: &str, files: &str) -> HandlerConfig {
    HandlerConfig {
        url: url.into(),
        script: None,
        static_files: Some(files.into()),
    }
}

/// Validated settings rooted at `approot`.
pub fn settings(approot: &Path, cgi: Option<PathBuf>, handlers: Vec<HandlerConfig>) -> Settings {
    let mut config = AppConfig::default();
    config.cgi.binary = cgi;
    config.handlers = handlers;
    settings_from(approot, config)
}

pub fn settings_from(approot: &Path, config: AppConfig) -> Settings {
    Settings::new(approot.join("app.toml"), approot.to_path_buf(), config).unwrap()
}

/// Send one request through the router as if it came from `remote`.
pub async fn send(
    router: Router,
    mut request: Request<Body>,
    remote: &str,
) -> (StatusCode, HeaderMap, Bytes) {
    let remote: SocketAddr = remote.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(remote));

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, body)
}

pub async fn get(router: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    send(router, Request::get(uri).body(Body::empty()).unwrap(), "127.0.0.1:40000").await
}
