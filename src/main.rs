//! cgi-devserver
//!
//! A development HTTP server that runs CGI scripts.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ axum::serve ──▶ dispatch ──▶ RouteTable (first match)
//!                                 │
//!            ┌────────────────────┼─────────────────────┐
//!            ▼                    ▼                     ▼
//!       CGI gateway          static file              404
//!   env → spawn → parse     tokio::fs + mime
//!            │
//!            ▼
//!   Status / headers / body ──▶ Client
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use cgi_devserver::config::{Cli, ConfigWatcher, Settings};
use cgi_devserver::observability::{logging, metrics};
use cgi_devserver::HttpServer;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config errors are fatal: the server does not start.
    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("cgi-devserver: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&settings.config.observability.log_level);

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let config = &settings.config;

    tracing::info!(
        config = %settings.config_path.display(),
        approot = %settings.approot.display(),
        cgi = ?config.cgi.binary,
        handlers = config.handlers.len(),
        "Configuration loaded"
    );

    if let Some(address) = &config.observability.metrics_address {
        match address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    // Keep the watcher alive for the lifetime of the server.
    let (_watcher, route_updates) = if config.server.watch {
        let (watcher, updates) = ConfigWatcher::new(
            &settings.config_path,
            &settings.approot,
            config.cgi.binary.is_some(),
        );
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let server = HttpServer::new(&settings)?;

    let bind = (config.server.bind_address.as_str(), config.server.port);
    let listener = TcpListener::bind(bind).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    server.run(listener, route_updates, shutdown_signal()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
