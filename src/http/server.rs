//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (tracing, request ID)
//! - Dispatch each request to the CGI gateway, a static file, or 404
//! - Swap in reloaded route tables without interrupting in-flight requests

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::cgi::{CgiGateway, EnvironmentBuilder, GatewayConfig, InheritedEnv};
use crate::config::Settings;
use crate::http::request::RequestContext;
use crate::http::response::not_found;
use crate::http::static_files::serve_file;
use crate::observability::metrics;
use crate::routing::{Dispatch, RouteError, RouteTable};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<ArcSwap<RouteTable>>,
    pub gateway: Arc<CgiGateway>,
}

/// The development HTTP server.
pub struct HttpServer {
    router: Router,
    routes: Arc<ArcSwap<RouteTable>>,
}

impl HttpServer {
    /// Compile the handler list and build the router.
    pub fn new(settings: &Settings) -> Result<Self, RouteError> {
        Self::with_inherited_env(settings, InheritedEnv::capture())
    }

    /// Like [`new`](Self::new), with an explicit environment for scripts.
    pub fn with_inherited_env(
        settings: &Settings,
        inherited: InheritedEnv,
    ) -> Result<Self, RouteError> {
        let config = &settings.config;
        let table = RouteTable::compile(&config.handlers, &settings.approot)?;
        let routes = Arc::new(ArcSwap::from_pointee(table));

        let gateway = CgiGateway::new(
            GatewayConfig {
                program: config.cgi.binary.clone(),
                timeout: config.cgi.timeout_secs.map(Duration::from_secs),
                max_output_bytes: config.cgi.max_output_bytes,
            },
            EnvironmentBuilder::new(
                inherited,
                config.server.server_name.clone(),
                config.server.port,
            ),
        );

        let state = AppState {
            routes: routes.clone(),
            gateway: Arc::new(gateway),
        };

        Ok(Self {
            router: Self::build_router(state),
            routes,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The router, for serving in-process (e.g. `tower::ServiceExt::oneshot`).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Shared handle to the live route table.
    pub fn routes(&self) -> Arc<ArcSwap<RouteTable>> {
        self.routes.clone()
    }

    /// Run the server until `shutdown` resolves.
    ///
    /// Tables received on `route_updates` replace the live table atomically.
    pub async fn run<F>(
        self,
        listener: TcpListener,
        mut route_updates: mpsc::UnboundedReceiver<RouteTable>,
        shutdown: F,
    ) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            handlers = self.routes.load().len(),
            "HTTP server starting"
        );

        let routes = self.routes.clone();
        let reloader = tokio::spawn(async move {
            while let Some(table) = route_updates.recv().await {
                tracing::info!(handlers = table.len(), "Route table swapped");
                routes.store(Arc::new(table));
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let served = axum::serve(listener, app).with_graceful_shutdown(shutdown).await;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        served
    }
}

/// Catch-all handler: route match, then CGI, static file or 404.
async fn dispatch_handler(
    State(state): State<AppState>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let (parts, body) = request.into_parts();
    let context = RequestContext::from_parts(&parts, remote_addr);

    tracing::debug!(
        method = %context.method,
        url = %context.raw_url,
        remote = %remote_addr,
        "Dispatching request"
    );

    let dispatch = state.routes.load().dispatch(&context.raw_url);
    let (handler, response) = match dispatch {
        None => {
            tracing::warn!(url = %context.raw_url, "No route matched");
            ("none", not_found())
        }
        Some(Dispatch::Script(script)) => {
            let response = match state.gateway.run(&context, body, &script).await {
                Ok(cgi) => cgi.into_response(),
                Err(e) => {
                    tracing::error!(
                        script = %script.display(),
                        kind = e.kind(),
                        error = %e,
                        "CGI request failed"
                    );
                    metrics::record_gateway_error(e.kind());
                    e.into_response()
                }
            };
            ("cgi", response)
        }
        Some(Dispatch::StaticFile(path)) => ("static", serve_file(&path).await),
    };

    metrics::record_request(
        context.method.as_str(),
        response.status().as_u16(),
        handler,
        start_time,
    );
    response
}
