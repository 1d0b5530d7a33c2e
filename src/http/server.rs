//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the dispatch handler
//! - Wire up middleware (request ID, telemetry, panic containment)
//! - Bind server to listener
//! - Dispatch requests to the routing table's forwarders

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
};

use crate::config::{ObservabilityConfig, ProxyConfig};
use crate::http::request::UuidRequestId;
use crate::http::telemetry::{LogSink, TelemetryLayer, TelemetrySink};
use crate::routing::RoutingTable;

/// HTTP server for the proxy.
#[derive(Debug)]
pub struct HttpServer {
    router: Router,
    table: Arc<RoutingTable>,
}

impl HttpServer {
    /// Create a new HTTP server logging telemetry through `tracing`.
    pub fn new(config: &ProxyConfig, table: RoutingTable) -> Self {
        Self::with_sink(config, table, Arc::new(LogSink))
    }

    /// Create a new HTTP server with a custom telemetry sink.
    pub fn with_sink(
        config: &ProxyConfig,
        table: RoutingTable,
        sink: Arc<dyn TelemetrySink>,
    ) -> Self {
        let table = Arc::new(table);
        let router = Self::build_router(&config.observability, table.clone(), sink);
        Self { router, table }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers, outermost first: request ID assignment, request ID echo,
    /// telemetry, panic containment, dispatch.
    fn build_router(
        config: &ObservabilityConfig,
        table: Arc<RoutingTable>,
        sink: Arc<dyn TelemetrySink>,
    ) -> Router {
        let router = Router::new()
            .fallback(dispatch)
            .with_state(table)
            .layer(CatchPanicLayer::new())
            .layer(TelemetryLayer::new(sink));

        if config.request_ids {
            router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
        } else {
            router
        }
    }

    /// The composed handler, for serving or driving directly.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Serves until the process is terminated.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Listening on {}", addr);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app).await
    }
}

/// Look up the route for the request path and forward.
async fn dispatch(State(table): State<Arc<RoutingTable>>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_owned();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    match table.match_path(&path) {
        Some(matched) => {
            matched
                .route
                .forwarder()
                .forward(request, matched.remainder, peer)
                .await
        }
        None => {
            tracing::debug!(path = %path, "No route matched");
            (StatusCode::NOT_FOUND, "404 page not found").into_response()
        }
    }
}
