//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate proxy mappings
//! - Build the routing table and HTTP server
//! - Start the optional metrics endpoint
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use metrics_exporter_prometheus::BuildError;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::{load_mappings, ConfigError, ProxyConfig};
use crate::http::HttpServer;
use crate::observability::metrics;
use crate::routing::RoutingTable;

/// Errors that abort the process before serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no proxy specified")]
    NoProxies,

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Resolve mappings and build the server without binding anything.
pub fn build_server(config: &ProxyConfig) -> Result<HttpServer, StartupError> {
    let mappings = load_mappings(&config.sources)?;
    if mappings.is_empty() {
        return Err(StartupError::NoProxies);
    }

    for mapping in &mappings {
        tracing::info!(
            subpath = %mapping.subpath,
            upstream = %mapping.upstream,
            "Proxying: {}",
            mapping
        );
    }

    let table = RoutingTable::build(mappings);
    Ok(HttpServer::new(config, table))
}

/// Start the proxy and serve until the process is terminated.
pub async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    let server = build_server(&config)?;

    if let Some(addr) = config.observability.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let address = config.listener.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.clone(),
            source,
        })?;

    server.run(listener).await.map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(descriptors: &[&str]) -> ProxyConfig {
        let mut config = ProxyConfig::default();
        config.sources.config_file = "/nonexistent/proxyutil/.proxies".into();
        config.sources.descriptors = descriptors.iter().map(|d| d.to_string()).collect();
        config
    }

    #[test]
    fn test_no_proxies_is_an_error() {
        assert!(matches!(build_server(&config(&[])), Err(StartupError::NoProxies)));
    }

    #[test]
    fn test_malformed_descriptor_aborts() {
        let err = build_server(&config(&["/ok:http://a", "broken"])).unwrap_err();
        assert_eq!(err.to_string(), "invalid proxy: broken");
    }

    #[test]
    fn test_builds_table() {
        let server = build_server(&config(&["/a:http://a", "/b:http://b", "/a:http://c"])).unwrap();
        assert_eq!(server.table().len(), 2);
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = config(&["/a:http://a"]);
        config.listener.host = "127.0.0.1".into();
        config.listener.port = taken.local_addr().unwrap().port();

        let err = run(config).await.unwrap_err();
        assert!(matches!(err, StartupError::Bind { .. }));
    }
}
