//! proxyutil: a path-prefix HTTP reverse-proxy multiplexer.
//!
//! Mounts each `subpath:uri` mapping on one listener and forwards matching
//! requests to the mapped upstream, logging one record per request.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use routing::{ProxyMapping, RoutingTable};
