//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! A `ProxyConfig` is resolved once at startup and handed to the subsystems
//! that need it; nothing reads configuration from global state.

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::routing::BlankLines;

/// Default config file consulted when none is given.
pub const DEFAULT_CONFIG_FILE: &str = ".proxies";

/// Root configuration for the proxy.
#[derive(Debug, Clone, Default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Where proxy descriptors come from.
    pub sources: SourceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Host or IP to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,
}

impl ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Proxy descriptor sources.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Config file with one descriptor per line. A missing file means no entries.
    pub config_file: PathBuf,

    /// Descriptors from the command line, applied after the config file.
    pub descriptors: Vec<String>,

    /// Blank-line handling for the config file.
    pub blank_lines: BlankLines,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_FILE),
            descriptors: Vec::new(),
            blank_lines: BlankLines::Terminate,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Verbosity 0..=6 (0 panic, 1 fatal, 2 error, 3 warn, 4 info, 5 debug, 6 trace).
    pub verbosity: u8,

    pub log_format: LogFormat,

    /// Assign a UUID request ID to requests that lack one.
    pub request_ids: bool,

    /// Prometheus endpoint bind address; disabled when `None`.
    pub metrics_address: Option<SocketAddr>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            verbosity: 4,
            log_format: LogFormat::Text,
            request_ids: true,
            metrics_address: None,
        }
    }
}
