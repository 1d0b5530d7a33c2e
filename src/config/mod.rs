//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! CLI flags + environment
//!     → cli.rs (clap parsing)
//!     → ProxyConfig (immutable, built once)
//!
//! config file (one `subpath:uri` per line) + CLI descriptors
//!     → loader.rs (file entries first, then arguments)
//!     → Vec<ProxyMapping> → routing table
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal invocations
//! - A missing config file is not an error; an unreadable one is

pub mod cli;
pub mod loader;
pub mod schema;

pub use cli::Cli;
pub use loader::{load_mappings, ConfigError};
pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, SourceConfig};
