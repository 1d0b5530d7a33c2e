//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load mappings → Build routing table → Start metrics → Bind listener → Serve
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listener
//! - Fail fast: any startup error aborts before traffic is accepted
//! - No graceful shutdown or reload; the process runs until terminated

pub mod startup;

pub use startup::{build_server, run, StartupError};
