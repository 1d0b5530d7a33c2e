//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! http/telemetry.rs (one record per request)
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (text or JSON)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging for machine parsing
//! - Request ID flows from the inbound request into the record and upstream
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
