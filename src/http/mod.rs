//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (assign request ID)
//!     → telemetry.rs (start per-request record)
//!     → [routing table picks forwarder]
//!     → forwarder.rs (rewrite target, headers.rs, stream to upstream)
//!     → upstream response streamed back
//!     → telemetry.rs (record emitted once body completes)
//! ```

pub mod forwarder;
pub mod headers;
pub mod request;
pub mod server;
pub mod telemetry;

pub use forwarder::{ForwardError, Forwarder, MatchedSubpath};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
pub use telemetry::{LogSink, Outcome, RequestRecord, TelemetryLayer, TelemetrySink};
