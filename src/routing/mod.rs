//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Descriptors (config file, then CLI args)
//!     → descriptor.rs (parse `subpath:uri` into ProxyMapping)
//!     → router.rs (mount one Forwarder per mapping)
//!
//! Incoming Request (path)
//!     → router.rs (route lookup)
//!     → matcher.rs (segment-aware prefix match, strip subpath)
//!     → Return: matched Route + remainder, or NoMatch
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: longest prefix wins, duplicates resolve last-write-wins

pub mod descriptor;
pub mod matcher;
pub mod router;

pub use descriptor::{
    parse_one, parse_stream, parse_stream_with, BlankLines, ParseError, ProxyMapping,
    UpstreamUri,
};
pub use router::{Route, RouteMatch, RoutingTable};
