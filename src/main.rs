//! proxyutil
//!
//! Stitches several HTTP services behind one address.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                    PROXYUTIL                      │
//!                    │                                                   │
//!  .proxies + args ──┼─▶ config ──▶ routing::descriptor ──▶ RoutingTable │
//!                    │                                          │        │
//!  Client Request    │  ┌───────────┐   ┌───────────┐   ┌───────▼─────┐  │
//!  ──────────────────┼─▶│request id │──▶│ telemetry │──▶│  dispatch   │  │
//!                    │  └───────────┘   └───────────┘   └───────┬─────┘  │
//!                    │                                          ▼        │
//!  Client Response   │                                  ┌─────────────┐  │  Upstream
//!  ◀─────────────────┼──────────── streamed body ◀──────│  forwarder  │◀─┼── Server
//!                    │                                  └─────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use clap::Parser;

use proxyutil::config::{Cli, ProxyConfig};
use proxyutil::lifecycle;
use proxyutil::observability::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let config = ProxyConfig::from(Cli::parse());

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("proxyutil: failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    tracing::info!("proxyutil v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("proxyutil: {}", e);
            ExitCode::FAILURE
        }
    }
}
