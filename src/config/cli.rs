//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::schema::{
    ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, SourceConfig, DEFAULT_CONFIG_FILE,
};
use crate::routing::BlankLines;

#[derive(Parser, Debug)]
#[command(name = "proxyutil")]
#[command(about = "proxyutil is a simple proxy server", long_about = None)]
pub struct Cli {
    /// port to listen on
    #[arg(short, long, env = "PROXYUTIL_PORT", default_value_t = 8080)]
    pub port: u16,

    /// host to bind
    #[arg(long, env = "PROXYUTIL_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// enable verbose logging. 0 = panic, 1 = fatal, 2 = error, 3 = warn, 4 = info, 5 = debug, 6 = trace
    #[arg(short, long, env = "PROXYUTIL_VERBOSE", default_value_t = 4)]
    pub verbose: u8,

    /// config file with one `subpath:uri` per line
    #[arg(short, long, env = "PROXYUTIL_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// how a blank line in the config file is treated
    #[arg(long, env = "PROXYUTIL_BLANK_LINES", value_enum, default_value_t = BlankLineArg::Terminate)]
    pub blank_lines: BlankLineArg,

    /// log output format
    #[arg(long, env = "PROXYUTIL_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// assign a request id to requests that do not carry one
    #[arg(long, env = "PROXYUTIL_REQUEST_ID", default_value_t = true, action = clap::ArgAction::Set)]
    pub request_id: bool,

    /// serve Prometheus metrics on this address
    #[arg(long, env = "PROXYUTIL_METRICS_ADDRESS")]
    pub metrics_address: Option<SocketAddr>,

    /// proxies as `subpath:uri`, e.g. `/api:http://localhost:3000`
    #[arg(value_name = "PROXY")]
    pub proxies: Vec<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankLineArg {
    /// stop reading at the first blank line
    Terminate,
    /// ignore blank lines
    Skip,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormatArg {
    Text,
    Json,
}

impl From<BlankLineArg> for BlankLines {
    fn from(arg: BlankLineArg) -> Self {
        match arg {
            BlankLineArg::Terminate => BlankLines::Terminate,
            BlankLineArg::Skip => BlankLines::Skip,
        }
    }
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl From<Cli> for ProxyConfig {
    fn from(cli: Cli) -> Self {
        Self {
            listener: ListenerConfig {
                host: cli.host,
                port: cli.port,
            },
            sources: SourceConfig {
                config_file: cli.config,
                descriptors: cli.proxies,
                blank_lines: cli.blank_lines.into(),
            },
            observability: ObservabilityConfig {
                verbosity: cli.verbose,
                log_format: cli.log_format.into(),
                request_ids: cli.request_id,
                metrics_address: cli.metrics_address,
            },
        }
    }
}
