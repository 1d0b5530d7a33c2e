//! Proxy descriptor parsing.
//!
//! # Responsibilities
//! - Turn a `subpath:uri` descriptor into a [`ProxyMapping`]
//! - Parse a newline-separated stream of descriptors (config file)
//!
//! # Design Decisions
//! - Split at the first `:` only; the URI half keeps its own colons
//! - Subpath is taken verbatim, no normalization
//! - The URI half is any RFC 3986 reference, absolute or relative, kept as
//!   written; missing scheme/host surfaces at forward time
//! - Stream parsing is all-or-nothing up to the first bad line

use std::fmt;
use std::io::BufRead;
use std::str::FromStr;

use axum::http::Uri;
use thiserror::Error;
use url::{Position, Url};

/// Separator between the subpath and the upstream URI.
pub const DELIMITER: char = ':';

/// Base used only to check the syntax of relative references.
const REFERENCE_BASE: &str = "http://reference.invalid/";

/// Errors produced while parsing descriptors.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Descriptor has no `:` separator.
    #[error("invalid proxy: {0}")]
    InvalidDescriptor(String),

    /// The URI half is not a valid URI reference.
    #[error("invalid uri: {uri}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    /// The underlying reader failed.
    #[error("failed to read proxy descriptors: {0}")]
    Unreadable(#[from] std::io::Error),
}

/// Upstream URI reference, kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamUri {
    text: String,
    /// Parsed form; `None` for relative references.
    absolute: Option<Url>,
}

impl UpstreamUri {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The parsed URI when the reference is absolute.
    pub fn url(&self) -> Option<&Url> {
        self.absolute.as_ref()
    }

    /// Request-target form of an absolute upstream with a host.
    ///
    /// Drops any fragment. `None` when there is no origin to connect to.
    pub fn origin_uri(&self) -> Option<Uri> {
        let url = self.absolute.as_ref().filter(|url| url.has_host())?;
        url[..Position::AfterQuery].parse().ok()
    }
}

impl FromStr for UpstreamUri {
    type Err = url::ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let absolute = match Url::parse(text) {
            Ok(url) => Some(url),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Url::parse(REFERENCE_BASE)?.join(text)?;
                None
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            text: text.to_string(),
            absolute,
        })
    }
}

impl fmt::Display for UpstreamUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A single `subpath → upstream` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyMapping {
    /// Path prefix under which the upstream is mounted.
    pub subpath: String,
    /// Upstream origin (and optional base path) requests are forwarded to.
    pub upstream: UpstreamUri,
}

impl ProxyMapping {
    pub fn new(subpath: impl Into<String>, upstream: UpstreamUri) -> Self {
        Self {
            subpath: subpath.into(),
            upstream,
        }
    }
}

impl fmt::Display for ProxyMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.subpath, self.upstream)
    }
}

impl FromStr for ProxyMapping {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_one(s)
    }
}

/// How [`parse_stream_with`] treats a blank line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlankLines {
    /// A blank line ends the table; later lines are never read.
    #[default]
    Terminate,
    /// Blank lines are ignored and parsing runs to end of input.
    Skip,
}

/// Parse one `subpath:uri` descriptor.
pub fn parse_one(descriptor: &str) -> Result<ProxyMapping, ParseError> {
    let (subpath, uri) = descriptor
        .split_once(DELIMITER)
        .ok_or_else(|| ParseError::InvalidDescriptor(descriptor.to_string()))?;

    let upstream = uri.parse::<UpstreamUri>().map_err(|source| ParseError::InvalidUri {
        uri: uri.to_string(),
        source,
    })?;

    Ok(ProxyMapping::new(subpath, upstream))
}

/// Parse a descriptor stream, stopping at the first blank line.
pub fn parse_stream<R: BufRead>(reader: R) -> Result<Vec<ProxyMapping>, ParseError> {
    parse_stream_with(reader, BlankLines::Terminate)
}

/// Parse a descriptor stream with an explicit blank-line policy.
pub fn parse_stream_with<R: BufRead>(
    reader: R,
    blank_lines: BlankLines,
) -> Result<Vec<ProxyMapping>, ParseError> {
    let mut mappings = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();

        if line.is_empty() {
            match blank_lines {
                BlankLines::Terminate => break,
                BlankLines::Skip => continue,
            }
        }

        mappings.push(parse_one(line)?);
    }

    Ok(mappings)
}
