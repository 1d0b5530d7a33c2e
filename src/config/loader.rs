//! Proxy mapping loading from the config file and command line.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::SourceConfig;
use crate::routing::{parse_stream_with, BlankLines, ParseError, ProxyMapping};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be opened or read.
    #[error("config file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A descriptor in the config file is malformed.
    #[error("config file {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A descriptor given on the command line is malformed.
    #[error(transparent)]
    Argument(ParseError),
}

/// Load mappings from the config file, if it exists.
pub fn load_file(path: &Path, blank_lines: BlankLines) -> Result<Vec<ProxyMapping>, ConfigError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, skipping");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_stream_with(BufReader::new(file), blank_lines).map_err(|e| match e {
        ParseError::Unreadable(source) => ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
        source => ConfigError::File {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Resolve every mapping: config file entries first, then CLI descriptors.
pub fn load_mappings(sources: &SourceConfig) -> Result<Vec<ProxyMapping>, ConfigError> {
    let mut mappings = load_file(&sources.config_file, sources.blank_lines)?;

    for descriptor in &sources.descriptors {
        mappings.push(descriptor.parse().map_err(ConfigError::Argument)?);
    }

    Ok(mappings)
}
