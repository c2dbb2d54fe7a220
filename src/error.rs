//! Error types for the poll-diff-broadcast core.
//!
//! Each failure mode has its own type so callers can apply the right policy:
//! [`FetchError`] aborts one poll cycle, [`SnapshotError`] aborts startup,
//! [`PersistError`] is only ever logged.

use std::path::PathBuf;

/// Malformed JSON, either from the upstream API or from the snapshot file.
#[derive(Debug, thiserror::Error)]
#[error("malformed {origin} JSON: {source}")]
pub struct ParseError {
    /// Where the bytes came from ("upstream", "snapshot")
    pub origin: &'static str,
    #[source]
    pub source: serde_json::Error,
}

impl ParseError {
    pub fn upstream(source: serde_json::Error) -> Self {
        Self {
            origin: "upstream",
            source,
        }
    }

    pub fn snapshot(source: serde_json::Error) -> Self {
        Self {
            origin: "snapshot",
            source,
        }
    }
}

/// A poll that did not yield a dataset.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Connection, TLS, timeout or body read failure.
    #[error("request to facility API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with something other than 200.
    #[error("API returned status code {0}")]
    Status(u16),

    /// The API answered 200 with a body we could not read.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Writing the state file failed.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("state file {path} could not be written: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Restoring the state file at startup failed.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("state file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {path} is corrupt: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// A single sink refused a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The sink's buffer is full (slow consumer).
    #[error("sink buffer full")]
    Full,

    /// The sink's receiving side is gone (client disconnecting).
    #[error("sink closed")]
    Closed,
}

/// The configuration file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path} could not be read: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {path} is invalid: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
