//! Error types shared across the feed and lights modules.

use std::io;
use std::num::{ParseFloatError, ParseIntError};
use std::time::Duration;

use thiserror::Error;

/// Failures of the connection to the event feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The remote could not be reached
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The connect attempt did not finish in time
    #[error("timed out connecting to {addr} after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    /// Reading from a live connection failed
    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    /// No data arrived within the configured read timeout
    #[error("no data received for {0:?}")]
    ReadTimeout(Duration),

    /// The remote closed the connection
    #[error("connection closed by remote")]
    Closed,

    /// There is no connection to read from
    #[error("not connected")]
    NotConnected,
}

/// A line that had the right shape but carried an unparseable number.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid timestamp {token:?}: {source}")]
    Timestamp {
        token: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("invalid value {token:?}: {source}")]
    Value {
        token: String,
        #[source]
        source: ParseIntError,
    },
}

/// Failures of the light output sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("light i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("no lights discovered")]
    NoLights,
}

/// Failures loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
