use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("'host' must not be empty")]
    EmptyHost,
    #[error("'ips' must not be empty")]
    EmptyRanges,
    #[error("no IPs to check")]
    NoTargets,
    #[error("'url' is required unless 'look-for-text' is given")]
    MissingUrl,
    #[error("malformed url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("'workers' must be at least 1")]
    InvalidCapacity,
    #[error("'timeout' must be at least 1 second")]
    InvalidTimeout,

    #[error("invalid IP: {0}")]
    InvalidAddress(String),
    #[error("invalid CIDR {token}: {reason}")]
    InvalidCidr { token: String, reason: String },
    #[error("invalid hyphen range format: {0}")]
    InvalidRangeFormat(String),
    #[error("invalid IP in range: {0}")]
    InvalidRangeAddress(String),
    #[error("start IP must be <= end IP: {0}")]
    ReversedRange(String),

    #[error("scan cancelled while waiting for a worker slot")]
    Cancelled,
    #[error("worker pool is closed")]
    PoolClosed,

    #[error("error creating {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("error grabbing desired response: {0}")]
    Reference(#[source] ProbeError),
    #[error("Reqwest: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Failure of a single HTTP round trip. Recorded per target, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("{0}")]
    Network(String),
    #[error("invalid target url: {0}")]
    InvalidTarget(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return ProbeError::Timeout(err.to_string());
        }
        ProbeError::Network(err.to_string())
    }
}
