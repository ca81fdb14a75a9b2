//! Error types for fetch-dl
//!
//! Two layers of errors exist:
//! - [`Error`] is returned from batch-level calls and only covers problems that
//!   prevent a batch from starting (bad configuration, pool setup, malformed requests).
//! - [`FetchError`] describes why a single item failed. It never escapes a batch;
//!   the downloader converts it into [`OutcomeStatus::Failed`](crate::types::OutcomeStatus).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for fetch-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fetch-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "concurrency")
        key: Option<String>,
    },

    /// The worker pool for a batch could not be set up; nothing was attempted
    #[error("worker pool setup failed: {0}")]
    PoolInit(String),

    /// The caller's request could not be interpreted
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client construction error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Why a single download item failed
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source URI could not be parsed or uses an unsupported scheme
    #[error("invalid source URI '{uri}': {reason}")]
    InvalidUri {
        /// The URI as supplied by the caller
        uri: String,
        /// What is wrong with it
        reason: String,
    },

    /// Connection, TLS or body transfer failure
    #[error("request to '{uri}' failed: {source}")]
    Network {
        /// The URI being fetched
        uri: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The source stream broke part way through the transfer
    #[error("error reading '{uri}': {source}")]
    Read {
        /// The URI being read
        uri: String,
        /// Underlying stream error
        #[source]
        source: std::io::Error,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} fetching '{uri}'")]
    HttpStatus {
        /// Response status code
        status: u16,
        /// The URI being fetched
        uri: String,
    },

    /// The item did not finish within the per-item deadline
    #[error("download timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// A local filesystem operation failed
    #[error("failed to {op} '{}': {source}", path.display())]
    Io {
        /// The operation that failed (e.g. "create directory", "write")
        op: &'static str,
        /// The path involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The worker processing the item stopped before producing a result
    #[error("worker terminated before completing item: {0}")]
    Worker(String),
}

impl FetchError {
    /// Attach an operation name and path to an I/O error
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    /// Whether this failure came from the network side rather than the local filesystem
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            FetchError::Network { .. }
                | FetchError::Read { .. }
                | FetchError::HttpStatus { .. }
                | FetchError::Timeout(_)
        )
    }
}
