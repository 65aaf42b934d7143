//! Connection negotiation errors
//!
//! One variant per failure class. Nothing here is retried.

use thiserror::Error;

use crate::cdp::CDPError;

pub type Result<T> = std::result::Result<T, ConnectionError>;

#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The management endpoint could not be reached over HTTP
    #[error("HTTP request to {url} failed: {source}")]
    NetworkFailure {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The management endpoint answered, but not with a usable version document
    #[error("bad response from {url}: {reason}")]
    BadResponse { url: String, reason: String },

    /// The control channel rejected or dropped the WebSocket connect
    #[error("control channel handshake with {url} failed: {source}")]
    HandshakeFailure {
        url: String,
        #[source]
        source: CDPError,
    },

    #[error("failed to launch local browser: {reason}")]
    LaunchFailure { reason: String },

    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}
