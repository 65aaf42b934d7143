//! Error types for extraction runs

use hn_browser::ConnectionError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractionError>;

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Opening the page or loading the listing failed
    #[error("navigation to {url} failed: {reason}")]
    NavigationFailure { url: String, reason: String },

    /// The in-page query threw or returned something that is not a row list
    #[error("extraction query failed: {reason}")]
    QueryFailure { reason: String },

    /// Closing the page or the browser failed. Logged, never returned over another error.
    #[error("failed to release browser session: {reason}")]
    ReleaseFailure { reason: String },
}

/// Everything `scrape` can fail with
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}
