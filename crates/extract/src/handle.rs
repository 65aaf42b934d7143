//! Browser and page capabilities an extraction run needs
//!
//! Implemented for the negotiated [`ResolvedSession`] and its [`CDPSession`]
//! pages; tests substitute their own.

use async_trait::async_trait;
use hn_browser::{CDPError, CDPSession, ResolvedSession};
use serde_json::Value;

use crate::error::{ExtractionError, Result};

/// An exclusively owned browser connection
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    type Page: PageHandle;

    /// Open one blank page
    async fn open_page(&self) -> Result<Self::Page>;

    /// Release the connection. Called exactly once per run.
    async fn close(&mut self) -> Result<()>;
}

/// One page inside a browser
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// Navigate and return once the document is parsed
    async fn goto(&self, url: &str) -> Result<()>;

    /// Evaluate an expression in the page and return its JSON value
    async fn evaluate(&self, expression: &str) -> Result<Value>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl BrowserHandle for ResolvedSession {
    type Page = CDPSession;

    async fn open_page(&self) -> Result<CDPSession> {
        self.new_page()
            .await
            .map_err(|e| ExtractionError::NavigationFailure {
                url: "about:blank".to_string(),
                reason: format!("failed to open page: {}", e),
            })
    }

    async fn close(&mut self) -> Result<()> {
        ResolvedSession::close(self).await.map_err(release_failure)
    }
}

#[async_trait]
impl PageHandle for CDPSession {
    async fn goto(&self, url: &str) -> Result<()> {
        self.navigate_until_dom_content_loaded(url)
            .await
            .map_err(|e| ExtractionError::NavigationFailure {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        CDPSession::evaluate(self, expression)
            .await
            .map_err(|e| ExtractionError::QueryFailure {
                reason: e.to_string(),
            })
    }

    async fn close(&self) -> Result<()> {
        CDPSession::close(self).await.map_err(release_failure)
    }
}

fn release_failure(e: CDPError) -> ExtractionError {
    ExtractionError::ReleaseFailure {
        reason: e.to_string(),
    }
}
