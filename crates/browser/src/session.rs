//! Resolved browser session
//!
//! A live control connection plus, for locally launched browsers, the process
//! behind it. Exactly one owner; `close` releases everything and is a no-op
//! the second time.

use std::sync::Arc;
use uuid::Uuid;

use crate::cdp::{CDPClient, CDPError, CDPSession};
use crate::launcher::LocalBrowser;

/// Handle to a negotiated browser control connection
pub struct ResolvedSession {
    /// Identifier for log correlation
    pub id: String,
    endpoint: String,
    client: Option<Arc<CDPClient>>,
    local: Option<LocalBrowser>,
}

impl ResolvedSession {
    pub(crate) fn new(
        endpoint: String,
        client: Arc<CDPClient>,
        local: Option<LocalBrowser>,
    ) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            endpoint,
            client: Some(client),
            local,
        }
    }

    /// Control-channel address the session is connected to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether the browser process was launched by this session
    pub fn is_local(&self) -> bool {
        self.local.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    /// Underlying CDP client
    pub fn client(&self) -> Result<Arc<CDPClient>, CDPError> {
        self.client.clone().ok_or(CDPError::Closed)
    }

    /// Open a new blank page scoped to this session
    pub async fn new_page(&self) -> Result<CDPSession, CDPError> {
        CDPSession::create(self.client()?).await
    }

    /// Release the connection, and the process when it was launched locally.
    ///
    /// A launched browser is asked to close, then reaped. A remote browser is
    /// only disconnected from; it keeps running for whoever else uses it.
    pub async fn close(&mut self) -> Result<(), CDPError> {
        let Some(client) = self.client.take() else {
            return Ok(());
        };

        match self.local.take() {
            Some(local) => {
                let graceful = match client.send_request("Browser.close", None, None).await {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::warn!(session = %self.id, "Browser.close failed: {}", e);
                        false
                    }
                };
                // The browser drops the socket itself when it exits
                if let Err(e) = client.close().await {
                    tracing::debug!(session = %self.id, "WebSocket close after Browser.close: {}", e);
                }
                if let Err(e) = local.shutdown(graceful).await {
                    tracing::warn!(session = %self.id, "Failed to reap local browser: {}", e);
                }
                tracing::info!(session = %self.id, "Local browser closed");
                Ok(())
            }
            None => {
                client.close().await?;
                tracing::info!(session = %self.id, endpoint = %self.endpoint, "Disconnected from browser");
                Ok(())
            }
        }
    }
}

impl std::fmt::Debug for ResolvedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSession")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("local", &self.local.is_some())
            .field("closed", &self.client.is_none())
            .finish()
    }
}
