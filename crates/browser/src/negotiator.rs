//! Connection Negotiator
//!
//! Turns a [`ConnectionTarget`] into a live [`ResolvedSession`]:
//!
//! ```text
//! Local              → launch process → DevTools banner ─┐
//! DirectEndpoint     ────────────────────────────────────┼→ WebSocket connect → ResolvedSession
//! ManagementEndpoint → GET /json/version → rewrite host ─┘
//! ```
//!
//! Every failure aborts the attempt; a half-built session is never returned.

use std::time::Duration;
use url::Url;

use crate::cdp::CDPClient;
use crate::discovery::{self, ManagementAddress};
use crate::error::{ConnectionError, Result};
use crate::launcher::{self, LaunchOptions, LocalBrowser};
use crate::session::ResolvedSession;
use crate::target::ConnectionTarget;

/// Negotiates browser control connections
#[derive(Debug, Clone)]
pub struct Negotiator {
    http: reqwest::Client,
    slow_mo: Duration,
    launch: LaunchOptions,
}

impl Negotiator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: discovery::http_client()?,
            slow_mo: Duration::ZERO,
            launch: LaunchOptions::default(),
        })
    }

    /// Delay applied to every command on remotely attached sessions.
    ///
    /// Local targets carry their own delay.
    pub fn with_slow_mo(mut self, millis: u64) -> Self {
        self.slow_mo = Duration::from_millis(millis);
        self
    }

    /// Executable and extra flags for local launches. `headless` comes from the target.
    pub fn with_launch_options(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }

    /// Produce a live session for `target`
    pub async fn connect(&self, target: &ConnectionTarget) -> Result<ResolvedSession> {
        tracing::info!(%target, "Negotiating browser connection");

        match target {
            ConnectionTarget::DirectEndpoint {
                control_channel_address,
            } => {
                let url = parse_control_channel(control_channel_address)?;
                self.attach(url.as_str(), self.slow_mo, None).await
            }
            ConnectionTarget::ManagementEndpoint { base_url } => {
                let url = self.discover(base_url).await?;
                self.attach(url.as_str(), self.slow_mo, None).await
            }
            ConnectionTarget::Local {
                headless,
                slow_motion_millis,
            } => {
                let options = LaunchOptions {
                    headless: *headless,
                    ..self.launch.clone()
                };
                let local = launcher::launch(&options).await?;
                let ws_url = local.ws_url().to_string();
                self.attach(&ws_url, Duration::from_millis(*slow_motion_millis), Some(local))
                    .await
            }
        }
    }

    /// Resolve a management base URL to a reachable control-channel address
    pub async fn discover(&self, base_url: &str) -> Result<Url> {
        let address = ManagementAddress::parse(base_url)?;
        let info = discovery::fetch_version_info(&self.http, &address).await?;
        let rewritten = discovery::rewrite_debugger_url(&info.web_socket_debugger_url, &address)?;

        tracing::debug!(
            reported = %info.web_socket_debugger_url,
            rewritten = %rewritten,
            browser = ?info.browser,
            "Rewrote control-channel address"
        );
        Ok(rewritten)
    }

    async fn attach(
        &self,
        ws_url: &str,
        slow_mo: Duration,
        local: Option<LocalBrowser>,
    ) -> Result<ResolvedSession> {
        match CDPClient::connect_with_slow_mo(ws_url, slow_mo).await {
            Ok(client) => {
                let session = ResolvedSession::new(ws_url.to_string(), client, local);
                tracing::info!(session = %session.id, endpoint = %ws_url, "Browser connected");
                Ok(session)
            }
            Err(source) => {
                // A process we launched but cannot drive is useless
                if let Some(local) = local {
                    if let Err(e) = local.shutdown(false).await {
                        tracing::warn!("Failed to kill local browser: {}", e);
                    }
                }
                Err(ConnectionError::HandshakeFailure {
                    url: ws_url.to_string(),
                    source,
                })
            }
        }
    }
}

/// Connect with default negotiator settings
pub async fn connect(target: &ConnectionTarget) -> Result<ResolvedSession> {
    Negotiator::new()?.connect(target).await
}

fn parse_control_channel(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|e| ConnectionError::InvalidEndpoint {
        endpoint: address.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(ConnectionError::InvalidEndpoint {
            endpoint: address.to_string(),
            reason: format!("expected a ws:// or wss:// URL, got {:?}", url.scheme()),
        });
    }
    Ok(url)
}
