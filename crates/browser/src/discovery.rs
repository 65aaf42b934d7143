//! Control-channel discovery through a browser's management API
//!
//! Chromium's DevTools HTTP server answers `/json/version` only when the `Host`
//! header is `localhost` or an IP literal (DNS-rebinding defense), and the
//! `webSocketDebuggerUrl` it reports always names its own loopback host. Reaching
//! a browser through a container service name therefore needs two fixes:
//!
//! - send `Host: localhost` no matter which host the request actually goes to
//! - keep only the path of the reported URL and point it back at the real host
//!
//! The request goes through `reqwest`, whose HTTP/1 client keeps an explicitly
//! set `Host` header instead of deriving it from the URL. Proxies are disabled on
//! the client so the header reaches the browser unmodified.

use reqwest::header::HOST;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use crate::error::{ConnectionError, Result};

/// Port Chromium's remote debugging server conventionally listens on
pub const DEFAULT_MANAGEMENT_PORT: u16 = 9222;

/// Management API path carrying the browser-level debugger URL
pub const VERSION_PATH: &str = "/json/version";

/// Host header value the DevTools HTTP server accepts from any origin
const FORCED_HOST: &str = "localhost";

/// `(scheme, hostname, port)` of a management endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementAddress {
    pub scheme: String,
    pub hostname: String,
    pub port: u16,
}

impl ManagementAddress {
    /// Parse a management base URL such as `http://puppeteer:9222`.
    ///
    /// The port defaults to 9222 when the URL names none.
    pub fn parse(base_url: &str) -> Result<Self> {
        let invalid = |reason: String| ConnectionError::InvalidEndpoint {
            endpoint: base_url.to_string(),
            reason,
        };

        let url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }
        let hostname = url
            .host_str()
            .ok_or_else(|| invalid("missing host".to_string()))?
            .to_string();

        Ok(Self {
            scheme: url.scheme().to_string(),
            hostname,
            port: url.port().unwrap_or(DEFAULT_MANAGEMENT_PORT),
        })
    }

    /// Absolute URL of the version document
    pub fn version_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme, self.hostname, self.port, VERSION_PATH
        )
    }
}

/// `/json/version` body. Only the debugger URL is required.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    pub web_socket_debugger_url: String,
    #[serde(rename = "Browser", default)]
    pub browser: Option<String>,
    #[serde(rename = "Protocol-Version", default)]
    pub protocol_version: Option<String>,
    #[serde(rename = "User-Agent", default)]
    pub user_agent: Option<String>,
    #[serde(rename = "V8-Version", default)]
    pub v8_version: Option<String>,
    #[serde(rename = "WebKit-Version", default)]
    pub webkit_version: Option<String>,
}

/// Build the HTTP client used for discovery
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .map_err(|source| ConnectionError::NetworkFailure {
            url: String::new(),
            source,
        })
}

/// Fetch the version document with the `Host` header forced to `localhost`
pub async fn fetch_version_info(
    http: &reqwest::Client,
    address: &ManagementAddress,
) -> Result<VersionInfo> {
    let url = address.version_url();
    tracing::debug!(%url, host = FORCED_HOST, "Querying management endpoint");

    let network = |source| ConnectionError::NetworkFailure {
        url: url.clone(),
        source,
    };

    let response = http
        .get(&url)
        .header(HOST, FORCED_HOST)
        .send()
        .await
        .map_err(network)?;
    let status = response.status();
    let body = response.text().await.map_err(network)?;

    if status != StatusCode::OK {
        return Err(ConnectionError::BadResponse {
            url,
            reason: format!("HTTP {}: {}", status.as_u16(), body.trim()),
        });
    }

    serde_json::from_str(&body).map_err(|e| ConnectionError::BadResponse {
        url,
        reason: format!("unparsable version document: {}", e),
    })
}

/// Point a reported debugger URL at the management endpoint's host and port.
///
/// Scheme, path and query of the reported URL are kept.
pub fn rewrite_debugger_url(reported: &str, address: &ManagementAddress) -> Result<Url> {
    let bad = |reason: String| ConnectionError::BadResponse {
        url: address.version_url(),
        reason,
    };

    let mut url = Url::parse(reported)
        .map_err(|e| bad(format!("invalid webSocketDebuggerUrl {:?}: {}", reported, e)))?;
    url.set_host(Some(&address.hostname))
        .map_err(|e| bad(format!("cannot rewrite host of {:?}: {}", reported, e)))?;
    url.set_port(Some(address.port))
        .map_err(|()| bad(format!("cannot rewrite port of {:?}", reported)))?;

    Ok(url)
}
