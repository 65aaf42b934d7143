//! Public entry point: options in, bounded result out

use hn_browser::{ConnectionTarget, Negotiator};
use serde::{Deserialize, Serialize};

use crate::article::ScrapeResult;
use crate::error::ScrapeError;
use crate::session;

pub const DEFAULT_LIMIT: usize = 30;
pub const DEFAULT_MANAGEMENT_BASE_URL: &str = "http://localhost:9222";

/// Scrape configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScrapeOptions {
    /// Maximum number of articles returned
    pub limit: usize,
    /// Only meaningful when a local browser is launched
    pub headless: bool,
    /// Delay before every control command, for watching a run
    pub slow_motion_millis: u64,
    /// Ready-to-use control-channel address; wins over everything else
    pub control_channel_address: Option<String>,
    /// Management API base URL; `None` launches a local browser
    #[serde(rename = "managementBaseURL")]
    pub management_base_url: Option<String>,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            headless: true,
            slow_motion_millis: 0,
            control_channel_address: None,
            management_base_url: Some(DEFAULT_MANAGEMENT_BASE_URL.to_string()),
        }
    }
}

impl ScrapeOptions {
    /// Connection target these options select
    pub fn target(&self) -> ConnectionTarget {
        ConnectionTarget::resolve(
            self.control_channel_address.as_deref(),
            self.management_base_url.as_deref(),
            self.headless,
            self.slow_motion_millis,
        )
    }
}

/// Connect, scrape and release.
///
/// A connection failure returns before any page is opened.
pub async fn scrape(options: &ScrapeOptions) -> Result<ScrapeResult, ScrapeError> {
    let negotiator = Negotiator::new()?.with_slow_mo(options.slow_motion_millis);
    let session = negotiator.connect(&options.target()).await?;
    tracing::debug!(session = %session.id, limit = options.limit, "Starting extraction");

    Ok(session::run(session, options.limit).await?)
}
