//! Command-line arguments for `hn-scrape`.
//!
//! Connection flags can also come from the environment, which is how the
//! scraper is usually pointed at a browser container.

use std::path::PathBuf;

use clap::Parser;
use hn_extract::{ScrapeOptions, DEFAULT_LIMIT, DEFAULT_MANAGEMENT_BASE_URL};

/// Scrape the Hacker News front page through a browser.
///
/// ```sh
/// # Attach to a browser exposing its DevTools port on localhost
/// hn-scrape
///
/// # Attach to a browser container by name
/// BROWSER_URL=http://chromium:9222 hn-scrape --limit 10
///
/// # Launch a visible local browser and slow it down
/// hn-scrape --launch --headed --slow-mo 250
/// ```
#[derive(Parser, Debug)]
#[command(name = "hn-scrape", author, version, about)]
pub struct Cli {
    /// Maximum number of articles to keep
    #[arg(short, long, env = "SCRAPE_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub limit: usize,

    /// Show the browser window (local launch only)
    #[arg(long)]
    pub headed: bool,

    /// Delay in milliseconds before every browser command
    #[arg(long, default_value_t = 0)]
    pub slow_mo: u64,

    /// Control-channel address (ws:// or wss://); skips discovery entirely
    #[arg(long, env = "BROWSER_WS_ENDPOINT")]
    pub ws_endpoint: Option<String>,

    /// Base URL of the browser's DevTools HTTP endpoint
    #[arg(long, env = "BROWSER_URL", default_value = DEFAULT_MANAGEMENT_BASE_URL)]
    pub browser_url: String,

    /// Launch a local Chromium instead of attaching to a running one
    #[arg(long)]
    pub launch: bool,

    /// Where to write the JSON result
    #[arg(short, long, default_value = "output/articles.json")]
    pub output: PathBuf,
}

impl Cli {
    pub fn to_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            limit: self.limit,
            headless: !self.headed,
            slow_motion_millis: self.slow_mo,
            control_channel_address: self.ws_endpoint.clone(),
            management_base_url: (!self.launch).then(|| self.browser_url.clone()),
        }
    }
}
