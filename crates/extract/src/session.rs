//! Extraction Session
//!
//! Owns a browser handle for the duration of one run. The page is opened,
//! used and closed inside [`run`]; the browser is released on every exit path
//! before `run` returns.

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::article::{ScrapeResult, SOURCE_URL};
use crate::error::Result;
use crate::handle::{BrowserHandle, PageHandle};
use crate::query::{parse_rows, EXTRACTION_SCRIPT};

/// Scrape the listing page through `session`, keeping at most `limit` articles
pub async fn run<B: BrowserHandle>(mut session: B, limit: usize) -> Result<ScrapeResult> {
    let outcome = extract(&session, limit).await;
    release(&mut session).await;

    if let Ok(result) = &outcome {
        info!(articles = result.article_count, limit, "Extraction finished");
    }
    outcome
}

async fn extract<B: BrowserHandle>(session: &B, limit: usize) -> Result<ScrapeResult> {
    let page = session.open_page().await?;
    let outcome = extract_from_page(&page, limit).await;
    close_page(&page).await;
    outcome
}

async fn extract_from_page<P: PageHandle>(page: &P, limit: usize) -> Result<ScrapeResult> {
    page.goto(SOURCE_URL).await?;
    let scraped_at = Utc::now();
    debug!(url = SOURCE_URL, "Document parsed");

    let rows = page.evaluate(EXTRACTION_SCRIPT).await?;
    let articles = parse_rows(rows)?;
    debug!(found = articles.len(), "Rows extracted");

    Ok(ScrapeResult::new(scraped_at, articles, limit))
}

/// Best-effort: the browser release that follows tears the page down anyway
pub(crate) async fn close_page<P: PageHandle>(page: &P) {
    if let Err(e) = page.close().await {
        debug!("Page close failed: {}", e);
    }
}

/// Release the browser, reporting but never propagating a failure
pub(crate) async fn release<B: BrowserHandle>(session: &mut B) {
    if let Err(e) = session.close().await {
        warn!("{}", e);
    }
}
