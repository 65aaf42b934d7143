//! Page title lookup
//!
//! Same acquire/release discipline as an extraction run, for any URL.

use serde_json::Value;

use crate::error::{ExtractionError, Result};
use crate::handle::{BrowserHandle, PageHandle};
use crate::session::{close_page, release};

/// Navigate to `url` and return `document.title`, releasing `session` afterwards
pub async fn page_title<B: BrowserHandle>(mut session: B, url: &str) -> Result<String> {
    let outcome = read_title(&session, url).await;
    release(&mut session).await;
    outcome
}

async fn read_title<B: BrowserHandle>(session: &B, url: &str) -> Result<String> {
    let page = session.open_page().await?;
    let outcome = title_of(&page, url).await;
    close_page(&page).await;
    outcome
}

async fn title_of<P: PageHandle>(page: &P, url: &str) -> Result<String> {
    page.goto(url).await?;
    match page.evaluate("document.title").await? {
        Value::String(title) => Ok(title),
        other => Err(ExtractionError::QueryFailure {
            reason: format!("document.title evaluated to {}", other),
        }),
    }
}
