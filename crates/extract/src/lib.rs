//! Hacker News front page extraction
//!
//! ```text
//! ScrapeOptions → ConnectionTarget → Negotiator → ResolvedSession
//!                                                      ↓
//!                  ScrapeResult ← rows ← query ← page (DOMContentLoaded)
//! ```
//!
//! The browser handle is released on every path out of [`run`] and
//! [`page_title`], whether the run succeeded or not.

pub mod article;
pub mod error;
pub mod handle;
pub mod query;
pub mod scrape;
pub mod session;
pub mod title;

pub use hn_browser::{ConnectionError, ConnectionTarget};

pub use article::{Article, RawRow, ScrapeResult, SOURCE_URL};
pub use error::{ExtractionError, ScrapeError};
pub use handle::{BrowserHandle, PageHandle};
pub use scrape::{scrape, ScrapeOptions, DEFAULT_LIMIT, DEFAULT_MANAGEMENT_BASE_URL};
pub use session::run;
pub use title::page_title;
