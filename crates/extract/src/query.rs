//! In-page extraction query
//!
//! The script runs in the rendered page and only collects text; all parsing
//! happens in [`Article::from_raw`]. Rows without a title link or without a
//! subtext row (spacers, "More" links) are not articles and are skipped.

use serde_json::Value;
use url::Url;

use crate::article::{Article, RawRow, SOURCE_URL};
use crate::error::{ExtractionError, Result};

pub const EXTRACTION_SCRIPT: &str = r#"(() => {
  const text = (el) => (el ? el.textContent : null);
  const rows = [];
  document.querySelectorAll("tr.athing").forEach((row) => {
    const titleLink = row.querySelector("span.titleline > a");
    const subtext = row.nextElementSibling;
    if (!titleLink || !subtext) return;
    const links = subtext.querySelectorAll("a");
    const age = subtext.querySelector("span.age");
    rows.push({
      rank: text(row.querySelector("span.rank")),
      title: titleLink.textContent,
      href: titleLink.getAttribute("href"),
      score: text(subtext.querySelector("span.score")),
      author: text(subtext.querySelector("a.hnuser")),
      age: age ? age.getAttribute("title") : null,
      comments: links.length ? text(links[links.length - 1]) : null,
    });
  });
  return rows;
})()"#;

/// Turn the query's return value into articles, in page order
pub fn parse_rows(value: Value) -> Result<Vec<Article>> {
    let Value::Array(rows) = value else {
        return Err(ExtractionError::QueryFailure {
            reason: format!("expected an array of rows, got {}", kind(&value)),
        });
    };

    let base = Url::parse(SOURCE_URL).map_err(|e| ExtractionError::QueryFailure {
        reason: e.to_string(),
    })?;

    let articles = rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<RawRow>(row) {
            Ok(raw) => Some(Article::from_raw(raw, &base)),
            Err(e) => {
                tracing::warn!(index, "Skipping malformed row: {}", e);
                None
            }
        })
        .collect();

    Ok(articles)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
