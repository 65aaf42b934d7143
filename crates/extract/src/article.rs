//! Article records and the scrape result envelope
//!
//! Field parsing is tolerant: a missing or malformed piece of a row degrades
//! that field to its empty/zero default and never fails the batch.

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// The listing page every run scrapes
pub const SOURCE_URL: &str = "https://news.ycombinator.com/";

static COMMENT_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*comment").unwrap());

/// One listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// 1-based position on the page, 0 when unreadable
    pub rank: u32,
    pub title: String,
    /// Absolute URL, empty when the row has no link target
    pub url: String,
    pub points: u32,
    /// Empty for site-flagged posts without a submitter
    pub author: String,
    pub comment_count: u32,
    /// `title` attribute of the age element
    pub posted_at: String,
}

/// Row exactly as the in-page query reports it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl Article {
    /// Map a raw row, resolving site-relative links against `base`
    pub fn from_raw(raw: RawRow, base: &Url) -> Self {
        Self {
            rank: raw.rank.as_deref().and_then(leading_number).unwrap_or(0),
            title: raw.title.unwrap_or_default(),
            url: raw
                .href
                .as_deref()
                .map(|href| resolve_url(href, base))
                .unwrap_or_default(),
            points: raw.score.as_deref().and_then(leading_number).unwrap_or(0),
            author: raw.author.unwrap_or_default(),
            comment_count: raw.comments.as_deref().and_then(comment_count).unwrap_or(0),
            posted_at: raw.age.unwrap_or_default(),
        }
    }
}

/// Leading unsigned integer of `text`: `"42."` → 42, `"118 points"` → 118
fn leading_number(text: &str) -> Option<u32> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    text[..end].parse().ok()
}

/// Best-effort count from link text such as `"57 comments"`; `"discuss"` has none
fn comment_count(text: &str) -> Option<u32> {
    COMMENT_COUNT
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn resolve_url(href: &str, base: &Url) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    base.join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

/// Bounded, timestamped scrape output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub scraped_at: String,
    pub source: String,
    pub article_count: usize,
    pub articles: Vec<Article>,
}

impl ScrapeResult {
    /// Build a result holding at most `limit` articles, keeping page order
    pub fn new(scraped_at: DateTime<Utc>, mut articles: Vec<Article>, limit: usize) -> Self {
        articles.truncate(limit);
        Self {
            scraped_at: scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: SOURCE_URL.to_string(),
            article_count: articles.len(),
            articles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse(SOURCE_URL).unwrap()
    }

    fn full_row() -> RawRow {
        RawRow {
            rank: Some("1.".to_string()),
            title: Some("Show HN: A tiny database".to_string()),
            href: Some("https://example.com/db".to_string()),
            score: Some("118 points".to_string()),
            author: Some("pg".to_string()),
            age: Some("2024-05-01T12:00:00 1714564800".to_string()),
            comments: Some("57\u{a0}comments".to_string()),
        }
    }

    #[test]
    fn test_full_row() {
        let article = Article::from_raw(full_row(), &base());
        assert_eq!(
            article,
            Article {
                rank: 1,
                title: "Show HN: A tiny database".to_string(),
                url: "https://example.com/db".to_string(),
                points: 118,
                author: "pg".to_string(),
                comment_count: 57,
                posted_at: "2024-05-01T12:00:00 1714564800".to_string(),
            }
        );
    }

    #[test]
    fn test_missing_score_is_zero_points() {
        let row = RawRow {
            score: None,
            ..full_row()
        };
        let article = Article::from_raw(row, &base());
        assert_eq!(article.points, 0);
        assert_eq!(article.rank, 1);
    }

    #[test]
    fn test_flagged_post_without_subtext_details() {
        // Job postings carry no score, submitter or comment link
        let row = RawRow {
            rank: Some("7.".to_string()),
            title: Some("Acme (YC S21) is hiring".to_string()),
            href: Some("item?id=40000000".to_string()),
            age: Some("2024-05-01T10:00:00 1714557600".to_string()),
            comments: Some("3 hours ago".to_string()),
            ..Default::default()
        };
        let article = Article::from_raw(row, &base());
        assert_eq!(article.author, "");
        assert_eq!(article.points, 0);
        assert_eq!(article.comment_count, 0);
        assert_eq!(article.url, "https://news.ycombinator.com/item?id=40000000");
    }

    #[test]
    fn test_empty_row_degrades_to_defaults() {
        let article = Article::from_raw(RawRow::default(), &base());
        assert_eq!(article.rank, 0);
        assert_eq!(article.title, "");
        assert_eq!(article.url, "");
        assert_eq!(article.posted_at, "");
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(leading_number("12."), Some(12));
        assert_eq!(leading_number(" 1 point"), Some(1));
        assert_eq!(leading_number("points"), None);
        assert_eq!(leading_number(""), None);
    }

    #[test]
    fn test_comment_count() {
        assert_eq!(comment_count("1 comment"), Some(1));
        assert_eq!(comment_count("230 comments"), Some(230));
        assert_eq!(comment_count("discuss"), None);
        assert_eq!(comment_count("hide"), None);
    }

    #[test]
    fn test_result_truncates_and_counts() {
        let articles: Vec<Article> = (1..=5)
            .map(|rank| {
                let row = RawRow {
                    rank: Some(format!("{}.", rank)),
                    ..Default::default()
                };
                Article::from_raw(row, &base())
            })
            .collect();

        let result = ScrapeResult::new(Utc::now(), articles.clone(), 3);
        assert_eq!(result.article_count, 3);
        assert_eq!(result.articles, articles[..3].to_vec());

        let result = ScrapeResult::new(Utc::now(), articles, 30);
        assert_eq!(result.article_count, 5);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let stamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00.123Z")
            .unwrap()
            .with_timezone(&Utc);
        let result = ScrapeResult::new(stamp, vec![Article::from_raw(full_row(), &base())], 1);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["scrapedAt"], "2024-05-01T12:00:00.123Z");
        assert_eq!(json["source"], SOURCE_URL);
        assert_eq!(json["articleCount"], 1);
        assert_eq!(json["articles"][0]["commentCount"], 57);
        assert_eq!(json["articles"][0]["postedAt"], "2024-05-01T12:00:00 1714564800");
    }
}
