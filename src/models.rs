//! Data models for archive records and normalized articles.
//!
//! This module defines the two shapes an article goes through:
//! - [`ArchiveResponse`] / [`RawArticle`]: the loosely-typed payload of the
//!   NYT Archive API, deserialized leniently so that a single odd record never
//!   fails a whole page
//! - [`Article`]: the canonical, immutable record held by the article store
//!
//! Field names of [`Article`] serialize in camelCase to match the JSON
//! snapshot consumed by front ends.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

/// Day key used for articles whose publish timestamp cannot be parsed.
///
/// Sorts after every real `YYYY-MM-DD` key in descending order, so undated
/// articles land at the bottom of the feed.
pub const UNDATED_DAY_KEY: &str = "0000-00-00";

/// Top-level body of `/{year}/{month}.json`.
#[derive(Debug, Default, Deserialize)]
pub struct ArchiveResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub response: ArchiveDocs,
}

/// The `response` object wrapping the archive documents.
#[derive(Debug, Default, Deserialize)]
pub struct ArchiveDocs {
    /// Documents that are not JSON objects are dropped.
    #[serde(default, deserialize_with = "objects_only")]
    pub docs: Vec<RawArticle>,
}

/// One archive document as sent by the API.
///
/// Every field is optional, and a field holding a value of the wrong type
/// reads as missing. `multimedia` and `word_count` are kept as raw JSON
/// values because the API has changed their shapes over the years.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawArticle {
    #[serde(rename = "_id", default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(rename = "abstract", default, deserialize_with = "lenient")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub web_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(default)]
    pub multimedia: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub headline: Option<RawHeadline>,
    #[serde(default, deserialize_with = "lenient")]
    pub pub_date: Option<String>,
    #[serde(default)]
    pub word_count: Option<Value>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawHeadline {
    #[serde(default, deserialize_with = "lenient")]
    pub main: Option<String>,
}

/// Read any JSON value, keeping it only if it has the expected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn objects_only<'de, D>(deserializer: D) -> Result<Vec<RawArticle>, D::Error>
where
    D: Deserializer<'de>,
{
    let docs = match Value::deserialize(deserializer)? {
        Value::Array(docs) => docs,
        _ => return Ok(Vec::new()),
    };
    let total = docs.len();
    let kept: Vec<RawArticle> = docs
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|doc| serde_json::from_value(doc).ok())
        .collect();
    if kept.len() < total {
        warn!(dropped = total - kept.len(), "Skipped malformed archive documents");
    }
    Ok(kept)
}

/// A normalized article.
///
/// Articles are never patched in place: the store replaces them wholesale,
/// keyed by [`Article::id`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Stable identifier assigned by the archive.
    pub id: String,
    /// Abstract, or the main headline when the abstract is empty.
    pub title: String,
    /// Canonical article URL.
    pub url: String,
    /// Absolute URL of the first image, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image_url: Option<String>,
    /// ISO-8601 publish timestamp exactly as received.
    pub published_date: String,
    /// Publisher label.
    pub source: String,
    pub snippet: String,
    /// Word count, 0 when unknown.
    pub word_count: u64,
}

impl Article {
    /// Parse [`Article::published_date`].
    ///
    /// Accepts RFC 3339 as well as the archive's own `+0000` offset style.
    pub fn published_at(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(&self.published_date)
    }

    /// Calendar day (`YYYY-MM-DD`) of publication as seen from `offset`.
    pub fn day_key(&self, offset: &FixedOffset) -> String {
        if let Some(ts) = self.published_at() {
            return ts.with_timezone(offset).format("%Y-%m-%d").to_string();
        }
        // date-only values
        self.published_date
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| UNDATED_DAY_KEY.to_string())
    }

    /// Whether the article carries the fields required to be displayed.
    pub fn is_displayable(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
}

#[cfg(test)]
pub(crate) fn test_article(id: &str, published_date: &str) -> Article {
    Article {
        id: id.to_string(),
        title: format!("Title {}", id),
        url: format!("https://www.nytimes.com/{}", id),
        image_url: None,
        published_date: published_date.to_string(),
        source: "The New York Times".to_string(),
        snippet: String::new(),
        word_count: 0,
    }
}
