//! Mapping of raw archive records into canonical [`Article`]s.
//!
//! Normalization never fails. Missing optional fields fall back to defaults,
//! and it is up to the fetch client to drop articles that still lack a title
//! or URL afterwards (see [`Article::is_displayable`]).

use crate::models::{Article, RawArticle};
use serde_json::Value;
use url::Url;

/// Host prepended to relative multimedia paths.
pub const IMAGE_BASE_URL: &str = "https://www.nytimes.com/";

/// Publisher label used when a record omits `source`.
pub const DEFAULT_SOURCE: &str = "The New York Times";

/// Normalize one archive record.
pub fn normalize_article(raw: &RawArticle) -> Article {
    let url = non_empty(raw.web_url.as_deref()).unwrap_or_default();
    let id = non_empty(raw.id.as_deref()).unwrap_or_else(|| url.clone());

    let title = non_empty(raw.abstract_text.as_deref())
        .or_else(|| non_empty(raw.headline.as_ref().and_then(|h| h.main.as_deref())))
        .unwrap_or_default();

    Article {
        id,
        title,
        url,
        image_url: raw.multimedia.as_ref().and_then(first_image_url),
        published_date: raw.pub_date.clone().unwrap_or_default(),
        source: non_empty(raw.source.as_deref()).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        snippet: raw.snippet.clone().unwrap_or_default(),
        word_count: raw.word_count.as_ref().map(word_count).unwrap_or(0),
    }
}

/// Resolve a multimedia path against [`IMAGE_BASE_URL`] unless already absolute.
pub fn absolute_image_url(path: &str) -> String {
    if path.starts_with("http") {
        return path.to_string();
    }
    Url::parse(IMAGE_BASE_URL)
        .and_then(|base| base.join(path.trim_start_matches('/')))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| format!("{}{}", IMAGE_BASE_URL, path.trim_start_matches('/')))
}

fn first_image_url(multimedia: &Value) -> Option<String> {
    multimedia
        .as_array()?
        .iter()
        .filter(|item| item.get("type").and_then(Value::as_str) == Some("image"))
        .filter_map(|item| item.get("url").and_then(Value::as_str))
        .find(|url| !url.is_empty())
        .map(absolute_image_url)
}

fn word_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

// whitespace counts as content; values are kept verbatim
fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}
