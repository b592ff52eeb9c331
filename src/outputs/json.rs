//! JSON snapshot of the feed.
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── feed.json
//! ```
//!
//! ```json
//! {
//!   "generatedAt": "2024-01-02T10:30:00+00:00",
//!   "status": { "language": "en", "hasMore": true, ... },
//!   "items": [
//!     { "type": "dateSeparator", "date": "2024-01-02" },
//!     { "type": "article", "article": { "id": "...", "title": "..." } }
//!   ]
//! }
//! ```

use crate::feed::FeedItem;
use crate::session::FeedStatus;
use chrono::Utc;
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot<'a> {
    pub generated_at: String,
    pub status: &'a FeedStatus,
    pub items: &'a [FeedItem<'a>],
}

impl<'a> FeedSnapshot<'a> {
    pub fn new(items: &'a [FeedItem<'a>], status: &'a FeedStatus) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339(),
            status,
            items,
        }
    }
}

/// Write the snapshot to `{json_output_dir}/feed.json`.
///
/// # Returns
///
/// The path written, or an error if the directory or file cannot be written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_snapshot(
    items: &[FeedItem<'_>],
    status: &FeedStatus,
    json_output_dir: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(&FeedSnapshot::new(items, status))?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(%json_output_dir, error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = PathBuf::from(json_output_dir).join("feed.json");
    fs::write(&path, json).await?;
    info!(path = %path.display(), items = items.len(), "Wrote JSON feed snapshot");
    Ok(path)
}
