//! Markdown rendering of the feed.
//!
//! # Layout
//!
//! ```text
//! # News
//!
//! ## Today, 2 January 2024
//!
//! ### [Title](https://www.nytimes.com/...)
//! <small>The New York Times · Jan 2, 2024, 10.30 AM · 900 words</small>
//!
//! Snippet text
//!
//! [Read article](https://www.nytimes.com/...)
//! ```
//!
//! Labels come from the session's language; card timestamps are always
//! English, shown in the viewer's offset.

use crate::feed::FeedItem;
use crate::i18n::{card_timestamp, separator_label};
use crate::models::Article;
use crate::session::FeedStatus;
use chrono::{FixedOffset, NaiveDate};
use std::fmt::{self, Write};
use tokio::fs;
use tracing::{info, instrument};

/// Viewer-dependent inputs to rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    /// Viewer's current day, for the Today / Yesterday labels.
    pub today: NaiveDate,
    /// Viewer's offset for card timestamps.
    pub offset: FixedOffset,
}

/// Render the feed as a Markdown document.
pub fn render_feed(feed: &[FeedItem<'_>], status: &FeedStatus, ctx: &RenderContext) -> String {
    let mut out = String::new();
    // writing into a String never fails
    let _ = write_feed(&mut out, feed, status, ctx);
    out
}

/// Render and write the feed to `path`.
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn write_feed_file(
    path: &str,
    feed: &[FeedItem<'_>],
    status: &FeedStatus,
    ctx: &RenderContext,
) -> Result<(), std::io::Error> {
    let md = render_feed(feed, status, ctx);
    fs::write(path, md).await?;
    info!(items = feed.len(), "Wrote Markdown feed");
    Ok(())
}

fn write_feed(
    out: &mut String,
    feed: &[FeedItem<'_>],
    status: &FeedStatus,
    ctx: &RenderContext,
) -> fmt::Result {
    let t = status.language.translations();
    let menu = &t.side_menu;

    writeln!(out, "# {}\n", t.header.title)?;
    writeln!(
        out,
        "_{}: {} · {}: {} · {} · {} · {} · {}_\n",
        menu.language,
        status.language,
        menu.title,
        menu.home,
        menu.politics,
        menu.technology,
        menu.sports,
        menu.culture
    )?;

    if let Some(error) = &status.error {
        writeln!(out, "> **{}**: {}", t.common.error, t.news_list.loading_error)?;
        writeln!(out, "> `{}`", error)?;
        writeln!(out, "> {}: `reload`\n", t.news_list.retry_button)?;
    }

    for item in feed {
        match item {
            FeedItem::DateSeparator { date } => {
                let label = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .map(|d| separator_label(d, ctx.today, status.language))
                    .unwrap_or_else(|_| date.to_string());
                writeln!(out, "## {}\n", label)?;
            }
            FeedItem::Article { article } => write_card(out, article, status, ctx)?,
            FeedItem::Placeholder { .. } => {
                writeln!(out, "- _{}_", t.common.loading)?;
            }
        }
    }

    if status.loading {
        writeln!(out, "\n_{}_", t.news_list.loading)?;
    }
    if status.loading_more {
        writeln!(out, "_{}_\n", t.common.loading)?;
    }
    if !status.has_more && status.article_count > 0 {
        writeln!(out, "---\n\n_{}_\n", t.news_list.end_of_archive)?;
    }
    writeln!(out, "<small>{}</small>", menu.version)?;
    Ok(())
}

fn write_card(
    out: &mut String,
    article: &Article,
    status: &FeedStatus,
    ctx: &RenderContext,
) -> fmt::Result {
    let t = status.language.translations();

    writeln!(out, "### [{}]({})", article.title, article.url)?;

    let mut meta = vec![article.source.clone()];
    if let Some(ts) = article.published_at() {
        meta.push(card_timestamp(&ts.with_timezone(&ctx.offset)));
    }
    if article.word_count > 0 {
        meta.push(format!("{} {}", article.word_count, t.news_card.words));
    }
    writeln!(out, "<small>{}</small>\n", meta.join(" · "))?;

    if let Some(image) = &article.image_url {
        writeln!(out, "![]({})\n", image)?;
    }
    if !article.snippet.is_empty() {
        writeln!(out, "{}\n", article.snippet)?;
    }
    writeln!(out, "[{}]({})\n", t.news_card.read_article, article.url)?;
    Ok(())
}
