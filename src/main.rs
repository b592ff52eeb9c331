//! # Archive Feed
//!
//! A news reader for the New York Times Archive API. It loads a month of
//! archived articles, keeps them in a bounded, deduplicated article store
//! grouped by calendar day, and pages backward one month at a time like an
//! infinitely scrolling feed.
//!
//! ## Features
//!
//! - Normalizes archive records (title, first image, defaults for missing fields)
//! - Backward month-by-month pagination down to a configurable floor
//! - Optional polling of a "latest" window merged at the top of the feed
//! - Capacity-bounded store with a fixed eviction policy
//! - English and Russian labels, with the choice remembered between runs
//! - Markdown and JSON renderings of the feed, or an interactive console
//!
//! ## Usage
//!
//! ```sh
//! NYT_API_KEY=... archive_feed --start 2019-12 --pages 2 -j ./json
//! ```
//!
//! ## Architecture
//!
//! Data flows one way:
//! 1. **Fetch**: [`api::ArchiveClient`] downloads one archive month
//! 2. **Normalize**: [`normalize`] maps raw records to [`models::Article`]
//! 3. **Store**: [`store::ArticleStore`] merges, dedupes, evicts and regroups
//! 4. **Assemble**: [`feed::assemble`] projects the store into feed items
//! 5. **Render**: [`outputs`] write Markdown / JSON
//!
//! [`session::FeedSession`] sequences these steps in response to events.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod console;
mod cursor;
mod errors;
mod feed;
mod i18n;
mod models;
mod normalize;
mod outputs;
mod prefs;
mod session;
mod store;
mod utils;

use api::ArchiveClient;
use cli::Cli;
use config::FeedConfig;
use cursor::YearMonth;
use outputs::{json, markdown};
use prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
use session::{FeedSession, PageOutcome, TracingObserver};
use store::ArticleStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    // logs go to stderr so the Markdown feed can be piped from stdout
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("archive_feed starting up");

    // Parse CLI and merge configuration layers
    let args = Cli::parse();
    debug!(?args.config, pages = args.pages, interactive = args.interactive, "Parsed CLI arguments");

    let mut config = FeedConfig::load(args.config.as_deref())?;
    args.apply_to(&mut config);

    let today = Local::now().date_naive();
    let start = config.start.unwrap_or_else(|| YearMonth::from_date(today));
    config.validate(start)?;
    let offset = config.viewer_offset()?;
    info!(%start, floor = %config.floor, capacity = config.max_capacity, "Configuration resolved");

    // Early check: ensure JSON output dir is writable
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    // ---- Wire the session ----
    let client = ArchiveClient::new(config.client_config(start)?)?;
    let prefs: Box<dyn PreferenceStore> = if args.no_persist {
        Box::new(MemoryPreferences::default())
    } else {
        match config.preferences_path.clone().or_else(FilePreferences::default_path) {
            Some(path) => {
                let file = FilePreferences::new(path);
                debug!(path = %file.path().display(), "Using preference file");
                Box::new(file)
            }
            None => {
                warn!("No config directory; language preference will not be saved");
                Box::new(MemoryPreferences::default())
            }
        }
    };
    let store = ArticleStore::new(config.eviction, offset);
    let mut session = FeedSession::new(client, store, prefs, config.session_config(start));
    session.subscribe(Box::new(TracingObserver));

    if let Some(language) = args.language {
        if let Err(e) = session.change_language(language) {
            warn!(error = %e, "Language preference not saved");
        }
    }

    // ---- Initial load ----
    session.initial_load().await;
    if let Some(e) = session.store().error() {
        error!(error = %e, "Initial load failed");
    }

    // ---- Backward pagination ----
    for page in 0..args.pages {
        match session.load_more().await {
            Some(PageOutcome::Added) => {
                debug!(page, cursor = %session.cursor().current(), "Loaded older page");
            }
            Some(outcome) => {
                info!(page, ?outcome, "Stopping pagination");
                break;
            }
            None => {
                info!(page, "No more pages to load");
                break;
            }
        }
    }

    let ctx = markdown::RenderContext { today, offset };

    if args.interactive {
        console::run(&mut session, ctx, config.poll_interval()).await?;
    } else if let Some(every) = config.poll_interval() {
        // ---- Polling rounds ----
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        for round in 0..args.polls {
            ticker.tick().await;
            let inserted = session.poll_latest().await;
            info!(round, inserted, "Polled latest articles");
        }
    }

    // ---- Outputs ----
    let feed = session.feed();
    let status = session.status();

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_snapshot(&feed, &status, dir).await {
            error!(error = %e, "Failed to write JSON snapshot");
        }
    }

    match &args.markdown_output {
        Some(path) => {
            if let Err(e) = markdown::write_feed_file(path, &feed, &status, &ctx).await {
                error!(path = %path, error = %e, "Failed writing Markdown");
            }
        }
        None if !args.interactive => print!("{}", markdown::render_feed(&feed, &status, &ctx)),
        None => {}
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = status.article_count,
        has_more = status.has_more,
        cursor = %status.cursor,
        "Execution complete"
    );

    Ok(())
}
