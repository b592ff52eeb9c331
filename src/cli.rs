//! Command-line interface definitions for Archive Feed.
//!
//! Every option can also come from the YAML config file; flags given here
//! win over the file. The API key is usually passed through `NYT_API_KEY`.

use crate::config::FeedConfig;
use crate::cursor::YearMonth;
use crate::i18n::Language;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for Archive Feed.
///
/// # Examples
///
/// ```sh
/// # Current month plus three older months, Markdown to stdout
/// archive_feed --pages 3
///
/// # A fixed window, Russian labels, JSON snapshot
/// archive_feed --start 2019-12 --language ru -j ./out
///
/// # Interactive session polling the latest window every 30 seconds
/// archive_feed --interactive --poll-interval-secs 30
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// New York Times API key
    #[arg(long, env = "NYT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Archive endpoint prefix
    #[arg(long, env = "NYT_ARCHIVE_URL")]
    pub base_url: Option<String>,

    /// First month to load (YYYY-MM); defaults to the current month
    #[arg(long)]
    pub start: Option<YearMonth>,

    /// Earliest month pagination may reach (YYYY-MM)
    #[arg(long)]
    pub floor: Option<YearMonth>,

    /// Month polled for the latest articles (YYYY-MM); defaults to the start month
    #[arg(long)]
    pub latest: Option<YearMonth>,

    /// Older months to load after the initial one
    #[arg(short, long, default_value_t = 0)]
    pub pages: usize,

    /// Upper bound on stored articles
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Poll the latest window this often
    #[arg(long)]
    pub poll_interval_secs: Option<u64>,

    /// Poll rounds before exiting (non-interactive runs)
    #[arg(long, default_value_t = 0)]
    pub polls: usize,

    /// Switch the UI language and remember it (en, ru)
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Where the language preference is stored
    #[arg(long)]
    pub preferences: Option<PathBuf>,

    /// Keep the language preference in memory only
    #[arg(long)]
    pub no_persist: bool,

    /// Offset from UTC, in minutes, used to group articles by day
    #[arg(long, allow_hyphen_values = true)]
    pub utc_offset_minutes: Option<i32>,

    /// Output directory for the JSON feed snapshot
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Markdown output file; printed to stdout when omitted
    #[arg(short, long)]
    pub markdown_output: Option<String>,

    /// Read commands (more, poll, lang, reset, reload, quit) from stdin
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    /// Layer the flags that were given over `config`.
    pub fn apply_to(&self, config: &mut FeedConfig) {
        if let Some(key) = &self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if self.start.is_some() {
            config.start = self.start;
        }
        if let Some(floor) = self.floor {
            config.floor = floor;
        }
        if self.latest.is_some() {
            config.latest = self.latest;
        }
        if let Some(capacity) = self.capacity {
            config.max_capacity = capacity;
        }
        if self.poll_interval_secs.is_some() {
            config.poll_interval_secs = self.poll_interval_secs;
        }
        if self.utc_offset_minutes.is_some() {
            config.utc_offset_minutes = self.utc_offset_minutes;
        }
        if let Some(path) = &self.preferences {
            config.preferences_path = Some(path.clone());
        }
    }
}
