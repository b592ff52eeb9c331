//! Runtime configuration.
//!
//! Values come from three layers, later ones winning:
//! 1. built-in defaults
//! 2. an optional YAML file (`--config`)
//! 3. command-line flags and environment variables ([`crate::cli::Cli`])
//!
//! ```yaml
//! api_key: YOUR_KEY
//! start: 2019-12
//! floor: 1851-01
//! max_capacity: 500
//! page_limit: 50
//! poll_interval_secs: 30
//! eviction:
//!   on_append: front
//!   on_prepend: back
//! ```

use crate::api::{ArchiveClientConfig, DEFAULT_BASE_URL};
use crate::cursor::YearMonth;
use crate::errors::ConfigError;
use crate::session::SessionConfig;
use crate::store::EvictionPolicy;
use chrono::{FixedOffset, Local, Offset};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    /// Archive endpoint prefix.
    pub base_url: String,
    /// NYT developer API key.
    pub api_key: Option<String>,
    /// First month to load; the current month when unset.
    pub start: Option<YearMonth>,
    /// Earliest month pagination may reach.
    pub floor: YearMonth,
    /// Month polled for latest articles; the start month when unset.
    pub latest: Option<YearMonth>,
    /// Articles kept per archive page; `null` keeps the whole month.
    pub page_limit: Option<usize>,
    /// Articles kept from each latest-window poll.
    pub latest_limit: usize,
    /// Upper bound on stored articles.
    pub max_capacity: usize,
    pub eviction: EvictionPolicy,
    /// Poll the latest window this often; no polling when unset.
    pub poll_interval_secs: Option<u64>,
    /// Whole-request HTTP timeout.
    pub timeout_secs: u64,
    /// Viewer offset used for day grouping; the local offset when unset.
    pub utc_offset_minutes: Option<i32>,
    /// Where the language preference is stored.
    pub preferences_path: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            start: None,
            floor: YearMonth::ARCHIVE_START,
            latest: None,
            page_limit: Some(50),
            latest_limit: 10,
            max_capacity: 500,
            eviction: EvictionPolicy::default(),
            poll_interval_secs: None,
            timeout_secs: 30,
            utc_offset_minutes: None,
            preferences_path: None,
        }
    }
}

impl FeedConfig {
    /// Load from `path`, or return the defaults when no path is given.
    #[instrument(level = "info", skip_all, fields(path = ?path))]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        let config: FeedConfig = serde_yaml::from_str(&raw)?;
        info!("Loaded configuration file");
        Ok(config)
    }

    /// Check cross-field constraints once all layers are merged.
    pub fn validate(&self, start: YearMonth) -> Result<(), ConfigError> {
        if self.max_capacity == 0 {
            return Err(ConfigError::Invalid("max_capacity must be at least 1".into()));
        }
        if self.latest_limit == 0 {
            return Err(ConfigError::Invalid("latest_limit must be at least 1".into()));
        }
        if self.page_limit == Some(0) {
            return Err(ConfigError::Invalid("page_limit must be at least 1".into()));
        }
        if start < self.floor {
            return Err(ConfigError::Invalid(format!(
                "start month {} is before the floor {}",
                start, self.floor
            )));
        }
        if self.poll_interval_secs == Some(0) {
            return Err(ConfigError::Invalid("poll_interval_secs must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be at least 1".into()));
        }
        self.viewer_offset()?;
        Ok(())
    }

    /// Offset in which publish timestamps are grouped into days.
    pub fn viewer_offset(&self) -> Result<FixedOffset, ConfigError> {
        match self.utc_offset_minutes {
            Some(minutes) => minutes
                .checked_mul(60)
                .and_then(FixedOffset::east_opt)
                .ok_or_else(|| {
                    ConfigError::Invalid(format!("utc_offset_minutes out of range: {}", minutes))
                }),
            None => Ok(Local::now().offset().fix()),
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval_secs.map(Duration::from_secs)
    }

    pub fn client_config(&self, start: YearMonth) -> Result<ArchiveClientConfig, ConfigError> {
        let api_key = self
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid("missing API key (use --api-key or NYT_API_KEY)".into())
            })?;

        Ok(ArchiveClientConfig {
            base_url: self.base_url.clone(),
            api_key,
            page_limit: self.page_limit,
            latest_month: self.latest.unwrap_or(start),
            latest_limit: self.latest_limit,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    pub fn session_config(&self, start: YearMonth) -> SessionConfig {
        SessionConfig {
            start,
            floor: self.floor,
            max_capacity: self.max_capacity,
            poll_latest: self.poll_interval_secs.is_some(),
        }
    }
}
