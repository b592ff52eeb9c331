//! NYT Archive API client.
//!
//! This module fetches one archive month per call and turns it into a list
//! of displayable articles, newest first.
//!
//! # Architecture
//!
//! - [`ArchiveSource`]: the async seam the feed session depends on
//! - [`ArchiveClient`]: the `reqwest`-backed implementation
//!
//! # Pipeline
//!
//! 1. `GET {base_url}/{year}/{month}.json?api-key=...`
//! 2. Normalize every document ([`crate::normalize`])
//! 3. Drop articles without a title or URL
//! 4. Sort by publish time, newest first
//! 5. Truncate to the configured page limit
//!
//! There is no retry: a failed request surfaces as a [`FetchError`] and the
//! caller decides what to show.

use crate::cursor::YearMonth;
use crate::errors::FetchError;
use crate::models::{ArchiveResponse, Article};
use crate::normalize::normalize_article;
use crate::utils::truncate_for_log;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument};
use url::Url;

/// Default archive endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.nytimes.com/svc/archive/v1";

/// Source of archive pages.
///
/// Implementors fetch one month of articles, already normalized, filtered and
/// sorted newest first.
pub trait ArchiveSource {
    /// Fetch the archive page for `month`.
    async fn fetch_archive_page(&self, month: YearMonth) -> Result<Vec<Article>, FetchError>;

    /// Fetch the "latest articles" window used for polling.
    async fn fetch_latest(&self) -> Result<Vec<Article>, FetchError>;
}

/// Settings for [`ArchiveClient`].
#[derive(Debug, Clone)]
pub struct ArchiveClientConfig {
    /// Endpoint prefix, without the `/{year}/{month}.json` suffix.
    pub base_url: String,
    /// Value of the `api-key` query parameter.
    pub api_key: String,
    /// Maximum articles kept from an archive page; `None` keeps all.
    pub page_limit: Option<usize>,
    /// Month fetched by [`ArchiveSource::fetch_latest`].
    pub latest_month: YearMonth,
    /// Maximum articles kept from the latest window.
    pub latest_limit: usize,
    /// Whole-request timeout.
    pub timeout: Duration,
}

/// HTTP client for the archive API.
#[derive(Debug, Clone)]
pub struct ArchiveClient {
    client: Client,
    base_url: Url,
    config: ArchiveClientConfig,
}

impl ArchiveClient {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL does not parse or the HTTP client
    /// cannot be constructed.
    pub fn new(config: ArchiveClientConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("archive_feed/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // keep the last path segment when joining
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)?;

        Ok(Self {
            client,
            base_url,
            config,
        })
    }

    /// URL of the archive page for `month`, including the credential.
    pub fn page_url(&self, month: YearMonth) -> Result<Url, FetchError> {
        let mut url = self
            .base_url
            .join(&format!("{}/{}.json", month.year(), month.month()))?;
        url.query_pairs_mut()
            .append_pair("api-key", &self.config.api_key);
        Ok(url)
    }

    #[instrument(level = "info", skip_all, fields(%month, limit = ?limit))]
    async fn fetch_month(
        &self,
        month: YearMonth,
        limit: Option<usize>,
    ) -> Result<Vec<Article>, FetchError> {
        let t0 = Instant::now();
        let url = self.page_url(month)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(error = %e, "Archive request failed");
            FetchError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Archive returned error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: truncate_for_log(&body, 300),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: ArchiveResponse = serde_json::from_slice(&bytes)?;
        let articles = prepare_page(parsed, limit);

        info!(
            count = articles.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched archive page"
        );
        Ok(articles)
    }
}

impl ArchiveSource for ArchiveClient {
    async fn fetch_archive_page(&self, month: YearMonth) -> Result<Vec<Article>, FetchError> {
        self.fetch_month(month, self.config.page_limit).await
    }

    async fn fetch_latest(&self) -> Result<Vec<Article>, FetchError> {
        self.fetch_month(self.config.latest_month, Some(self.config.latest_limit))
            .await
    }
}

/// Normalize, filter, sort and truncate one archive response.
pub fn prepare_page(response: ArchiveResponse, limit: Option<usize>) -> Vec<Article> {
    let total = response.response.docs.len();
    let mut articles: Vec<Article> = response
        .response
        .docs
        .iter()
        .map(normalize_article)
        .filter(Article::is_displayable)
        .collect();

    let dropped = total - articles.len();
    if dropped > 0 {
        debug!(dropped, total, "Dropped records without title or url");
    }

    // stable: equal timestamps keep archive order; unparseable sort last
    articles.sort_by(|a, b| b.published_at().cmp(&a.published_at()));

    if let Some(limit) = limit {
        articles.truncate(limit);
    }
    articles
}
