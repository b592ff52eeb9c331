//! Feed session: the event controller driving the store.
//!
//! Every state change enters through one of the session's events:
//!
//! | Event | Effect |
//! |-------|--------|
//! | initial load | fetch the start month (and the latest window), replace the store |
//! | load more | fetch the month before the cursor, append, step the cursor back |
//! | poll | fetch the latest window, prepend anything new |
//! | language change | switch UI language and persist it |
//! | reset | empty store, rewind cursor, invalidate in-flight fetches |
//!
//! Load-more is split into [`FeedSession::begin_load_more`] and
//! [`FeedSession::complete_load_more`] so the in-flight guard and generation
//! check are explicit state: a second trigger while a page is pending is
//! refused, and a response that arrives after a reset is discarded.
//!
//! Observers registered with [`FeedSession::subscribe`] receive the freshly
//! assembled feed after every committed mutation.

use crate::api::ArchiveSource;
use crate::cursor::{PaginationCursor, YearMonth};
use crate::errors::{FetchError, PreferenceError};
use crate::feed::{FeedItem, assemble};
use crate::i18n::Language;
use crate::models::Article;
use crate::prefs::{PreferenceStore, load_language, save_language};
use crate::store::ArticleStore;
use futures::future::join;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Month loaded first; the cursor starts here.
    pub start: YearMonth,
    /// Earliest month pagination may request.
    pub floor: YearMonth,
    /// Upper bound on stored articles.
    pub max_capacity: usize,
    /// Merge the latest window into the feed on initial load and polls.
    pub poll_latest: bool,
}

/// Status flags published next to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedStatus {
    pub language: Language,
    pub loading: bool,
    pub loading_more: bool,
    pub has_more: bool,
    pub error: Option<String>,
    pub cursor: YearMonth,
    pub article_count: usize,
}

/// Receives the feed after every committed change.
pub trait FeedObserver {
    fn feed_changed(&mut self, feed: &[FeedItem<'_>], status: &FeedStatus);
}

/// A pending initial load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialRequest {
    pub month: YearMonth,
    generation: u64,
}

/// A pending load-more fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub month: YearMonth,
    generation: u64,
}

/// What a completed load-more did to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// New articles were appended and the cursor stepped back.
    Added,
    /// The page was empty or held only known articles; pagination stops.
    Exhausted,
    /// The fetch failed; the error is on the store and the cursor is unchanged.
    Failed,
    /// The session was reset while the fetch was pending; nothing applied.
    Stale,
}

pub struct FeedSession<S> {
    source: S,
    store: ArticleStore,
    cursor: PaginationCursor,
    prefs: Box<dyn PreferenceStore>,
    language: Language,
    config: SessionConfig,
    generation: u64,
    in_flight: bool,
    // the start month is in the store; cleared by reset
    start_loaded: bool,
    observers: Vec<Box<dyn FeedObserver>>,
}

impl<S: ArchiveSource> FeedSession<S> {
    /// Create a session; the language is read from `prefs`.
    pub fn new(
        source: S,
        store: ArticleStore,
        prefs: Box<dyn PreferenceStore>,
        config: SessionConfig,
    ) -> Self {
        let language = load_language(&*prefs);
        info!(%language, start = %config.start, floor = %config.floor, "Feed session created");
        Self {
            source,
            store,
            cursor: PaginationCursor::new(config.start, config.floor),
            prefs,
            language,
            config,
            generation: 0,
            in_flight: false,
            start_loaded: false,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Box<dyn FeedObserver>) {
        self.observers.push(observer);
    }

    pub fn store(&self) -> &ArticleStore {
        &self.store
    }

    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn feed(&self) -> Vec<FeedItem<'_>> {
        assemble(&self.store, self.store.loading())
    }

    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            language: self.language,
            loading: self.store.loading(),
            loading_more: self.store.loading_more(),
            has_more: self.store.has_more(),
            error: self.store.error().map(str::to_string),
            cursor: self.cursor.current(),
            article_count: self.store.len(),
        }
    }

    /// Enter the loading state for the start month.
    pub fn begin_initial_load(&mut self) -> InitialRequest {
        self.store.set_loading(true);
        self.store.set_error(None);
        self.notify();
        InitialRequest {
            month: self.cursor.current(),
            generation: self.generation,
        }
    }

    /// Apply the initial page (and the optional latest window).
    ///
    /// Returns `false` when the request was superseded by a reset.
    #[instrument(level = "info", skip_all, fields(month = %request.month))]
    pub fn complete_initial_load(
        &mut self,
        request: InitialRequest,
        page: Result<Vec<Article>, FetchError>,
        latest: Option<Result<Vec<Article>, FetchError>>,
    ) -> bool {
        if request.generation != self.generation {
            debug!("Discarding superseded initial load");
            return false;
        }

        match page {
            Ok(articles) => {
                info!(count = articles.len(), "Initial page loaded");
                self.store.replace_all(articles);
                self.start_loaded = true;
                if let Some(latest) = latest {
                    self.merge_latest(latest);
                }
            }
            Err(e) => {
                warn!(error = %e, "Initial page failed");
                self.store.set_error(Some(e.to_string()));
                self.store.set_loading(false);
            }
        }
        self.notify();
        true
    }

    /// Fetch and apply the start month.
    pub async fn initial_load(&mut self) -> bool {
        let request = self.begin_initial_load();
        let (page, latest) = if self.config.poll_latest {
            let (page, latest) = join(
                self.source.fetch_archive_page(request.month),
                self.source.fetch_latest(),
            )
            .await;
            (page, Some(latest))
        } else {
            (self.source.fetch_archive_page(request.month).await, None)
        };
        self.complete_initial_load(request, page, latest)
    }

    /// Claim the next page to fetch, if pagination may proceed.
    ///
    /// Refused while another page is in flight, before the start month has
    /// loaded, or once the archive is exhausted. Reaching past the floor ends
    /// pagination.
    pub fn begin_load_more(&mut self) -> Option<PageRequest> {
        if self.in_flight
            || !self.start_loaded
            || self.store.loading()
            || !self.store.has_more()
        {
            debug!(
                in_flight = self.in_flight,
                start_loaded = self.start_loaded,
                loading = self.store.loading(),
                has_more = self.store.has_more(),
                "Load more refused"
            );
            return None;
        }

        let month = self.cursor.previous();
        if !self.cursor.is_within_floor(month) {
            info!(%month, floor = %self.cursor.floor(), "Reached archive floor");
            self.store.set_has_more(false);
            self.notify();
            return None;
        }

        self.in_flight = true;
        self.store.set_loading_more(true);
        self.store.set_error(None);
        self.notify();
        Some(PageRequest {
            month,
            generation: self.generation,
        })
    }

    /// Apply the result of a page claimed with [`Self::begin_load_more`].
    #[instrument(level = "info", skip_all, fields(month = %request.month))]
    pub fn complete_load_more(
        &mut self,
        request: PageRequest,
        result: Result<Vec<Article>, FetchError>,
    ) -> PageOutcome {
        if request.generation != self.generation {
            debug!("Discarding superseded page");
            return PageOutcome::Stale;
        }
        self.in_flight = false;

        let outcome = match result {
            Ok(articles) if articles.is_empty() => {
                info!("Archive page empty; no more data");
                self.store.set_loading_more(false);
                self.store.set_has_more(false);
                PageOutcome::Exhausted
            }
            Ok(articles) => {
                if self.store.append(articles, self.config.max_capacity) {
                    let month = self.cursor.advance_backward();
                    info!(cursor = %month, len = self.store.len(), "Appended archive page");
                    PageOutcome::Added
                } else {
                    info!("Archive page held only known articles");
                    PageOutcome::Exhausted
                }
            }
            Err(e) => {
                warn!(error = %e, "Archive page failed");
                self.store.set_loading_more(false);
                self.store.set_error(Some(e.to_string()));
                PageOutcome::Failed
            }
        };
        self.notify();
        outcome
    }

    /// Fetch and apply the next older page. `None` when refused.
    pub async fn load_more(&mut self) -> Option<PageOutcome> {
        let request = self.begin_load_more()?;
        let result = self.source.fetch_archive_page(request.month).await;
        Some(self.complete_load_more(request, result))
    }

    /// Fetch the latest window and prepend new articles.
    ///
    /// Failures are logged and otherwise ignored. Returns the number of
    /// articles inserted.
    pub async fn poll_latest(&mut self) -> usize {
        if self.store.loading() {
            return 0;
        }
        let latest = self.source.fetch_latest().await;
        self.merge_latest(latest)
    }

    /// Switch the UI language and persist it.
    ///
    /// The in-memory language changes even when saving fails.
    pub fn change_language(&mut self, language: Language) -> Result<(), PreferenceError> {
        self.language = language;
        let saved = save_language(&mut *self.prefs, language);
        if let Err(ref e) = saved {
            warn!(error = %e, %language, "Failed to persist language");
        } else {
            info!(%language, "Language changed");
        }
        self.notify();
        saved
    }

    /// Drop all articles and start over from the start month.
    pub fn reset(&mut self) {
        self.store.reset();
        self.cursor.rewind();
        self.generation += 1;
        self.in_flight = false;
        self.start_loaded = false;
        info!(generation = self.generation, "Feed reset");
        self.notify();
    }

    fn merge_latest(&mut self, latest: Result<Vec<Article>, FetchError>) -> usize {
        match latest {
            Ok(articles) => {
                let inserted = self.store.prepend(articles, self.config.max_capacity);
                if inserted > 0 {
                    info!(inserted, "Merged latest articles");
                    self.notify();
                }
                inserted
            }
            Err(e) => {
                warn!(error = %e, "Latest articles fetch failed");
                0
            }
        }
    }

    fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let status = self.status();
        let feed = assemble(&self.store, self.store.loading());
        for observer in self.observers.iter_mut() {
            observer.feed_changed(&feed, &status);
        }
    }
}

/// Observer that traces each feed change.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl FeedObserver for TracingObserver {
    fn feed_changed(&mut self, feed: &[FeedItem<'_>], status: &FeedStatus) {
        debug!(
            items = feed.len(),
            articles = status.article_count,
            loading = status.loading,
            loading_more = status.loading_more,
            has_more = status.has_more,
            error = ?status.error,
            cursor = %status.cursor,
            "Feed changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_article;
    use crate::prefs::MemoryPreferences;
    use crate::store::EvictionPolicy;
    use chrono::FixedOffset;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeSource {
        // None => the request fails
        pages: HashMap<YearMonth, Option<Vec<Article>>>,
        latest: RefCell<Vec<Article>>,
        calls: RefCell<Vec<YearMonth>>,
    }

    impl ArchiveSource for FakeSource {
        async fn fetch_archive_page(&self, month: YearMonth) -> Result<Vec<Article>, FetchError> {
            self.calls.borrow_mut().push(month);
            match self.pages.get(&month) {
                Some(Some(articles)) => Ok(articles.clone()),
                Some(None) => Err(FetchError::Status {
                    status: 500,
                    body: "upstream down".to_string(),
                }),
                None => Ok(Vec::new()),
            }
        }

        async fn fetch_latest(&self) -> Result<Vec<Article>, FetchError> {
            Ok(self.latest.borrow().clone())
        }
    }

    struct Recorder(Rc<RefCell<Vec<FeedStatus>>>);

    impl FeedObserver for Recorder {
        fn feed_changed(&mut self, _feed: &[FeedItem<'_>], status: &FeedStatus) {
            self.0.borrow_mut().push(status.clone());
        }
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    fn page(prefix: &str, day: &str, n: usize) -> Vec<Article> {
        (0..n)
            .map(|i| test_article(&format!("{}{}", prefix, i), day))
            .collect()
    }

    fn session(source: FakeSource, floor: YearMonth, capacity: usize) -> FeedSession<FakeSource> {
        let store = ArticleStore::new(EvictionPolicy::default(), FixedOffset::east_opt(0).unwrap());
        FeedSession::new(
            source,
            store,
            Box::new(MemoryPreferences::default()),
            SessionConfig {
                start: ym(2020, 1),
                floor,
                max_capacity: capacity,
                poll_latest: false,
            },
        )
    }

    fn source_with(pages: Vec<(YearMonth, Option<Vec<Article>>)>) -> FakeSource {
        FakeSource {
            pages: pages.into_iter().collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_initial_load_installs_start_month() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 3)))]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);

        assert!(session.initial_load().await);

        let status = session.status();
        assert!(!status.loading);
        assert_eq!(status.article_count, 3);
        assert_eq!(status.cursor, ym(2020, 1));
        assert_eq!(session.feed().len(), 4);
    }

    #[tokio::test]
    async fn test_initial_load_failure_surfaces_error() {
        let source = source_with(vec![(ym(2020, 1), None)]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);

        session.initial_load().await;

        let status = session.status();
        assert!(!status.loading);
        assert!(status.error.unwrap().contains("500"));
        assert!(session.feed().is_empty());
    }

    #[tokio::test]
    async fn test_initial_load_merges_latest_window() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        *source.latest.borrow_mut() = page("new", "2020-02-01", 2);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.config.poll_latest = true;

        session.initial_load().await;

        let order: Vec<&str> = session.store().order().iter().map(String::as_str).collect();
        assert_eq!(order, vec!["new0", "new1", "jan0", "jan1"]);
    }

    #[tokio::test]
    async fn test_load_more_appends_and_advances_cursor() {
        let source = source_with(vec![
            (ym(2020, 1), Some(page("jan", "2020-01-15", 2))),
            (ym(2019, 12), Some(page("dec", "2019-12-15", 2))),
        ]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        assert_eq!(session.load_more().await, Some(PageOutcome::Added));

        assert_eq!(session.cursor().current(), ym(2019, 12));
        assert_eq!(session.store().len(), 4);
        assert!(session.status().has_more);
        assert!(!session.status().loading_more);
        session.store().assert_consistent();
    }

    #[tokio::test]
    async fn test_empty_page_stops_pagination() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        assert_eq!(session.load_more().await, Some(PageOutcome::Exhausted));
        assert!(!session.status().has_more);
        assert_eq!(session.cursor().current(), ym(2020, 1));
        assert_eq!(session.load_more().await, None);
    }

    #[tokio::test]
    async fn test_failed_page_keeps_cursor_and_allows_retry() {
        let source = source_with(vec![
            (ym(2020, 1), Some(page("jan", "2020-01-15", 2))),
            (ym(2019, 12), None),
        ]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        assert_eq!(session.load_more().await, Some(PageOutcome::Failed));
        let status = session.status();
        assert!(status.error.is_some());
        assert!(status.has_more);
        assert!(!status.loading_more);
        assert_eq!(status.cursor, ym(2020, 1));

        let retry = session.begin_load_more().unwrap();
        assert_eq!(retry.month, ym(2019, 12));
        assert!(session.status().error.is_none());
    }

    #[tokio::test]
    async fn test_overlapping_load_more_is_refused() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        let first = session.begin_load_more().unwrap();
        assert!(session.status().loading_more);
        assert!(session.begin_load_more().is_none());

        let outcome = session.complete_load_more(first, Ok(page("dec", "2019-12-15", 1)));
        assert_eq!(outcome, PageOutcome::Added);
        assert_eq!(session.cursor().current(), ym(2019, 12));

        let second = session.begin_load_more().unwrap();
        assert_eq!(second.month, ym(2019, 11));
    }

    #[tokio::test]
    async fn test_response_after_reset_is_discarded() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        let pending = session.begin_load_more().unwrap();
        session.reset();
        let outcome = session.complete_load_more(pending, Ok(page("dec", "2019-12-15", 3)));

        assert_eq!(outcome, PageOutcome::Stale);
        assert!(session.store().is_empty());
        assert_eq!(session.cursor().current(), ym(2020, 1));
        assert!(!session.status().loading_more);
    }

    #[tokio::test]
    async fn test_initial_load_after_reset_is_discarded() {
        let source = source_with(vec![]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);

        let pending = session.begin_initial_load();
        session.reset();
        assert!(!session.complete_initial_load(pending, Ok(page("a", "2020-01-01", 2)), None));
        assert!(session.store().is_empty());
    }

    #[tokio::test]
    async fn test_load_more_waits_for_start_month() {
        let source = source_with(vec![
            (ym(2020, 1), Some(page("jan", "2020-01-15", 2))),
            (ym(2019, 12), Some(page("dec", "2019-12-15", 2))),
        ]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);

        assert_eq!(session.load_more().await, None);
        assert!(session.source.calls.borrow().is_empty());

        session.initial_load().await;
        session.reset();
        assert!(session.begin_load_more().is_none());

        session.initial_load().await;
        let request = session.begin_load_more().unwrap();
        assert_eq!(request.month, ym(2019, 12));
    }

    #[tokio::test]
    async fn test_load_more_refused_after_failed_initial_load() {
        let source = source_with(vec![(ym(2020, 1), None)]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        assert!(session.begin_load_more().is_none());
        assert_eq!(session.cursor().current(), ym(2020, 1));
    }

    #[tokio::test]
    async fn test_floor_ends_pagination_without_fetch() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        let mut session = session(source, ym(2020, 1), 100);
        session.initial_load().await;

        assert!(session.begin_load_more().is_none());
        assert!(!session.status().has_more);
        assert_eq!(session.source.calls.borrow().len(), 1);
    }

    #[tokio::test]
    async fn test_floor_month_itself_is_fetched() {
        let source = source_with(vec![
            (ym(2020, 1), Some(page("jan", "2020-01-15", 1))),
            (ym(2019, 12), Some(page("dec", "2019-12-15", 1))),
        ]);
        let mut session = session(source, ym(2019, 12), 100);
        session.initial_load().await;

        assert_eq!(session.load_more().await, Some(PageOutcome::Added));
        assert_eq!(session.load_more().await, None);
        assert!(!session.status().has_more);
    }

    #[tokio::test]
    async fn test_capacity_bounds_store_during_pagination() {
        let source = source_with(vec![
            (ym(2020, 1), Some(page("jan", "2020-01-15", 3))),
            (ym(2019, 12), Some(page("dec", "2019-12-15", 3))),
        ]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 4);
        session.initial_load().await;
        session.load_more().await;

        let order: Vec<&str> = session.store().order().iter().map(String::as_str).collect();
        assert_eq!(order, vec!["jan2", "dec0", "dec1", "dec2"]);
        session.store().assert_consistent();
    }

    #[tokio::test]
    async fn test_poll_latest_prepends_only_new() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        session.initial_load().await;

        *session.source.latest.borrow_mut() = vec![
            test_article("jan0", "2020-01-15"),
            test_article("hot", "2020-01-31"),
        ];
        assert_eq!(session.poll_latest().await, 1);
        assert_eq!(session.poll_latest().await, 0);
        assert_eq!(session.store().order()[0], "hot");
    }

    #[tokio::test]
    async fn test_observers_see_each_transition() {
        let source = source_with(vec![(ym(2020, 1), Some(page("jan", "2020-01-15", 2)))]);
        let mut session = session(source, YearMonth::ARCHIVE_START, 100);
        let seen = Rc::new(RefCell::new(Vec::new()));
        session.subscribe(Box::new(Recorder(Rc::clone(&seen))));

        session.initial_load().await;

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].loading);
        assert!(!seen[1].loading);
        assert_eq!(seen[1].article_count, 2);
    }

    #[test]
    fn test_change_language_persists() {
        let mut session = session(FakeSource::default(), YearMonth::ARCHIVE_START, 100);
        assert_eq!(session.language(), Language::En);

        session.change_language(Language::Ru).unwrap();

        assert_eq!(session.language(), Language::Ru);
        assert_eq!(load_language(&*session.prefs), Language::Ru);
        assert_eq!(session.status().language, Language::Ru);
    }

    #[test]
    fn test_language_loaded_from_preferences() {
        let mut prefs = MemoryPreferences::default();
        save_language(&mut prefs, Language::Ru).unwrap();
        let store = ArticleStore::new(EvictionPolicy::default(), FixedOffset::east_opt(0).unwrap());
        let session = FeedSession::new(
            FakeSource::default(),
            store,
            Box::new(prefs),
            SessionConfig {
                start: ym(2020, 1),
                floor: YearMonth::ARCHIVE_START,
                max_capacity: 10,
                poll_latest: false,
            },
        );
        assert_eq!(session.language(), Language::Ru);
    }
}
