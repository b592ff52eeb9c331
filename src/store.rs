//! The article store: a bounded, deduplicated, day-grouped article cache.
//!
//! Three structures are kept consistent at all times:
//! - `articles`: id → [`Article`]
//! - `order`: ids in load/merge order, no duplicates
//! - `by_date`: `YYYY-MM-DD` → ids published that day, in `order` order
//!
//! The key set of `articles` always equals the set of ids in `order`, and each
//! id in `order` sits in exactly one day bucket. The day index is rebuilt from
//! `order` after every mutation rather than patched.
//!
//! The store also carries the status flags the presentation reads alongside
//! the feed (`loading`, `loading_more`, `has_more`, `error`).

use crate::models::Article;
use chrono::FixedOffset;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

/// End of the order sequence trimmed when the capacity is exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrimEnd {
    /// Drop from the start (the newest end of the feed).
    Front,
    /// Drop from the end (the oldest end of the feed).
    Back,
}

/// Which end each insertion direction evicts from.
///
/// Fixed for the lifetime of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictionPolicy {
    pub on_append: TrimEnd,
    pub on_prepend: TrimEnd,
}

impl Default for EvictionPolicy {
    /// Appends evict the earliest-inserted entries, prepends evict the
    /// last-displayed ones.
    fn default() -> Self {
        Self {
            on_append: TrimEnd::Front,
            on_prepend: TrimEnd::Back,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArticleStore {
    articles: HashMap<String, Article>,
    order: Vec<String>,
    by_date: BTreeMap<String, Vec<String>>,
    loading: bool,
    loading_more: bool,
    has_more: bool,
    error: Option<String>,
    eviction: EvictionPolicy,
    offset: FixedOffset,
}

impl ArticleStore {
    /// Create an empty store grouping days in the viewer's `offset`.
    pub fn new(eviction: EvictionPolicy, offset: FixedOffset) -> Self {
        Self {
            articles: HashMap::new(),
            order: Vec::new(),
            by_date: BTreeMap::new(),
            loading: false,
            loading_more: false,
            has_more: true,
            error: None,
            eviction,
            offset,
        }
    }

    /// Discard all state and install `articles` as the whole feed.
    ///
    /// Later duplicates of an id inside `articles` are ignored.
    #[instrument(level = "debug", skip_all, fields(incoming = articles.len()))]
    pub fn replace_all(&mut self, articles: Vec<Article>) {
        self.articles.clear();
        self.order.clear();
        for article in articles.into_iter().unique_by(|a| a.id.clone()) {
            self.order.push(article.id.clone());
            self.articles.insert(article.id.clone(), article);
        }
        self.rebuild_index();
        self.loading = false;
        self.error = None;
        debug!(len = self.order.len(), days = self.by_date.len(), "Replaced store contents");
    }

    /// Add an older page after the existing articles.
    ///
    /// Returns whether any article was actually added; `has_more` follows the
    /// same value so pagination stops once a page brings nothing new.
    #[instrument(level = "debug", skip_all, fields(incoming = articles.len(), max_capacity = max_capacity))]
    pub fn append(&mut self, articles: Vec<Article>, max_capacity: usize) -> bool {
        let fresh = self.take_unseen(articles);
        let added = !fresh.is_empty();

        if added {
            for article in fresh {
                self.order.push(article.id.clone());
                self.articles.insert(article.id.clone(), article);
            }
            self.evict(max_capacity, self.eviction.on_append);
            self.rebuild_index();
        }

        self.loading_more = false;
        self.has_more = added;
        debug!(added, len = self.order.len(), "Appended page");
        added
    }

    /// Insert newer articles before the existing ones.
    ///
    /// Returns how many articles were inserted. Nothing is touched when every
    /// incoming id is already present.
    #[instrument(level = "debug", skip_all, fields(incoming = articles.len(), max_capacity = max_capacity))]
    pub fn prepend(&mut self, articles: Vec<Article>, max_capacity: usize) -> usize {
        let fresh = self.take_unseen(articles);
        if fresh.is_empty() {
            return 0;
        }

        let inserted = fresh.len();
        let mut order: Vec<String> = Vec::with_capacity(inserted + self.order.len());
        for article in fresh {
            order.push(article.id.clone());
            self.articles.insert(article.id.clone(), article);
        }
        order.append(&mut self.order);
        self.order = order;

        self.evict(max_capacity, self.eviction.on_prepend);
        self.rebuild_index();
        debug!(inserted, len = self.order.len(), "Prepended articles");
        inserted
    }

    /// Return to the empty initial state, keeping the configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.eviction, self.offset);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn set_loading_more(&mut self, loading_more: bool) {
        self.loading_more = loading_more;
    }

    pub fn set_has_more(&mut self, has_more: bool) {
        self.has_more = has_more;
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
    }

    pub fn get(&self, id: &str) -> Option<&Article> {
        self.articles.get(id)
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn by_date(&self) -> &BTreeMap<String, Vec<String>> {
        &self.by_date
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn loading_more(&self) -> bool {
        self.loading_more
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    /// Incoming articles whose ids are neither stored nor repeated earlier in
    /// the batch, in input order.
    fn take_unseen(&self, articles: Vec<Article>) -> Vec<Article> {
        articles
            .into_iter()
            .filter(|a| !self.articles.contains_key(&a.id))
            .unique_by(|a| a.id.clone())
            .collect()
    }

    fn evict(&mut self, max_capacity: usize, end: TrimEnd) {
        if self.order.len() <= max_capacity {
            return;
        }
        let overflow = self.order.len() - max_capacity;
        let evicted: Vec<String> = match end {
            TrimEnd::Front => self.order.drain(..overflow).collect(),
            TrimEnd::Back => self.order.drain(max_capacity..).collect(),
        };
        for id in &evicted {
            self.articles.remove(id);
        }
        debug!(evicted = evicted.len(), ?end, "Evicted articles over capacity");
    }

    fn rebuild_index(&mut self) {
        let mut by_date: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for id in &self.order {
            if let Some(article) = self.articles.get(id) {
                by_date
                    .entry(article.day_key(&self.offset))
                    .or_default()
                    .push(id.clone());
            }
        }
        self.by_date = by_date;
    }

    /// Check the three-way consistency of the store.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        use std::collections::HashSet;

        let order_set: HashSet<&String> = self.order.iter().collect();
        assert_eq!(order_set.len(), self.order.len(), "duplicate ids in order");

        let key_set: HashSet<&String> = self.articles.keys().collect();
        assert_eq!(key_set, order_set, "article map and order disagree");

        let mut seen: HashSet<&String> = HashSet::new();
        for ids in self.by_date.values() {
            for id in ids {
                assert!(seen.insert(id), "id {} in more than one bucket", id);
            }
        }
        assert_eq!(seen, order_set, "day index and order disagree");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_article;

    fn store() -> ArticleStore {
        ArticleStore::new(EvictionPolicy::default(), FixedOffset::east_opt(0).unwrap())
    }

    fn ids(store: &ArticleStore) -> Vec<&str> {
        store.order().iter().map(String::as_str).collect()
    }

    fn batch(items: &[(&str, &str)]) -> Vec<Article> {
        items.iter().map(|(id, date)| test_article(id, date)).collect()
    }

    #[test]
    fn test_new_store_is_empty_with_more_to_load() {
        let store = store();
        assert!(store.is_empty());
        assert!(store.has_more());
        assert!(!store.loading());
        assert!(store.error().is_none());
        store.assert_consistent();
    }

    #[test]
    fn test_replace_all_installs_order_and_index() {
        let mut store = store();
        store.set_loading(true);
        store.set_error(Some("boom".to_string()));
        store.replace_all(batch(&[
            ("a", "2024-01-02T10:00:00+0000"),
            ("b", "2024-01-01T09:00:00+0000"),
            ("a", "2024-01-01T08:00:00+0000"),
        ]));

        assert_eq!(ids(&store), vec!["a", "b"]);
        assert_eq!(store.by_date().get("2024-01-02").unwrap(), &vec!["a".to_string()]);
        assert_eq!(store.by_date().get("2024-01-01").unwrap(), &vec!["b".to_string()]);
        assert!(!store.loading());
        assert!(store.error().is_none());
        store.assert_consistent();
    }

    #[test]
    fn test_replace_all_discards_previous_state() {
        let mut store = store();
        store.replace_all(batch(&[("a", "2024-01-02")]));
        store.replace_all(batch(&[("b", "2024-01-03")]));
        assert_eq!(ids(&store), vec!["b"]);
        assert!(store.get("a").is_none());
        store.assert_consistent();
    }

    #[test]
    fn test_append_adds_to_end_and_dedupes() {
        let mut store = store();
        store.replace_all(batch(&[("a", "2024-02-02"), ("b", "2024-02-01")]));
        store.set_loading_more(true);

        let added = store.append(
            batch(&[("b", "2024-02-01"), ("c", "2024-01-31"), ("c", "2024-01-31")]),
            100,
        );

        assert!(added);
        assert_eq!(ids(&store), vec!["a", "b", "c"]);
        assert!(!store.loading_more());
        assert!(store.has_more());
        store.assert_consistent();
    }

    #[test]
    fn test_append_only_duplicates_changes_nothing() {
        let mut store = store();
        store.replace_all(batch(&[("a", "2024-02-02"), ("b", "2024-02-01")]));
        let order_before = store.order().to_vec();
        let index_before = store.by_date().clone();

        let added = store.append(batch(&[("a", "2024-02-02"), ("b", "2024-02-01")]), 100);

        assert!(!added);
        assert_eq!(store.order(), order_before.as_slice());
        assert_eq!(store.by_date(), &index_before);
        assert!(!store.has_more());
        store.assert_consistent();
    }

    #[test]
    fn test_append_over_capacity_evicts_oldest_inserted() {
        let mut store = store();
        store.replace_all(batch(&[
            ("A", "2024-01-03"),
            ("B", "2024-01-02"),
            ("C", "2024-01-01"),
        ]));

        assert!(store.append(batch(&[("D", "2023-12-31")]), 3));

        assert_eq!(store.len(), 3);
        assert_eq!(ids(&store), vec!["B", "C", "D"]);
        assert!(store.get("A").is_none());
        assert!(store.by_date().get("2024-01-03").is_none());
        store.assert_consistent();
    }

    #[test]
    fn test_prepend_adds_to_front_and_evicts_back() {
        let mut store = store();
        store.replace_all(batch(&[("b", "2024-01-02"), ("c", "2024-01-01")]));

        let inserted = store.prepend(batch(&[("a", "2024-01-03"), ("b", "2024-01-02")]), 2);

        assert_eq!(inserted, 1);
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert!(store.get("c").is_none());
        store.assert_consistent();
    }

    #[test]
    fn test_prepend_all_duplicates_is_noop() {
        let mut store = store();
        store.replace_all(batch(&[("a", "2024-01-02")]));
        store.set_has_more(false);
        let before = store.by_date().clone();

        assert_eq!(store.prepend(batch(&[("a", "2024-01-02")]), 10), 0);
        assert_eq!(ids(&store), vec!["a"]);
        assert_eq!(store.by_date(), &before);
        assert!(!store.has_more());
    }

    #[test]
    fn test_custom_eviction_policy() {
        let policy = EvictionPolicy {
            on_append: TrimEnd::Back,
            on_prepend: TrimEnd::Front,
        };
        let mut store = ArticleStore::new(policy, FixedOffset::east_opt(0).unwrap());
        store.replace_all(batch(&[("a", "2024-01-03"), ("b", "2024-01-02")]));

        // the appended article itself is trimmed away
        assert!(store.append(batch(&[("c", "2024-01-01")]), 2));
        assert_eq!(ids(&store), vec!["a", "b"]);

        store.prepend(batch(&[("z", "2024-01-04")]), 2);
        assert_eq!(ids(&store), vec!["a", "b"]);
        assert!(store.get("z").is_none());
        store.assert_consistent();
    }

    #[test]
    fn test_day_buckets_follow_order() {
        let mut store = store();
        store.replace_all(batch(&[
            ("x", "2024-01-01T20:00:00+0000"),
            ("y", "2024-01-01T08:00:00+0000"),
        ]));
        store.prepend(batch(&[("w", "2024-01-01T23:00:00+0000")]), 10);
        assert_eq!(
            store.by_date().get("2024-01-01").unwrap(),
            &vec!["w".to_string(), "x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn test_mixed_sequences_stay_consistent() {
        let mut store = store();
        store.replace_all(batch(&[("a", "2024-01-05"), ("b", "2024-01-04")]));
        for round in 0..20 {
            let day = format!("2023-12-{:02}", (round % 28) + 1);
            let id = format!("p{}", round % 7);
            store.append(batch(&[(id.as_str(), day.as_str()), ("a", "2024-01-05")]), 6);
            let id = format!("n{}", round % 5);
            store.prepend(batch(&[(id.as_str(), "2024-02-01"), ("b", "2024-01-04")]), 6);
            assert!(store.len() <= 6);
            store.assert_consistent();
        }
    }

    #[test]
    fn test_reset_keeps_configuration() {
        let policy = EvictionPolicy {
            on_append: TrimEnd::Back,
            on_prepend: TrimEnd::Back,
        };
        let mut store = ArticleStore::new(policy, FixedOffset::east_opt(0).unwrap());
        store.replace_all(batch(&[("a", "2024-01-05")]));
        store.set_has_more(false);
        store.set_error(Some("x".to_string()));

        store.reset();

        assert!(store.is_empty());
        assert!(store.by_date().is_empty());
        assert!(store.has_more());
        assert!(store.error().is_none());
        assert_eq!(store.eviction(), policy);
    }
}
