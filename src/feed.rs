//! Projection of the article store into display order.
//!
//! [`assemble`] is the only read path front ends use. It is pure and cheap
//! enough to run after every committed store mutation.

use crate::models::Article;
use crate::store::ArticleStore;
use serde::Serialize;

/// Number of placeholder cards shown while the first page loads.
pub const PLACEHOLDER_COUNT: usize = 10;

/// One row of the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FeedItem<'a> {
    /// Heading for a calendar day (`YYYY-MM-DD`).
    DateSeparator { date: &'a str },
    /// An article card.
    Article { article: &'a Article },
    /// Skeleton card shown during the initial load.
    Placeholder { index: usize },
}

/// Build the feed from a store snapshot.
///
/// While `loading`, returns [`PLACEHOLDER_COUNT`] placeholders and nothing
/// else. Otherwise days are emitted newest first, each followed by its
/// articles in stored order.
pub fn assemble(store: &ArticleStore, loading: bool) -> Vec<FeedItem<'_>> {
    if loading {
        return (0..PLACEHOLDER_COUNT)
            .map(|index| FeedItem::Placeholder { index })
            .collect();
    }

    let mut items = Vec::with_capacity(store.len() + store.by_date().len());
    // zero-padded keys: reverse lexicographic == reverse chronological
    for (date, ids) in store.by_date().iter().rev() {
        items.push(FeedItem::DateSeparator { date });
        items.extend(
            ids.iter()
                .filter_map(|id| store.get(id))
                .map(|article| FeedItem::Article { article }),
        );
    }
    items
}
