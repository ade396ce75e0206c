//! Incremental post list
//!
//! [`PaginationState`] is a single-writer state object changed only through
//! its transition methods: a load is started with [`PaginationState::begin_load`],
//! which hands out the cursor to fetch and marks the state busy, and is then
//! either committed with [`PaginationState::complete_load`] or rolled back
//! with [`PaginationState::abort_load`]. Items are only ever appended.
//!
//! [`PostFeed`] drives those transitions against a [`ContentApi`].

use serde::Serialize;
use std::ops::Range;
use thiserror::Error;

use crate::content::{map_summary, ClientError, ContentApi, MapError, PostSummary, QueryOptions};
use crate::helpers::date::DateFormatter;

/// Why a load could not start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LoadRejected {
    #[error("no more pages")]
    Exhausted,
    #[error("a page is already loading")]
    InFlight,
}

/// Accumulated list of posts plus the cursor of the next page
#[derive(Debug, Clone, Serialize)]
pub struct PaginationState {
    items: Vec<PostSummary>,
    next_page: Option<String>,
    page: u32,
    #[serde(skip)]
    in_flight: bool,
}

impl PaginationState {
    /// State seeded with the first page
    pub fn new(items: Vec<PostSummary>, next_page: Option<String>) -> Self {
        Self {
            items,
            next_page,
            page: 1,
            in_flight: false,
        }
    }

    /// Posts in fetch order
    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Number of the last page loaded (starts at 1)
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// Start loading the next page, returning the cursor to fetch
    ///
    /// A null cursor always stops pagination, whatever the page number.
    pub fn begin_load(&mut self) -> Result<String, LoadRejected> {
        if self.in_flight {
            return Err(LoadRejected::InFlight);
        }
        let cursor = self.next_page.clone().ok_or(LoadRejected::Exhausted)?;
        self.in_flight = true;
        Ok(cursor)
    }

    /// Commit a loaded page; returns the index range of the appended items
    pub fn complete_load(
        &mut self,
        items: Vec<PostSummary>,
        next_page: Option<String>,
        page: u32,
    ) -> Range<usize> {
        let start = self.items.len();
        self.items.extend(items);
        self.next_page = next_page;
        self.page = page.max(1);
        self.in_flight = false;
        start..self.items.len()
    }

    /// Give up on the current load, leaving items and cursor as they were
    pub fn abort_load(&mut self) {
        self.in_flight = false;
    }
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Map(#[from] MapError),
}

/// Result of a `load_more` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched; `added` indexes the new items
    Loaded { page: u32, added: Range<usize> },
    /// The cursor was null, nothing was fetched
    Exhausted,
    /// Another load is still running, nothing was fetched
    Busy,
}

/// Post list that fetches further pages on demand
pub struct PostFeed<'a, C: ContentApi + ?Sized> {
    client: &'a C,
    dates: &'a DateFormatter,
    state: PaginationState,
}

impl<'a, C: ContentApi + ?Sized> PostFeed<'a, C> {
    /// Fetch the first page of `doc_type` and seed the feed with it
    pub async fn seed(
        client: &'a C,
        dates: &'a DateFormatter,
        doc_type: &str,
        page_size: u32,
    ) -> Result<PostFeed<'a, C>, FeedError> {
        let response = client
            .query_by_type(doc_type, &QueryOptions::page_size(page_size))
            .await?;
        let items = response
            .results
            .iter()
            .map(|doc| map_summary(doc, dates))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Seeded feed with {} posts (more: {})",
            items.len(),
            response.next_page.is_some()
        );

        Ok(Self::from_state(
            client,
            dates,
            PaginationState::new(items, response.next_page),
        ))
    }

    /// Resume from an existing state
    pub fn from_state(client: &'a C, dates: &'a DateFormatter, state: PaginationState) -> Self {
        Self {
            client,
            dates,
            state,
        }
    }

    pub fn state(&self) -> &PaginationState {
        &self.state
    }

    pub fn items(&self) -> &[PostSummary] {
        self.state.items()
    }

    pub fn has_more(&self) -> bool {
        self.state.has_more()
    }

    /// Fetch the page at the cursor and append its posts
    ///
    /// A page is applied whole or not at all: if fetching or mapping any
    /// document fails, the state is left unchanged and the error returned.
    pub async fn load_more(&mut self) -> Result<LoadOutcome, FeedError> {
        let cursor = match self.state.begin_load() {
            Ok(cursor) => cursor,
            Err(LoadRejected::Exhausted) => return Ok(LoadOutcome::Exhausted),
            Err(LoadRejected::InFlight) => return Ok(LoadOutcome::Busy),
        };

        // Rolls the load back on error and when this future is dropped
        let pending = PendingLoad {
            state: Some(&mut self.state),
        };
        let (items, next_page, page) = fetch_mapped(self.client, self.dates, &cursor).await?;
        let added = pending.commit(items, next_page, page);
        tracing::debug!("Loaded page {} ({} posts)", page, added.len());
        Ok(LoadOutcome::Loaded { page, added })
    }

    /// Load pages until the cursor runs out; returns the number of pages fetched
    pub async fn load_all(&mut self) -> Result<usize, FeedError> {
        let mut pages = 0;
        while let LoadOutcome::Loaded { .. } = self.load_more().await? {
            pages += 1;
        }
        Ok(pages)
    }
}

async fn fetch_mapped<C: ContentApi + ?Sized>(
    client: &C,
    dates: &DateFormatter,
    cursor: &str,
) -> Result<(Vec<PostSummary>, Option<String>, u32), FeedError> {
    let response = client.fetch_page(cursor).await?;
    let items = response
        .results
        .iter()
        .map(|doc| map_summary(doc, dates))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((items, response.next_page, response.page))
}

/// A started load; aborted on drop unless committed
struct PendingLoad<'s> {
    state: Option<&'s mut PaginationState>,
}

impl PendingLoad<'_> {
    fn commit(
        mut self,
        items: Vec<PostSummary>,
        next_page: Option<String>,
        page: u32,
    ) -> Range<usize> {
        match self.state.take() {
            Some(state) => state.complete_load(items, next_page, page),
            None => 0..0,
        }
    }
}

impl Drop for PendingLoad<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            state.abort_load();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::content::{RawDocument, SearchResponse};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory backend: `posts` pages keyed by cursor, documents by uid
    #[derive(Default)]
    pub(crate) struct FakeApi {
        pub first: SearchResponse,
        pub pages: HashMap<String, SearchResponse>,
        pub documents: HashMap<String, RawDocument>,
        pub fetched: Mutex<Vec<String>>,
        /// Makes the next `fetch_page` hang for a minute
        pub stall_next: AtomicBool,
    }

    pub(crate) fn doc(uid: &str) -> RawDocument {
        serde_json::from_value(json!({
            "id": format!("id-{}", uid),
            "uid": uid,
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "data": {
                "title": format!("Title {}", uid),
                "subtitle": "Sub",
                "author": "Ana",
                "banner": {"url": "https://images.example/banner.png"},
                "content": [{"heading": "Intro", "body": [{"type": "paragraph", "text": "um dois três"}]}]
            }
        }))
        .unwrap()
    }

    pub(crate) fn page(uids: &[&str], page: u32, next_page: Option<&str>) -> SearchResponse {
        SearchResponse {
            page,
            next_page: next_page.map(str::to_string),
            results: uids.iter().map(|uid| doc(uid)).collect(),
            ..Default::default()
        }
    }

    impl FakeApi {
        /// Backend serving `pages` in order through `cursor-N` URLs
        pub(crate) fn with_pages(pages: &[&[&str]]) -> Self {
            let mut api = FakeApi::default();
            for (i, uids) in pages.iter().enumerate() {
                let number = i as u32 + 1;
                let next = (i + 1 < pages.len()).then(|| format!("cursor-{}", number + 1));
                let response = page(uids, number, next.as_deref());
                for uid in uids.iter() {
                    api.documents.insert(uid.to_string(), doc(uid));
                }
                if i == 0 {
                    api.first = response;
                } else {
                    api.pages.insert(format!("cursor-{}", number), response);
                }
            }
            api
        }
    }

    #[async_trait]
    impl ContentApi for FakeApi {
        async fn query_by_type(
            &self,
            _doc_type: &str,
            _options: &QueryOptions,
        ) -> Result<SearchResponse, ClientError> {
            Ok(self.first.clone())
        }

        async fn get_by_uid(
            &self,
            _doc_type: &str,
            uid: &str,
        ) -> Result<Option<RawDocument>, ClientError> {
            Ok(self.documents.get(uid).cloned())
        }

        async fn fetch_page(&self, url: &str) -> Result<SearchResponse, ClientError> {
            self.fetched.lock().unwrap().push(url.to_string());
            if self.stall_next.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            self.pages.get(url).cloned().ok_or(ClientError::Status {
                status: 404,
                url: url.to_string(),
            })
        }
    }

    fn formatter() -> DateFormatter {
        DateFormatter::new("pt-BR", "", "%d %b %Y").unwrap()
    }

    fn uids(items: &[PostSummary]) -> Vec<&str> {
        items.iter().map(|p| p.uid.as_str()).collect()
    }

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: "15 mar 2021".to_string(),
            title: uid.to_string(),
            subtitle: String::new(),
            author: "Ana".to_string(),
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut state = PaginationState::new(vec![summary("a")], Some("next".to_string()));
        assert!(state.has_more());
        assert_eq!(state.page(), 1);

        let cursor = state.begin_load().unwrap();
        assert_eq!(cursor, "next");
        assert!(state.is_loading());
        assert_eq!(state.begin_load(), Err(LoadRejected::InFlight));

        let added = state.complete_load(vec![summary("b"), summary("c")], None, 2);
        assert_eq!(added, 1..3);
        assert!(!state.is_loading());
        assert!(!state.has_more());
        assert_eq!(state.page(), 2);
        assert_eq!(uids(state.items()), ["a", "b", "c"]);

        assert_eq!(state.begin_load(), Err(LoadRejected::Exhausted));
    }

    #[test]
    fn test_null_cursor_on_first_page_never_loads() {
        let mut state = PaginationState::new(vec![summary("only")], None);
        assert_eq!(state.page(), 1);
        assert_eq!(state.begin_load(), Err(LoadRejected::Exhausted));
        assert!(!state.is_loading());
    }

    #[test]
    fn test_abort_keeps_state() {
        let mut state = PaginationState::new(vec![summary("a")], Some("next".to_string()));
        state.begin_load().unwrap();
        state.abort_load();
        assert!(!state.is_loading());
        assert_eq!(state.next_page(), Some("next"));
        assert_eq!(uids(state.items()), ["a"]);
    }

    #[test]
    fn test_page_number_never_below_one() {
        let mut state = PaginationState::new(Vec::new(), Some("next".to_string()));
        state.begin_load().unwrap();
        state.complete_load(Vec::new(), None, 0);
        assert_eq!(state.page(), 1);
    }

    #[tokio::test]
    async fn test_load_more_appends_in_order() {
        let api = FakeApi::with_pages(&[&["p1"], &["p2a", "p2b"], &["p3"]]);
        let dates = formatter();
        let mut feed = PostFeed::seed(&api, &dates, "posts", 1).await.unwrap();
        assert_eq!(uids(feed.items()), ["p1"]);
        assert_eq!(feed.items()[0].first_publication_date, "15 mar 2021");

        let outcome = feed.load_more().await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                page: 2,
                added: 1..3
            }
        );
        assert_eq!(uids(feed.items()), ["p1", "p2a", "p2b"]);
        assert_eq!(feed.state().page(), 2);
        assert_eq!(feed.state().next_page(), Some("cursor-3"));
    }

    #[tokio::test]
    async fn test_load_more_is_not_idempotent() {
        let api = FakeApi::with_pages(&[&["a"], &["b"], &["c"]]);
        let dates = formatter();
        let mut feed = PostFeed::seed(&api, &dates, "posts", 1).await.unwrap();

        let mut previous = feed.items().len();
        while feed.has_more() {
            feed.load_more().await.unwrap();
            assert!(feed.items().len() > previous);
            previous = feed.items().len();
        }
        assert_eq!(uids(feed.items()), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_exhausted_feed_does_not_fetch() {
        let api = FakeApi::with_pages(&[&["only"]]);
        let dates = formatter();
        let mut feed = PostFeed::seed(&api, &dates, "posts", 1).await.unwrap();
        assert!(!feed.has_more());

        let before = feed.items().to_vec();
        assert_eq!(feed.load_more().await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(feed.items(), before.as_slice());
        assert!(api.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeated_uids_are_kept() {
        let api = FakeApi::with_pages(&[&["same", "other"], &["same"]]);
        let dates = formatter();
        let mut feed = PostFeed::seed(&api, &dates, "posts", 2).await.unwrap();
        assert_eq!(feed.load_all().await.unwrap(), 1);
        assert_eq!(uids(feed.items()), ["same", "other", "same"]);
    }

    #[tokio::test]
    async fn test_busy_state_skips_fetch() {
        let api = FakeApi::with_pages(&[&["a"], &["b"]]);
        let dates = formatter();
        let mut state = PaginationState::new(Vec::new(), Some("cursor-2".to_string()));
        state.begin_load().unwrap();

        let mut feed = PostFeed::from_state(&api, &dates, state);
        assert_eq!(feed.load_more().await.unwrap(), LoadOutcome::Busy);
        assert!(api.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_state_untouched() {
        let api = FakeApi::with_pages(&[&["a"]]);
        let dates = formatter();
        let state = PaginationState::new(Vec::new(), Some("cursor-gone".to_string()));
        let mut feed = PostFeed::from_state(&api, &dates, state);

        let err = feed.load_more().await.unwrap_err();
        assert!(matches!(err, FeedError::Client(ClientError::Status { status: 404, .. })));
        assert!(!feed.state().is_loading());
        assert_eq!(feed.state().next_page(), Some("cursor-gone"));
        assert!(feed.items().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_load_can_be_retried() {
        let api = FakeApi::with_pages(&[&["a"], &["b"]]);
        api.stall_next.store(true, Ordering::SeqCst);
        let dates = formatter();
        let mut feed = PostFeed::seed(&api, &dates, "posts", 1).await.unwrap();

        let timed_out = tokio::time::timeout(Duration::from_millis(50), feed.load_more()).await;
        assert!(timed_out.is_err());
        assert!(!feed.state().is_loading());
        assert_eq!(feed.state().next_page(), Some("cursor-2"));
        assert_eq!(uids(feed.items()), ["a"]);

        let outcome = feed.load_more().await.unwrap();
        assert_eq!(
            outcome,
            LoadOutcome::Loaded {
                page: 2,
                added: 1..2
            }
        );
        assert_eq!(uids(feed.items()), ["a", "b"]);
        assert_eq!(api.fetched.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_document_rejects_whole_page() {
        let mut api = FakeApi::with_pages(&[&["a"], &["b", "c"]]);
        let broken = api.pages.get_mut("cursor-2").unwrap();
        broken.results[1].first_publication_date = Some("garbage".to_string());

        let dates = formatter();
        let mut feed = PostFeed::seed(&api, &dates, "posts", 1).await.unwrap();
        let err = feed.load_more().await.unwrap_err();
        assert!(matches!(err, FeedError::Map(MapError::InvalidDate { .. })));
        assert_eq!(uids(feed.items()), ["a"]);
        assert!(feed.has_more());
    }
}
