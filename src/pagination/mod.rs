//! Paged list loading: initial fetch, pull-to-refresh and "load more".
//!
//! [`PaginatedFetch`] drives one list against a [`PageFetcher`]. Its state is
//! published through a [`tokio::sync::watch`] channel so a view can redraw on
//! every change. Fetch errors never escape: they end up as flags in
//! [`FeedState`].

mod endpoint;

pub use endpoint::EndpointPages;

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

use crate::api::Paginated;

/// Source of pages for one list
#[allow(async_fn_in_trait)]
pub trait PageFetcher<T> {
    /// Fetch the first page
    async fn fetch_first(&self) -> Result<Paginated<T>>;

    /// Fetch the page behind a `next` cursor
    async fn fetch_url(&self, url: &str) -> Result<Paginated<T>>;
}

/// Observable state of a paged list
#[derive(Debug, Clone, PartialEq)]
pub struct FeedState<T> {
    /// Loaded items, in server order
    pub data: Vec<T>,
    /// Whether the first fetch has finished, successfully or not
    pub initial_fetch_complete: bool,
    /// Whether the last initial fetch or refresh failed
    pub has_initial_fetch_error: bool,
    /// Cursor of the next page
    pub fetch_next_url: Option<String>,
    /// Whether a next-page request is running
    pub fetch_next_loading: bool,
    /// Whether the last next-page request failed
    pub has_fetch_next_error: bool,
    /// Whether a refresh is running
    pub refreshing: bool,
    /// Total item count reported by the server
    pub total_count: u64,
    /// Endpoint-specific extra payload of the last page
    pub extra_data: Option<serde_json::Value>,
    generation: u64,
}

impl<T> Default for FeedState<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            initial_fetch_complete: false,
            has_initial_fetch_error: false,
            fetch_next_url: None,
            fetch_next_loading: false,
            has_fetch_next_error: false,
            refreshing: false,
            total_count: 0,
            extra_data: None,
            generation: 0,
        }
    }
}

impl<T> FeedState<T> {
    /// Whether another page can be requested right now.
    pub const fn can_fetch_next(&self) -> bool {
        self.fetch_next_url.is_some() && !self.fetch_next_loading
    }
}

/// Clears a busy flag when the request holding it ends, even if its future is
/// dropped midway.
struct BusyFlag<'a, T> {
    state: &'a watch::Sender<FeedState<T>>,
    flag: fn(&mut FeedState<T>) -> &mut bool,
    generation: u64,
}

impl<T> Drop for BusyFlag<'_, T> {
    fn drop(&mut self) {
        let generation = self.generation;
        let flag = self.flag;
        self.state.send_if_modified(|s| {
            if s.generation != generation || !*flag(s) {
                return false;
            }
            *flag(s) = false;
            true
        });
    }
}

/// State machine for one paged list
pub struct PaginatedFetch<T, F> {
    state: watch::Sender<FeedState<T>>,
    source: Mutex<Arc<F>>,
    enabled: AtomicBool,
}

impl<T, F> PaginatedFetch<T, F>
where
    F: PageFetcher<T>,
{
    /// Create an idle list. Nothing is fetched until [`load`](Self::load).
    pub fn new(source: F) -> Self {
        let (state, _) = watch::channel(FeedState::default());
        Self {
            state,
            source: Mutex::new(Arc::new(source)),
            enabled: AtomicBool::new(true),
        }
    }

    /// Enable or disable automatic loading.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Current state
    pub fn state(&self) -> watch::Ref<'_, FeedState<T>> {
        self.state.borrow()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<FeedState<T>> {
        self.state.subscribe()
    }

    fn source(&self) -> Arc<F> {
        Arc::clone(&self.source.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Run the initial fetch, unless disabled.
    pub async fn load(&self) {
        if self.enabled.load(Ordering::SeqCst) {
            self.initial_fetch().await;
        }
    }

    /// Switch to a different source (e.g. another profile), reset every
    /// field to its default and start over.
    ///
    /// Responses to requests made against the previous source are discarded.
    pub async fn reset_source(&self, source: F) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = Arc::new(source);
        self.state.send_modify(|s| {
            let generation = s.generation + 1;
            *s = FeedState::default();
            s.generation = generation;
        });
        self.load().await;
    }

    async fn initial_fetch(&self) {
        let generation = self.generation();
        let result = self.source().fetch_first().await;

        if let Err(e) = &result {
            tracing::warn!("Initial fetch failed: {e:#}");
        }
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            match result {
                Ok(page) => {
                    s.data = page.results;
                    s.fetch_next_url = page.next;
                    s.total_count = page.count;
                    s.extra_data = page.extra_data;
                    s.has_initial_fetch_error = false;
                    s.has_fetch_next_error = false;
                }
                Err(_) => {
                    s.data.clear();
                    s.fetch_next_url = None;
                    s.total_count = 0;
                    s.extra_data = None;
                    s.has_initial_fetch_error = true;
                }
            }
            s.initial_fetch_complete = true;
            true
        });
    }

    /// Reload the first page, replacing everything loaded so far.
    pub async fn refresh(&self) {
        self.refresh_with(|| {}).await;
    }

    /// Like [`refresh`](Self::refresh), running `on_refresh` (e.g. haptic
    /// feedback) once the refreshing flag is set.
    ///
    /// Requests still running from before the refresh, including a pending
    /// [`fetch_next`](Self::fetch_next), are discarded when they finish.
    pub async fn refresh_with(&self, on_refresh: impl FnOnce()) {
        let mut generation = 0;
        self.state.send_modify(|s| {
            s.generation += 1;
            s.refreshing = true;
            s.fetch_next_loading = false;
            generation = s.generation;
        });
        let _busy = BusyFlag {
            state: &self.state,
            flag: |s| &mut s.refreshing,
            generation,
        };

        on_refresh();
        self.initial_fetch().await;
    }

    /// Append the next page. Does nothing without a cursor or while another
    /// next-page request is running.
    pub async fn fetch_next(&self) {
        let mut request = None;
        self.state.send_if_modified(|s| {
            if !s.can_fetch_next() {
                return false;
            }
            s.fetch_next_loading = true;
            request = s.fetch_next_url.clone().map(|url| (url, s.generation));
            true
        });
        let Some((url, generation)) = request else {
            return;
        };
        let _busy = BusyFlag {
            state: &self.state,
            flag: |s| &mut s.fetch_next_loading,
            generation,
        };

        let result = self.source().fetch_url(&url).await;

        if let Err(e) = &result {
            tracing::warn!("Fetching next page failed: {e:#}");
        }
        self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            match result {
                Ok(page) => {
                    s.data.extend(page.results);
                    s.fetch_next_url = page.next;
                    s.total_count = page.count;
                    s.extra_data = page.extra_data;
                    s.has_fetch_next_error = false;
                }
                Err(_) => s.has_fetch_next_error = true,
            }
            true
        });
    }

    /// Edit the loaded items locally, e.g. after liking a post.
    pub fn update_items(&self, update: impl FnOnce(Vec<T>) -> Vec<T>) {
        self.state.send_modify(|s| {
            let items = std::mem::take(&mut s.data);
            s.data = update(items);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Identified, update_item_by_id};
    use anyhow::bail;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[derive(Debug, Clone, PartialEq)]
    struct Pet(u32);

    impl Identified for Pet {
        fn item_id(&self) -> String {
            self.0.to_string()
        }
    }

    /// Scripted responses, consumed in order
    #[derive(Default)]
    struct Script {
        first: Mutex<VecDeque<Result<Paginated<Pet>>>>,
        next: Mutex<VecDeque<Result<Paginated<Pet>>>>,
        requested_urls: Mutex<Vec<String>>,
        calls: AtomicUsize,
        gate: Option<Notify>,
    }

    impl Script {
        fn first(self, page: Result<Paginated<Pet>>) -> Self {
            self.first.lock().unwrap().push_back(page);
            self
        }

        fn next(self, page: Result<Paginated<Pet>>) -> Self {
            self.next.lock().unwrap().push_back(page);
            self
        }

        fn gated(mut self) -> Self {
            self.gate = Some(Notify::new());
            self
        }
    }

    impl PageFetcher<Pet> for Script {
        async fn fetch_first(&self) -> Result<Paginated<Pet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.first.lock().unwrap().pop_front() {
                Some(page) => page,
                None => bail!("no first page scripted"),
            }
        }

        async fn fetch_url(&self, url: &str) -> Result<Paginated<Pet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested_urls.lock().unwrap().push(url.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            match self.next.lock().unwrap().pop_front() {
                Some(page) => page,
                None => bail!("no next page scripted"),
            }
        }
    }

    fn page(ids: &[u32]) -> Paginated<Pet> {
        Paginated::single(ids.iter().copied().map(Pet).collect())
    }

    #[tokio::test]
    async fn test_initial_fetch_populates_state() {
        let feed = PaginatedFetch::new(
            Script::default().first(Ok(page(&[1, 2]).with_next("url2").with_count(5))),
        );
        assert!(!feed.state().initial_fetch_complete);

        feed.load().await;

        let state = feed.state();
        assert_eq!(state.data, vec![Pet(1), Pet(2)]);
        assert_eq!(state.fetch_next_url.as_deref(), Some("url2"));
        assert_eq!(state.total_count, 5);
        assert!(state.initial_fetch_complete);
        assert!(!state.has_initial_fetch_error);
    }

    #[tokio::test]
    async fn test_initial_fetch_error_still_completes() {
        let feed = PaginatedFetch::new(Script::default().first(Err(anyhow::anyhow!("offline"))));
        feed.load().await;

        let state = feed.state();
        assert!(state.initial_fetch_complete);
        assert!(state.has_initial_fetch_error);
        assert!(state.data.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_feed_does_not_load() {
        let feed = PaginatedFetch::new(Script::default().first(Ok(page(&[1]))));
        feed.set_enabled(false);
        feed.load().await;
        assert!(!feed.state().initial_fetch_complete);
    }

    #[tokio::test]
    async fn test_fetch_next_appends_and_moves_cursor() {
        let feed = PaginatedFetch::new(
            Script::default()
                .first(Ok(page(&[1, 2]).with_next("url2").with_count(4)))
                .next(Ok(page(&[3, 4]).with_count(4))),
        );
        feed.load().await;
        feed.fetch_next().await;

        let state = feed.state();
        assert_eq!(state.data, vec![Pet(1), Pet(2), Pet(3), Pet(4)]);
        assert_eq!(state.fetch_next_url, None);
        assert!(!state.fetch_next_loading);
        assert!(!state.can_fetch_next());
    }

    #[tokio::test]
    async fn test_fetch_next_error_keeps_data() {
        let feed = PaginatedFetch::new(
            Script::default()
                .first(Ok(page(&[1, 2]).with_next("url2")))
                .next(Err(anyhow::anyhow!("timeout"))),
        );
        feed.load().await;
        feed.fetch_next().await;

        let state = feed.state();
        assert_eq!(state.data.len(), 2);
        assert!(state.has_fetch_next_error);
        assert!(!state.fetch_next_loading);
        // Cursor is kept so the user can retry.
        assert_eq!(state.fetch_next_url.as_deref(), Some("url2"));
    }

    #[tokio::test]
    async fn test_fetch_next_without_cursor_is_noop() {
        let feed = PaginatedFetch::new(Script::default().first(Ok(page(&[1]))));
        feed.load().await;
        feed.fetch_next().await;

        assert_eq!(feed.source().calls.load(Ordering::SeqCst), 1);
        assert_eq!(feed.state().data, vec![Pet(1)]);
    }

    #[tokio::test]
    async fn test_overlapping_fetch_next_issues_one_request() {
        let script = Script::default()
            .first(Ok(page(&[1]).with_next("url2")))
            .next(Ok(page(&[2])))
            .gated();
        script.gate.as_ref().unwrap().notify_one();
        let feed = PaginatedFetch::new(script);
        feed.load().await;

        let release = async {
            tokio::task::yield_now().await;
            assert!(feed.state().fetch_next_loading);
            feed.source().gate.as_ref().unwrap().notify_one();
        };
        tokio::join!(feed.fetch_next(), feed.fetch_next(), release);

        assert_eq!(*feed.source().requested_urls.lock().unwrap(), vec!["url2"]);
        assert_eq!(feed.state().data, vec![Pet(1), Pet(2)]);
    }

    #[tokio::test]
    async fn test_refresh_replaces_data_and_runs_side_effect() {
        let feed = PaginatedFetch::new(
            Script::default()
                .first(Ok(page(&[1, 2]).with_next("url2")))
                .first(Ok(page(&[7]))),
        );
        feed.load().await;

        let mut rx = feed.subscribe();
        let mut buzzed = false;
        feed.refresh_with(|| buzzed = true).await;

        assert!(buzzed);
        assert!(rx.has_changed().unwrap());
        let state = rx.borrow_and_update();
        assert_eq!(state.data, vec![Pet(7)]);
        assert_eq!(state.fetch_next_url, None);
        assert!(!state.refreshing);
    }

    #[tokio::test]
    async fn test_failed_refresh_resets_counts() {
        let mut first = page(&[1, 2]).with_next("url2").with_count(5);
        first.extra_data = Some(serde_json::json!({ "unread": 2 }));
        let feed = PaginatedFetch::new(
            Script::default()
                .first(Ok(first))
                .first(Err(anyhow::anyhow!("offline"))),
        );
        feed.load().await;
        feed.refresh().await;

        let state = feed.state();
        assert!(state.has_initial_fetch_error);
        assert!(state.data.is_empty());
        assert_eq!(state.total_count, 0);
        assert_eq!(state.extra_data, None);
        assert_eq!(state.fetch_next_url, None);
    }

    #[tokio::test]
    async fn test_refresh_discards_pending_fetch_next() {
        let script = Script::default()
            .first(Ok(page(&[1, 2]).with_next("url2")))
            .first(Ok(page(&[0, 1, 2]).with_next("url2b")))
            .next(Ok(page(&[2, 3]).with_next("url3")))
            .next(Ok(page(&[3])))
            .gated();
        script.gate.as_ref().unwrap().notify_one();
        let feed = PaginatedFetch::new(script);
        feed.load().await;
        let gate = || feed.source().gate.as_ref().unwrap().notify_one();

        let mut stale_next = tokio_test::task::spawn(feed.fetch_next());
        tokio_test::assert_pending!(stale_next.poll());
        // Lets the page-2 request finish, but it is not polled until after
        // the refresh.
        gate();

        let release = async {
            tokio::task::yield_now().await;
            gate();
        };
        tokio::join!(feed.refresh(), release);
        assert_eq!(feed.state().data, vec![Pet(0), Pet(1), Pet(2)]);
        assert!(!feed.state().fetch_next_loading);

        tokio_test::assert_ready!(stale_next.poll());
        drop(stale_next);
        {
            let state = feed.state();
            assert_eq!(state.data, vec![Pet(0), Pet(1), Pet(2)]);
            assert_eq!(state.fetch_next_url.as_deref(), Some("url2b"));
            assert!(!state.has_fetch_next_error);
        }

        gate();
        feed.fetch_next().await;
        assert_eq!(feed.state().data, vec![Pet(0), Pet(1), Pet(2), Pet(3)]);
        assert_eq!(
            *feed.source().requested_urls.lock().unwrap(),
            vec!["url2", "url2b"]
        );
    }

    #[tokio::test]
    async fn test_refreshing_flag_is_set_during_refresh() {
        let script = Script::default().first(Ok(page(&[1]))).gated();
        let feed = PaginatedFetch::new(script);

        let observe = async {
            tokio::task::yield_now().await;
            assert!(feed.state().refreshing);
            feed.source().gate.as_ref().unwrap().notify_one();
        };
        tokio::join!(feed.refresh(), observe);

        assert!(!feed.state().refreshing);
        assert!(feed.state().initial_fetch_complete);
    }

    #[tokio::test]
    async fn test_dropped_fetch_next_clears_loading() {
        let script = Script::default()
            .first(Ok(page(&[1]).with_next("url2")))
            .gated();
        script.gate.as_ref().unwrap().notify_one();
        let feed = PaginatedFetch::new(script);
        feed.load().await;

        {
            let mut pending = tokio_test::task::spawn(feed.fetch_next());
            tokio_test::assert_pending!(pending.poll());
            assert!(feed.state().fetch_next_loading);
        }

        assert!(!feed.state().fetch_next_loading);
        assert!(feed.state().can_fetch_next());
    }

    #[tokio::test]
    async fn test_reset_source_discards_old_state() {
        let feed = PaginatedFetch::new(Script::default().first(Ok(page(&[1, 2]).with_next("url2"))));
        feed.load().await;

        feed.reset_source(Script::default().first(Ok(page(&[9])))).await;

        let state = feed.state();
        assert_eq!(state.data, vec![Pet(9)]);
        assert_eq!(state.fetch_next_url, None);
        assert!(state.initial_fetch_complete);
    }

    #[tokio::test]
    async fn test_stale_response_after_reset_is_ignored() {
        let old = Script::default().first(Ok(page(&[1]))).gated();
        let feed = PaginatedFetch::new(old);

        let switch = async {
            tokio::task::yield_now().await;
            let stale_source = feed.source();
            feed.reset_source(Script::default().first(Ok(page(&[5])))).await;
            stale_source.gate.as_ref().unwrap().notify_one();
        };
        tokio::join!(feed.load(), switch);

        assert_eq!(feed.state().data, vec![Pet(5)]);
    }

    #[tokio::test]
    async fn test_update_items_locally() {
        let feed = PaginatedFetch::new(Script::default().first(Ok(page(&[1, 2]))));
        feed.load().await;

        feed.update_items(|items| update_item_by_id(items, 2, |_| Pet(20)));
        assert_eq!(feed.state().data, vec![Pet(1), Pet(20)]);
    }
}
