//! Generic cached resource store.
//!
//! A `ResourceStore` owns the query state, list and detail caches, and the
//! loading/error flags for one entity kind. Presentation code reads
//! `StoreSnapshot`s (directly or through a `watch` subscription) and drives
//! the store through its mutators and loaders.
//!
//! Every fetch runs in its own spawned task. The task writes the cache, clears
//! its in-flight entry and updates the view when the view is still waiting for
//! its key, so a caller that stops awaiting never strands a request.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::models::{page::page_count, Category, Page};

use super::query::{CacheKey, ListRequest, QueryState};
use super::source::{Resource, ResourceSource};

/// Completion of a spawned fetch task that several callers can await together.
pub(crate) type InFlight = Shared<BoxFuture<'static, ()>>;

/// Run `fetch` on the runtime and hand back a shareable completion handle.
pub(crate) fn spawn_fetch<F>(fetch: F) -> InFlight
where
    F: Future<Output = ()> + Send + 'static,
{
    let handle = tokio::spawn(fetch);
    async move {
        if let Err(e) = handle.await {
            warn!(error = %e, "Fetch task ended abnormally");
        }
    }
    .boxed()
    .shared()
}

/// Whether the query state left behind by a mutator is already cached.
#[must_use = "a query change may require calling load_list"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStatus {
    /// `load_list` will answer from the cache without a network call
    Cached,
    /// `load_list` must fetch (or join an in-flight fetch)
    NeedsFetch,
}

impl ListStatus {
    pub fn needs_fetch(self) -> bool {
        matches!(self, ListStatus::NeedsFetch)
    }
}

/// Point-in-time copy of everything presentation code may read.
///
/// The category fields belong to the product catalog. A user store never
/// sets them, so they stay empty there.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot<E> {
    pub items: Vec<E>,
    pub total: u64,
    pub is_loading: bool,
    pub error: Option<String>,
    pub page: u32,
    pub page_size: u32,
    pub search_text: String,
    /// Always empty for users
    pub category_filter: String,
    pub selected: Option<E>,
    pub selected_loading: bool,
    /// Always empty for users
    pub categories: Vec<Category>,
    /// Always false for users
    pub categories_loading: bool,
}

impl<E> StoreSnapshot<E> {
    pub fn page_count(&self) -> u64 {
        page_count(self.total, self.page_size)
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) + 1 < self.page_count()
    }
}

pub(crate) struct StoreState<E> {
    pub(crate) query: QueryState,

    // Current view
    pub(crate) items: Vec<E>,
    pub(crate) total: u64,
    pub(crate) is_loading: bool,
    pub(crate) error: Option<String>,

    // Selected entity view
    pub(crate) selected: Option<E>,
    pub(crate) selected_loading: bool,

    // Category catalog (only ever filled for products)
    pub(crate) categories: Vec<Category>,
    pub(crate) categories_loading: bool,

    list_cache: HashMap<CacheKey, Page<E>>,
    detail_cache: HashMap<u64, E>,

    list_in_flight: HashMap<CacheKey, InFlight>,
    detail_in_flight: HashMap<u64, InFlight>,
    pub(crate) categories_in_flight: Option<InFlight>,

    // What the views are waiting for; a response only reaches a view if it still waits for it
    list_waiting: Option<CacheKey>,
    detail_waiting: Option<u64>,
}

impl<E: Resource> StoreState<E> {
    fn new(page_size: u32) -> Self {
        Self {
            query: QueryState::new(page_size),
            items: Vec::new(),
            total: 0,
            is_loading: false,
            error: None,
            selected: None,
            selected_loading: false,
            categories: Vec::new(),
            categories_loading: false,
            list_cache: HashMap::new(),
            detail_cache: HashMap::new(),
            list_in_flight: HashMap::new(),
            detail_in_flight: HashMap::new(),
            categories_in_flight: None,
            list_waiting: None,
            detail_waiting: None,
        }
    }

    fn snapshot(&self) -> StoreSnapshot<E> {
        StoreSnapshot {
            items: self.items.clone(),
            total: self.total,
            is_loading: self.is_loading,
            error: self.error.clone(),
            page: self.query.page,
            page_size: self.query.page_size,
            search_text: self.query.search.clone(),
            category_filter: self.query.category.clone(),
            selected: self.selected.clone(),
            selected_loading: self.selected_loading,
            categories: self.categories.clone(),
            categories_loading: self.categories_loading,
        }
    }

    pub(crate) fn list_status(&self) -> ListStatus {
        if self.list_cache.contains_key(&self.query.key()) {
            ListStatus::Cached
        } else {
            ListStatus::NeedsFetch
        }
    }

    /// Record a finished list fetch for `key`
    fn finish_list(&mut self, key: &CacheKey, result: Result<Page<E>, ApiError>) {
        self.list_in_flight.remove(key);
        let waited = self.list_waiting.as_ref() == Some(key);

        match result {
            Ok(page) => {
                self.list_cache.entry(key.clone()).or_insert_with(|| page.clone());
                if waited {
                    self.items = page.items;
                    self.total = page.total;
                    self.error = None;
                } else {
                    debug!(resource = E::PATH, %key, "Discarding stale list response");
                }
            }
            Err(e) => {
                if waited {
                    warn!(resource = E::PATH, %key, error = %e, "List request failed");
                    self.error = Some(e.to_string());
                } else {
                    debug!(resource = E::PATH, %key, error = %e, "Discarding stale list failure");
                }
            }
        }

        if waited {
            self.list_waiting = None;
            self.is_loading = false;
        }
    }

    /// Record a finished detail fetch for `id`
    fn finish_detail(&mut self, id: u64, result: Result<E, ApiError>) {
        self.detail_in_flight.remove(&id);
        let waited = self.detail_waiting == Some(id);

        match result {
            Ok(entity) => {
                self.detail_cache.entry(id).or_insert_with(|| entity.clone());
                if waited {
                    self.selected = Some(entity);
                } else {
                    debug!(resource = E::PATH, id, "Discarding stale detail response");
                }
            }
            Err(e) => {
                if waited {
                    warn!(resource = E::PATH, id, error = %e, "Detail request failed");
                    self.error = Some(e.to_string());
                    self.selected = None;
                }
            }
        }

        if waited {
            self.detail_waiting = None;
            self.selected_loading = false;
        }
    }
}

/// State and snapshot channel, shared between a store and its fetch tasks.
pub(crate) struct StoreCore<E> {
    state: Mutex<StoreState<E>>,
    snapshot_tx: watch::Sender<StoreSnapshot<E>>,
}

impl<E: Resource> StoreCore<E> {
    pub(crate) fn state(&self) -> MutexGuard<'_, StoreState<E>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn publish(&self, state: &StoreState<E>) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}

/// Cache + fetch + state unit for one entity kind.
pub struct ResourceStore<E: Resource, S> {
    pub(crate) source: Arc<S>,
    pub(crate) core: Arc<StoreCore<E>>,
}

impl<E: Resource, S: ResourceSource<E>> ResourceStore<E, S> {
    pub fn new(source: S) -> Self {
        Self::with_shared_source(Arc::new(source))
    }

    /// Build a store on a source that other stores also use
    pub fn with_shared_source(source: Arc<S>) -> Self {
        let state = StoreState::new(E::PAGE_SIZE);
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Self {
            source,
            core: Arc::new(StoreCore {
                state: Mutex::new(state),
                snapshot_tx,
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn snapshot(&self) -> StoreSnapshot<E> {
        self.core.snapshot_tx.borrow().clone()
    }

    /// Receive a new snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<StoreSnapshot<E>> {
        self.core.snapshot_tx.subscribe()
    }

    pub fn query(&self) -> QueryState {
        self.state().query.clone()
    }

    /// Whether a listing page for `key` has been fetched successfully
    pub fn is_cached(&self, key: &CacheKey) -> bool {
        self.state().list_cache.contains_key(key)
    }

    pub fn is_detail_cached(&self, id: u64) -> bool {
        self.state().detail_cache.contains_key(&id)
    }

    pub fn cached_page_count(&self) -> usize {
        self.state().list_cache.len()
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Replace the page number. Does not fetch; no bounds check.
    pub fn set_page(&self, page: u32) -> ListStatus {
        self.mutate(|query| query.page = page)
    }

    /// Set the search text, clearing the category filter and returning to page 0.
    pub fn set_search_text(&self, text: impl Into<String>) -> ListStatus {
        let text = text.into();
        self.mutate(move |query| {
            query.search = text;
            query.category.clear();
            query.page = 0;
        })
    }

    /// Apply a query change. A pending list fetch for another key stops
    /// feeding the view, so items never disagree with the query.
    pub(crate) fn mutate(&self, change: impl FnOnce(&mut QueryState)) -> ListStatus {
        let mut state = self.state();
        change(&mut state.query);
        let key = state.query.key();
        if state.list_waiting.as_ref().is_some_and(|waiting| *waiting != key) {
            state.list_waiting = None;
            state.is_loading = false;
        }
        let status = state.list_status();
        debug!(resource = E::PATH, %key, ?status, "Query changed");
        self.publish(&state);
        status
    }

    /// `set_page` followed by `load_list`
    pub async fn go_to_page(&self, page: u32) {
        let _ = self.set_page(page);
        self.load_list().await;
    }

    /// `set_search_text` followed by `load_list`
    pub async fn search(&self, text: impl Into<String>) {
        let _ = self.set_search_text(text);
        self.load_list().await;
    }

    // =========================================================================
    // Loaders
    // =========================================================================

    /// Bring the current view in line with the current query state.
    ///
    /// A cached key is answered synchronously. Otherwise the matching endpoint
    /// is fetched, or an identical in-flight fetch is joined. Failures set
    /// `error` and are not cached, so calling again retries. Dropping the
    /// returned future does not cancel the fetch.
    pub async fn load_list(&self) {
        let fetch = {
            let mut state = self.state();
            let key = state.query.key();

            if let Some(page) = state.list_cache.get(&key).cloned() {
                debug!(resource = E::PATH, %key, "List cache hit");
                state.items = page.items;
                state.total = page.total;
                state.is_loading = false;
                state.error = None;
                state.list_waiting = None;
                self.publish(&state);
                return;
            }

            state.is_loading = true;
            state.error = None;
            state.list_waiting = Some(key.clone());

            let fetch = match state.list_in_flight.get(&key) {
                Some(pending) => {
                    debug!(resource = E::PATH, %key, "Joining in-flight list request");
                    pending.clone()
                }
                None => {
                    let request = ListRequest::for_query(&state.query);
                    debug!(resource = E::PATH, %key, ?request, "List cache miss, fetching");
                    let source = Arc::clone(&self.source);
                    let core = Arc::clone(&self.core);
                    let task_key = key.clone();
                    let fetch = spawn_fetch(async move {
                        let result = source.fetch_list(&request).await;
                        let mut state = core.state();
                        state.finish_list(&task_key, result);
                        core.publish(&state);
                    });
                    state.list_in_flight.insert(key, fetch.clone());
                    fetch
                }
            };

            self.publish(&state);
            fetch
        };

        fetch.await;
    }

    /// Load one entity into the selected view, from the detail cache when possible.
    pub async fn load_detail(&self, id: u64) {
        let fetch = {
            let mut state = self.state();

            if let Some(entity) = state.detail_cache.get(&id).cloned() {
                debug!(resource = E::PATH, id, "Detail cache hit");
                state.selected = Some(entity);
                state.selected_loading = false;
                state.detail_waiting = None;
                self.publish(&state);
                return;
            }

            state.selected = None;
            state.selected_loading = true;
            state.detail_waiting = Some(id);

            let fetch = match state.detail_in_flight.get(&id) {
                Some(pending) => pending.clone(),
                None => {
                    debug!(resource = E::PATH, id, "Detail cache miss, fetching");
                    let source = Arc::clone(&self.source);
                    let core = Arc::clone(&self.core);
                    let fetch = spawn_fetch(async move {
                        let result = source.fetch_detail(id).await;
                        let mut state = core.state();
                        state.finish_detail(id, result);
                        core.publish(&state);
                    });
                    state.detail_in_flight.insert(id, fetch.clone());
                    fetch
                }
            };

            self.publish(&state);
            fetch
        };

        fetch.await;
    }

    /// Drop the selected entity, e.g. when a detail screen goes away.
    ///
    /// A detail request still in flight will fill the cache when it lands but
    /// will not bring the entity back into the selected view.
    pub fn clear_selected(&self) {
        let mut state = self.state();
        state.detail_waiting = None;
        state.selected = None;
        state.selected_loading = false;
        self.publish(&state);
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn state(&self) -> MutexGuard<'_, StoreState<E>> {
        self.core.state()
    }

    pub(crate) fn publish(&self, state: &StoreState<E>) {
        self.core.publish(state);
    }
}

// ============================================================================
// Tests
// ============================================================================
