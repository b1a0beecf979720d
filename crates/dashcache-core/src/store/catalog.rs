//! Product-only store operations: category filtering and the category catalog.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::Product;

use super::resource::{spawn_fetch, ListStatus, ResourceStore};
use super::source::{CategorySource, ResourceSource};

impl<S> ResourceStore<Product, S>
where
    S: ResourceSource<Product> + CategorySource,
{
    /// Set the category filter, clearing the search text and returning to page 0.
    pub fn set_category_filter(&self, slug: impl Into<String>) -> ListStatus {
        let slug = slug.into();
        self.mutate(move |query| {
            query.category = slug;
            query.search.clear();
            query.page = 0;
        })
    }

    /// `set_category_filter` followed by `load_list`
    pub async fn filter_category(&self, slug: impl Into<String>) {
        let _ = self.set_category_filter(slug);
        self.load_list().await;
    }

    /// Fetch the category catalog unless it is already held.
    ///
    /// Concurrent callers share one request. A failure is logged and leaves the
    /// catalog empty so the next call tries again; it does not touch `error`.
    pub async fn load_categories(&self) {
        let fetch = {
            let mut state = self.state();
            if !state.categories.is_empty() {
                debug!("Category catalog already loaded");
                return;
            }

            let fetch = match state.categories_in_flight.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    debug!("Fetching category catalog");
                    let source = Arc::clone(&self.source);
                    let core = Arc::clone(&self.core);
                    let fetch = spawn_fetch(async move {
                        let result = source.fetch_categories().await;
                        let mut state = core.state();
                        state.categories_in_flight = None;
                        state.categories_loading = false;
                        match result {
                            Ok(categories) => {
                                if state.categories.is_empty() {
                                    debug!(count = categories.len(), "Category catalog loaded");
                                    state.categories = categories;
                                }
                            }
                            Err(e) => warn!(error = %e, "Failed to load category catalog"),
                        }
                        core.publish(&state);
                    });
                    state.categories_in_flight = Some(fetch.clone());
                    fetch
                }
            };
            state.categories_loading = true;
            self.publish(&state);
            fetch
        };

        fetch.await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;
    use crate::api::ApiError;
    use crate::models::{Category, Page};
    use crate::store::query::{Endpoint, ListRequest};

    #[derive(Default)]
    struct CatalogSource {
        list_requests: Mutex<Vec<ListRequest>>,
        category_calls: AtomicUsize,
        fail_categories: AtomicUsize,
        held_categories: Mutex<Option<oneshot::Receiver<()>>>,
    }

    fn product(id: u64, category: &str) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": format!("Product {}", id),
            "price": 10.0,
            "category": category,
        }))
        .expect("valid product json")
    }

    #[async_trait]
    impl ResourceSource<Product> for CatalogSource {
        async fn fetch_list(&self, request: &ListRequest) -> Result<Page<Product>, ApiError> {
            self.list_requests.lock().unwrap().push(request.clone());
            let category = match &request.endpoint {
                Endpoint::Category(slug) => slug.as_str(),
                _ => "misc",
            };
            Ok(Page::new(vec![product(request.skip + 1, category)], 30))
        }

        async fn fetch_detail(&self, id: u64) -> Result<Product, ApiError> {
            Ok(product(id, "misc"))
        }
    }

    #[async_trait]
    impl CategorySource for CatalogSource {
        async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
            self.category_calls.fetch_add(1, Ordering::SeqCst);
            let held = self.held_categories.lock().unwrap().take();
            if let Some(rx) = held {
                let _ = rx.await;
            }
            let failing = self
                .fail_categories
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(ApiError::ServerError("catalog down".to_string()));
            }
            Ok(vec![
                Category {
                    slug: "laptops".to_string(),
                    name: "Laptops".to_string(),
                    url: None,
                },
                Category {
                    slug: "smartphones".to_string(),
                    name: "Smartphones".to_string(),
                    url: None,
                },
            ])
        }
    }

    fn store() -> ResourceStore<Product, CatalogSource> {
        ResourceStore::new(CatalogSource::default())
    }

    #[test]
    fn test_filters_are_mutually_exclusive() {
        let store = store();
        let _ = store.set_search_text("phone");
        let _ = store.set_category_filter("electronics");
        let snap = store.snapshot();
        assert_eq!(snap.category_filter, "electronics");
        assert_eq!(snap.search_text, "");

        let _ = store.set_search_text("phone");
        let snap = store.snapshot();
        assert_eq!(snap.search_text, "phone");
        assert_eq!(snap.category_filter, "");
    }

    #[test]
    fn test_category_resets_page() {
        let store = store();
        let _ = store.set_page(4);
        assert!(store.set_category_filter("laptops").needs_fetch());
        assert_eq!(store.snapshot().page, 0);
    }

    #[tokio::test]
    async fn test_category_page_uses_category_endpoint() {
        let store = store();
        let _ = store.set_category_filter("laptops");
        store.go_to_page(1).await;

        let requests = store.source.list_requests.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].endpoint, Endpoint::Category("laptops".to_string()));
        assert_eq!(requests[0].skip, 12);
        assert_eq!(store.snapshot().items[0].category.as_deref(), Some("laptops"));
    }

    #[tokio::test]
    async fn test_same_page_different_filters_cached_separately() {
        let store = store();
        store.load_list().await;
        store.filter_category("laptops").await;
        store.search("").await;

        assert_eq!(store.source.list_requests.lock().unwrap().len(), 2);
        assert_eq!(store.cached_page_count(), 2);
    }

    #[tokio::test]
    async fn test_categories_fetched_once() {
        let store = store();
        store.load_categories().await;
        store.load_categories().await;
        store.load_categories().await;

        assert_eq!(store.source.category_calls.load(Ordering::SeqCst), 1);
        let snap = store.snapshot();
        assert_eq!(snap.categories.len(), 2);
        assert_eq!(snap.categories[0].display_name(), "Laptops");
        assert!(!snap.categories_loading);
    }

    #[tokio::test]
    async fn test_concurrent_category_loads_share_request() {
        let store = store();
        let (release, rx) = oneshot::channel();
        *store.source.held_categories.lock().unwrap() = Some(rx);

        tokio::join!(store.load_categories(), store.load_categories(), async {
            release.send(()).ok();
        });

        assert_eq!(store.source.category_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.snapshot().categories.len(), 2);
    }

    #[tokio::test]
    async fn test_category_failure_is_retryable_and_silent() {
        let store = store();
        store.source.fail_categories.store(1, Ordering::SeqCst);

        store.load_categories().await;
        let snap = store.snapshot();
        assert!(snap.categories.is_empty());
        assert!(!snap.categories_loading);
        assert!(snap.error.is_none());

        store.load_categories().await;
        assert_eq!(store.source.category_calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.snapshot().categories.len(), 2);
    }

    #[tokio::test]
    async fn test_abandoned_category_load_still_completes() {
        let store = store();
        let (release, rx) = oneshot::channel();
        *store.source.held_categories.lock().unwrap() = Some(rx);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), store.load_categories()).await;
        assert!(abandoned.is_err());
        assert!(store.snapshot().categories_loading);

        let mut snapshots = store.subscribe();
        release.send(()).ok();
        tokio::time::timeout(Duration::from_secs(1), snapshots.wait_for(|snap| !snap.categories_loading))
            .await
            .expect("catalog load finished")
            .expect("store alive");

        assert_eq!(store.snapshot().categories.len(), 2);
        store.load_categories().await;
        assert_eq!(store.source.category_calls.load(Ordering::SeqCst), 1);
    }
}
