//! Cached resource stores.
//!
//! This module provides the `ResourceStore` that sits between presentation
//! code and the backend for one entity kind:
//! - `query`: query state, cache keys and endpoint selection
//! - `source`: the `Resource` and `ResourceSource` seams
//! - `resource`: the generic store (list/detail caches, coalescing, stale guard)
//! - `catalog`: product-only category filter and category catalog
//!
//! List pages are cached per `(page, search, category)` and details per id for
//! the lifetime of the store. Nothing is evicted and failures are never cached.

pub mod catalog;
pub mod query;
pub mod resource;
pub mod source;

pub use query::{CacheKey, Endpoint, ListRequest, QueryState};
pub use resource::{ListStatus, ResourceStore, StoreSnapshot};
pub use source::{CategorySource, Resource, ResourceSource};

use crate::api::ApiClient;
use crate::models::{Product, User};

pub type UserStore<S = ApiClient> = ResourceStore<User, S>;
pub type ProductStore<S = ApiClient> = ResourceStore<Product, S>;
