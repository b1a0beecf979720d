use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::api::ApiError;
use crate::models::{Category, Page, Product, User};

use super::query::ListRequest;

/// An entity kind served by the backend under `/<PATH>`.
pub trait Resource: Clone + Send + Sync + DeserializeOwned + 'static {
    /// Resource path segment, also the field name of the listing envelope
    const PATH: &'static str;
    /// Items per page for this entity's listings
    const PAGE_SIZE: u32;
}

impl Resource for User {
    const PATH: &'static str = "users";
    const PAGE_SIZE: u32 = 10;
}

impl Resource for Product {
    const PATH: &'static str = "products";
    const PAGE_SIZE: u32 = 12;
}

/// Where a `ResourceStore` gets its data from.
///
/// `ApiClient` is the production implementation; tests substitute their own.
#[async_trait]
pub trait ResourceSource<E: Resource>: Send + Sync + 'static {
    async fn fetch_list(&self, request: &ListRequest) -> Result<Page<E>, ApiError>;

    async fn fetch_detail(&self, id: u64) -> Result<E, ApiError>;
}

/// Source of the product category catalog.
#[async_trait]
pub trait CategorySource: Send + Sync + 'static {
    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError>;
}
