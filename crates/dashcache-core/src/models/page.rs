use serde::{Deserialize, Serialize};

/// One page of a listing endpoint.
///
/// The backend wraps the items under a field named after the resource
/// (`{"users": [...], "total": 208}`), so the field accepts each resource
/// name as an alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Page<T> {
    #[serde(alias = "users", alias = "products")]
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64) -> Self {
        Self { items, total }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            total: 0,
        }
    }
}

/// Number of pages needed to show `total` items at `page_size` per page.
pub fn page_count(total: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(u64::from(page_size))
}
