//! Data-access and caching layer for the admin dashboard.
//!
//! Presentation code talks to two `ResourceStore`s (users and products) and a
//! `SessionStore`, all owned by a `Dashboard`. The stores turn page, search and
//! category changes into backend requests, cache every successful page and
//! entity for their lifetime, coalesce identical in-flight requests, and
//! publish loading-aware snapshots over `tokio::sync::watch`.

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod models;
pub mod store;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardStats};
pub use store::{ListStatus, ProductStore, ResourceStore, StoreSnapshot, UserStore};
