//! Composition root for the dashboard's data layer.
//!
//! `Dashboard` owns one store per entity kind plus the session store. The
//! application creates exactly one and hands references to presentation code;
//! tests build their own on a mock backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::auth::SessionStore;
use crate::config::Config;
use crate::models::{Product, User};
use crate::store::{ListRequest, ProductStore, UserStore};

/// Headline counts for the landing screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_products: u64,
}

pub struct Dashboard {
    pub users: UserStore,
    pub products: ProductStore,
    pub session: SessionStore,
    client: Arc<ApiClient>,
}

impl Dashboard {
    pub fn new(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        debug!(base_url = %api.base_url(), ?cache_dir, "Dashboard configured");
        Ok(Self::with_client(api, cache_dir))
    }

    /// Wire the stores to `api`. A restored session's token is attached to the
    /// client every data read goes through.
    pub fn with_client(api: ApiClient, cache_dir: PathBuf) -> Self {
        let session = SessionStore::restore(api.clone(), cache_dir);
        let resource_client = match session.token() {
            Some(token) => api.with_token(token),
            None => api,
        };
        let client = Arc::new(resource_client);

        Self {
            users: UserStore::with_shared_source(Arc::clone(&client)),
            products: ProductStore::with_shared_source(Arc::clone(&client)),
            session,
            client,
        }
    }

    /// Fetch user and product totals concurrently
    pub async fn stats(&self) -> Result<DashboardStats, ApiError> {
        let single = ListRequest::first(1);
        let (users, products) = futures::try_join!(
            self.client.fetch_page::<User>(&single),
            self.client.fetch_page::<Product>(&single)
        )?;

        Ok(DashboardStats {
            total_users: users.total,
            total_products: products.total,
        })
    }
}
