//! API client for communicating with the dashboard REST API.
//!
//! This module provides the `ApiClient` struct for listing, searching and
//! fetching users and products, reading the product category catalog, and
//! logging in.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{Category, Page};
use crate::store::{CategorySource, ListRequest, Resource, ResourceSource};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when the config does not name one
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Lifetime requested for login tokens, in minutes
pub const TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
/// 1 second is polite to the server while not making users wait too long.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    #[serde(rename = "expiresInMins")]
    expires_in_mins: i64,
}

/// Successful `/auth/login` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// API client for the dashboard backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the default backend
    pub fn new() -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_BASE_URL, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    /// Create a client for the backend and timeout named in `config`
    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::with_base_url(&config.api_base_url(), config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ApiError::InvalidResponse(format!("Invalid base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidResponse(format!("Invalid base URL {}", base_url)));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            token: Some(token),
        }
    }

    /// Build `<base>/<segments...>?<query>`, percent-encoding every part
    fn endpoint(&self, segments: &[&str], query: &[(&str, String)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        url
    }

    fn auth_headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid token: {}", e)))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            // Rate limited - signal to retry
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    fn parse_body<T: DeserializeOwned>(url: &Url, text: &str) -> Result<T, ApiError> {
        serde_json::from_str(text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            debug!(%url, body = %preview, "Unparseable response body");
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", url, e))
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            debug!(%url, "GET");
            let response = self
                .client
                .get(url.clone())
                .headers(self.auth_headers()?)
                .send()
                .await?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let text = response.text().await?;
                    return Self::parse_body(&url, &text);
                }
                None => {
                    // Rate limited
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(%url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    // ===== Authentication =====

    /// Exchange credentials for an access token and the user's identity
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let url = self.endpoint(&["auth", "login"], &[]);
        let body = LoginRequest {
            username,
            password,
            expires_in_mins: TOKEN_LIFETIME_MINUTES,
        };

        let response = self.client.post(url.clone()).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = %status, "Login response received");

        if !status.is_success() {
            return Err(ApiError::from_login_status(status, &text));
        }

        Self::parse_body(&url, &text)
    }

    // ===== Data Fetching Methods =====

    /// Fetch one listing page for resource `E`
    pub async fn fetch_page<E: Resource>(&self, request: &ListRequest) -> Result<Page<E>, ApiError> {
        let url = self.endpoint(&request.path_segments(E::PATH), &request.query_pairs());
        let page: Page<E> = self.get(url).await?;
        debug!(resource = E::PATH, count = page.items.len(), total = page.total, "Page received");
        Ok(page)
    }

    /// Fetch a single entity of resource `E` by id
    pub async fn fetch_entity<E: Resource>(&self, id: u64) -> Result<E, ApiError> {
        let id = id.to_string();
        let url = self.endpoint(&[E::PATH, id.as_str()], &[]);
        self.get(url).await
    }

    /// Fetch the product category catalog
    pub async fn fetch_category_catalog(&self) -> Result<Vec<Category>, ApiError> {
        let url = self.endpoint(&["products", "categories"], &[]);
        self.get(url).await
    }
}

#[async_trait]
impl<E: Resource> ResourceSource<E> for ApiClient {
    async fn fetch_list(&self, request: &ListRequest) -> Result<Page<E>, ApiError> {
        self.fetch_page(request).await
    }

    async fn fetch_detail(&self, id: u64) -> Result<E, ApiError> {
        self.fetch_entity(id).await
    }
}

#[async_trait]
impl CategorySource for ApiClient {
    async fn fetch_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.fetch_category_catalog().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Endpoint, QueryState};

    fn client() -> ApiClient {
        ApiClient::with_base_url("https://api.example.com", Duration::from_secs(5))
            .expect("Failed to build test client")
    }

    #[test]
    fn test_endpoint_plain_listing() {
        let request = ListRequest::for_query(&QueryState::new(10));
        let url = client().endpoint(&request.path_segments("users"), &request.query_pairs());
        assert_eq!(url.as_str(), "https://api.example.com/users?limit=10&skip=0");
    }

    #[test]
    fn test_endpoint_encodes_search_text() {
        let request = ListRequest {
            endpoint: Endpoint::Search("red & blue".to_string()),
            limit: 12,
            skip: 24,
        };
        let url = client().endpoint(&request.path_segments("products"), &request.query_pairs());
        assert_eq!(
            url.as_str(),
            "https://api.example.com/products/search?q=red+%26+blue&limit=12&skip=24"
        );
    }

    #[test]
    fn test_endpoint_encodes_category_slug() {
        let request = ListRequest {
            endpoint: Endpoint::Category("home decor/sale".to_string()),
            limit: 12,
            skip: 0,
        };
        let url = client().endpoint(&request.path_segments("products"), &request.query_pairs());
        assert_eq!(
            url.as_str(),
            "https://api.example.com/products/category/home%20decor%2Fsale?limit=12&skip=0"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let client = ApiClient::with_base_url("https://api.example.com/v1/", Duration::from_secs(5))
            .expect("Failed to build test client");
        let url = client.endpoint(&["products", "7"], &[]);
        assert_eq!(url.as_str(), "https://api.example.com/v1/products/7");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(ApiClient::with_base_url("not a url", Duration::from_secs(5)).is_err());
        assert!(ApiClient::with_base_url("mailto:someone@example.com", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_with_token_shares_base_url() {
        let client = client();
        assert!(!client.has_token());
        let authed = client.with_token("abc".to_string());
        assert!(authed.has_token());
        assert_eq!(authed.base_url(), client.base_url());
        let headers = authed.auth_headers().expect("valid headers");
        assert_eq!(headers.get(header::AUTHORIZATION).map(|v| v.to_str().ok()), Some(Some("Bearer abc")));
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"id":1,"username":"emilys","email":"emily.johnson@x.dummyjson.com","firstName":"Emily","lastName":"Johnson","gender":"female","image":"https://dummyjson.com/icon/emilys/128","accessToken":"eyJhbGciOi","refreshToken":"eyJhbGciOj"}"#;
        let login: LoginResponse = serde_json::from_str(json).expect("Failed to parse login test JSON");
        assert_eq!(login.access_token, "eyJhbGciOi");
        assert_eq!(login.first_name.as_deref(), Some("Emily"));
    }
}
