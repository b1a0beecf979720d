//! REST API client module for the dashboard backend.
//!
//! This module provides the `ApiClient` for reading users, products and
//! product categories, and for the login call used by the session layer.
//!
//! The resource endpoints are public; a bearer token obtained from
//! `/auth/login` is attached when one is set.

pub mod client;
pub mod error;

pub use client::{ApiClient, LoginResponse};
pub use error::ApiError;
