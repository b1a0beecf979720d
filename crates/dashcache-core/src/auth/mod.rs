//! Authentication module for the dashboard session.
//!
//! This module provides:
//! - `Session`: token + identity persisted to disk with automatic expiry
//! - `SessionStore`: login/logout state that presentation code observes
//!
//! The resource stores never depend on this module; the composition root
//! attaches a restored token to their API client.

pub mod session;
pub mod store;

pub use session::{Session, SessionData, SessionUser};
pub use store::{AuthSnapshot, SessionStore};
