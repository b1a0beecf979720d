use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;

use super::session::{Session, SessionData, SessionUser};

/// What presentation code sees of the login state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub token: Option<String>,
    pub user: Option<SessionUser>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

struct AuthState {
    session: Session,
    is_loading: bool,
    error: Option<String>,
}

impl AuthState {
    fn snapshot(&self) -> AuthSnapshot {
        let valid = self.session.data.as_ref().filter(|d| !d.is_expired());
        AuthSnapshot {
            token: valid.map(|d| d.token.clone()),
            user: valid.map(|d| d.user.clone()),
            is_authenticated: valid.is_some(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}

/// Login state backed by a session file.
pub struct SessionStore {
    api: ApiClient,
    state: Mutex<AuthState>,
    snapshot_tx: watch::Sender<AuthSnapshot>,
}

impl SessionStore {
    /// Create a store, restoring a saved session from `cache_dir` if one is still valid
    pub fn restore(api: ApiClient, cache_dir: PathBuf) -> Self {
        let mut session = Session::new(cache_dir);
        match session.load() {
            Ok(true) => debug!("Session restored"),
            Ok(false) => debug!("No saved session"),
            Err(e) => warn!(error = %e, "Failed to load saved session"),
        }

        let state = AuthState {
            session,
            is_loading: false,
            error: None,
        };
        let (snapshot_tx, _) = watch::channel(state.snapshot());
        Self {
            api,
            state: Mutex::new(state),
            snapshot_tx,
        }
    }

    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn token(&self) -> Option<String> {
        self.snapshot().token
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.snapshot().user
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated
    }

    /// Log in and persist the session. On failure the message is also kept in `error`.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        {
            let mut state = self.state();
            if username.is_empty() || password.is_empty() {
                state.error = Some("Username and password required".to_string());
                self.publish(&state);
                return Err(anyhow::anyhow!("Username and password required"));
            }
            state.is_loading = true;
            state.error = None;
            self.publish(&state);
        }

        let result = self.api.login(username, password).await;

        let mut state = self.state();
        state.is_loading = false;
        match result {
            Ok(login) => {
                state.session.update(SessionData::from_login(login));
                if let Err(e) = state.session.save() {
                    warn!(error = %e, "Failed to save session");
                }
                info!(username, "Login successful");
                self.publish(&state);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Login failed");
                state.error = Some(e.to_string());
                self.publish(&state);
                Err(e.into())
            }
        }
    }

    /// Forget the session, in memory and on disk
    pub fn logout(&self) {
        let mut state = self.state();
        if let Err(e) = state.session.clear() {
            warn!(error = %e, "Failed to remove session file");
        }
        state.error = None;
        info!("Logged out");
        self.publish(&state);
    }

    pub fn clear_error(&self) {
        let mut state = self.state();
        state.error = None;
        self.publish(&state);
    }

    fn state(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: &AuthState) {
        self.snapshot_tx.send_replace(state.snapshot());
    }
}
