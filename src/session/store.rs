//! Synchronized owner of the run's session state
//!
//! Every in-flight target task and the rendering collaborator read and write
//! session data concurrently, so all access goes through this store. Writes
//! are additive and last-write-wins per key.

use crate::session::SessionState;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// Shared, lock-guarded session state for one run
#[derive(Debug, Default)]
pub struct SessionStore {
    inner: RwLock<SessionState>,
}

impl SessionStore {
    pub fn new(state: SessionState) -> Self {
        Self {
            inner: RwLock::new(state),
        }
    }

    /// Creates an empty store carrying the configured auth token
    pub fn with_auth_token(auth_token: Option<String>) -> Self {
        Self::new(SessionState::with_auth_token(auth_token))
    }

    /// Returns the `Cookie` header value, or `None` when no cookies are known
    pub async fn cookie_header(&self) -> Option<String> {
        let state = self.inner.read().await;
        state.has_cookies().then(|| state.cookie_header())
    }

    pub async fn auth_token(&self) -> Option<String> {
        self.inner.read().await.auth_token.clone()
    }

    pub async fn set_auth_token(&self, token: Option<String>) {
        self.inner.write().await.auth_token = token;
    }

    /// Merges cookies into the store, overwriting by name
    pub async fn merge_cookies<I>(&self, cookies: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut state = self.inner.write().await;
        for (name, value) in cookies {
            state.set_cookie(name, value);
        }
    }

    /// Merges local storage entries into the store, overwriting by key
    pub async fn merge_local_storage(&self, entries: BTreeMap<String, String>) {
        self.inner.write().await.local_storage.extend(entries);
    }

    /// Returns a point-in-time copy of the session
    pub async fn snapshot(&self) -> SessionState {
        self.inner.read().await.clone()
    }
}
