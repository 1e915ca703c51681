//! Registry of the sessions currently playing
//!
//! A session is registered when it enters `Playing` and removed only once
//! its finalize sequence has completed, so an interruption always finds
//! every session whose progress still has to be saved.

use crate::client::MediaServerClient;
use crate::session::SessionHandle;
use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// A registered session together with the client able to finalize it
#[derive(Clone)]
pub struct RegisteredSession {
    pub session: Arc<SessionHandle>,
    pub client: Arc<dyn MediaServerClient>,
}

impl fmt::Debug for RegisteredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegisteredSession").field(&self.session).finish()
    }
}

/// Insertion-ordered set of active sessions, keyed by session token
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<IndexMap<String, RegisteredSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, RegisteredSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an established session
    ///
    /// Returns `false` if the session has no token yet or is already
    /// registered.
    pub fn add(&self, session: Arc<SessionHandle>, client: Arc<dyn MediaServerClient>) -> bool {
        let Some(token) = session.session_token() else {
            return false;
        };
        let mut sessions = self.lock();
        if sessions.contains_key(&token) {
            return false;
        }
        debug!(server = %session.server(), session = %token, "Session registered");
        sessions.insert(token, RegisteredSession { session, client });
        true
    }

    /// Remove a session, keeping the order of the remaining ones
    pub fn remove(&self, session_token: &str) -> Option<Arc<SessionHandle>> {
        let removed = self
            .lock()
            .shift_remove(session_token)
            .map(|entry| entry.session);
        if removed.is_some() {
            debug!(session = %session_token, "Session deregistered");
        }
        removed
    }

    pub fn get(&self, session_token: &str) -> Option<Arc<SessionHandle>> {
        self.lock()
            .get(session_token)
            .map(|entry| entry.session.clone())
    }

    /// Every registered session, in registration order
    pub fn snapshot(&self) -> Vec<RegisteredSession> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
