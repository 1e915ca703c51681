//! Session state for one simulated playback attempt

use crate::client::{AuthInfo, MediaItem, ServerIdentity};
use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// Number of server ticks in one second
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Authenticating,
    Selecting,
    Playing,
    Stopping,
    Stopped,
    Failed,
}

impl SessionState {
    /// `Stopped` and `Failed` are final
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Authenticating => "authenticating",
            SessionState::Selecting => "selecting",
            SessionState::Playing => "playing",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Read-only copy of an established session
///
/// Taken under the session lock, so its fields are consistent with each
/// other, but the live session may have moved on by the time it is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub server: String,
    pub endpoint: String,
    pub session_token: String,
    pub auth: AuthInfo,
    pub media: MediaItem,
    /// Elapsed playback seconds
    pub position: u64,
    pub state: SessionState,
}

impl SessionSnapshot {
    /// Position expressed in server ticks (100 ns units)
    pub fn position_ticks(&self) -> u64 {
        self.position.saturating_mul(TICKS_PER_SECOND)
    }

    /// Share of the item already watched, capped at 100
    pub fn played_percentage(&self) -> f64 {
        if self.media.runtime_seconds == 0 {
            return 0.0;
        }
        (self.position as f64 * 100.0 / self.media.runtime_seconds as f64).min(100.0)
    }
}

#[derive(Debug)]
struct Session {
    state: SessionState,
    auth: Option<AuthInfo>,
    media: Option<MediaItem>,
    session_token: Option<String>,
    position: u64,
}

/// Shared handle on one session
///
/// The owning driver is the only writer of the playback fields; the
/// interrupt coordinator only reads snapshots and competes for the right
/// to finalize through [`SessionHandle::claim_finalize`].
pub struct SessionHandle {
    server: String,
    endpoint: String,
    inner: Mutex<Session>,
    state_tx: watch::Sender<SessionState>,
}

impl SessionHandle {
    pub fn new(identity: &ServerIdentity) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            server: identity.name.clone(),
            endpoint: identity.endpoint.clone(),
            inner: Mutex::new(Session {
                state: SessionState::Idle,
                auth: None,
                media: None,
                session_token: None,
                position: 0,
            }),
            state_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn transition(&self, session: &mut Session, state: SessionState) {
        session.state = state;
        self.state_tx.send_replace(state);
    }

    /// Display name of the server this session plays against
    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        self.lock().state
    }

    pub fn position(&self) -> u64 {
        self.lock().position
    }

    pub fn session_token(&self) -> Option<String> {
        self.lock().session_token.clone()
    }

    pub fn begin_authentication(&self) {
        let mut session = self.lock();
        self.transition(&mut session, SessionState::Authenticating);
    }

    pub fn set_authenticated(&self, auth: AuthInfo) {
        let mut session = self.lock();
        session.auth = Some(auth);
        self.transition(&mut session, SessionState::Selecting);
    }

    /// Bind the selected item, generate the session token and enter `Playing`
    ///
    /// Returns `None` when the session is not authenticated.
    pub fn establish(&self, media: MediaItem) -> Option<SessionSnapshot> {
        let mut session = self.lock();
        session.auth.as_ref()?;
        session.media = Some(media);
        session.session_token = Some(format!("play-{}", uuid::Uuid::new_v4().simple()));
        session.position = 0;
        self.transition(&mut session, SessionState::Playing);
        self.snapshot_of(&session)
    }

    /// Move the position forward to `position` seconds
    ///
    /// Ignored unless the session is `Playing`; never moves backwards.
    /// Returns the resulting position.
    pub fn advance_to(&self, position: u64) -> u64 {
        let mut session = self.lock();
        if session.state == SessionState::Playing && position > session.position {
            session.position = position;
        }
        session.position
    }

    /// Take the exclusive right to run the finalize sequence
    ///
    /// The first caller moves the session from `Playing` to `Stopping` and
    /// gets the snapshot whose position finalize must use. Every later
    /// caller gets `None`.
    pub fn claim_finalize(&self) -> Option<SessionSnapshot> {
        let mut session = self.lock();
        if session.state != SessionState::Playing {
            return None;
        }
        self.transition(&mut session, SessionState::Stopping);
        self.snapshot_of(&session)
    }

    /// Record the result of the finalize sequence
    pub fn complete_finalize(&self, persisted: bool) {
        let mut session = self.lock();
        let state = if persisted {
            SessionState::Stopped
        } else {
            SessionState::Failed
        };
        self.transition(&mut session, state);
    }

    /// Mark the session failed before playback was established
    pub fn fail(&self) {
        let mut session = self.lock();
        if !session.state.is_terminal() {
            self.transition(&mut session, SessionState::Failed);
        }
    }

    /// Snapshot of the session, `None` until playback is established
    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let session = self.lock();
        self.snapshot_of(&session)
    }

    fn snapshot_of(&self, session: &Session) -> Option<SessionSnapshot> {
        Some(SessionSnapshot {
            server: self.server.clone(),
            endpoint: self.endpoint.clone(),
            session_token: session.session_token.clone()?,
            auth: session.auth.clone()?,
            media: session.media.clone()?,
            position: session.position,
            state: session.state,
        })
    }

    /// Wait until the session reaches `Stopped` or `Failed`
    pub async fn wait_terminal(&self) -> SessionState {
        let mut rx = self.state_tx.subscribe();
        match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.lock();
        f.debug_struct("SessionHandle")
            .field("server", &self.server)
            .field("session_token", &session.session_token)
            .field("state", &session.state)
            .field("position", &session.position)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ServerIdentity {
        ServerIdentity::new("http://emby.local", "alice", "pw")
    }

    fn auth() -> AuthInfo {
        AuthInfo {
            token: "tok".into(),
            user_id: "u1".into(),
            user_name: Some("alice".into()),
        }
    }

    fn movie(runtime: u64) -> MediaItem {
        MediaItem {
            id: "m1".into(),
            name: "Movie".into(),
            runtime_seconds: runtime,
        }
    }

    fn playing() -> SessionHandle {
        let handle = SessionHandle::new(&identity());
        handle.begin_authentication();
        handle.set_authenticated(auth());
        handle.establish(movie(7200)).unwrap();
        handle
    }

    #[test]
    fn test_establish_requires_authentication() {
        let handle = SessionHandle::new(&identity());
        assert!(handle.establish(movie(100)).is_none());
        assert_eq!(handle.state(), SessionState::Idle);
    }

    #[test]
    fn test_establish_generates_token() {
        let handle = playing();
        let token = handle.session_token().unwrap();
        assert!(token.starts_with("play-"));
        assert_eq!(handle.state(), SessionState::Playing);
    }

    #[test]
    fn test_position_never_goes_backwards() {
        let handle = playing();
        assert_eq!(handle.advance_to(30), 30);
        assert_eq!(handle.advance_to(10), 30);
        assert_eq!(handle.advance_to(31), 31);
    }

    #[test]
    fn test_position_frozen_once_stopping() {
        let handle = playing();
        handle.advance_to(45);
        let snapshot = handle.claim_finalize().unwrap();
        assert_eq!(snapshot.position, 45);
        assert_eq!(handle.advance_to(60), 45);
    }

    #[test]
    fn test_finalize_claimed_once() {
        let handle = playing();
        assert!(handle.claim_finalize().is_some());
        assert!(handle.claim_finalize().is_none());
        assert_eq!(handle.state(), SessionState::Stopping);
    }

    #[test]
    fn test_played_percentage() {
        let handle = playing();
        handle.advance_to(720);
        let snapshot = handle.snapshot().unwrap();
        assert!((snapshot.played_percentage() - 10.0).abs() < f64::EPSILON);
        assert_eq!(snapshot.position_ticks(), 720 * TICKS_PER_SECOND);
    }

    #[test]
    fn test_played_percentage_zero_runtime() {
        let handle = SessionHandle::new(&identity());
        handle.set_authenticated(auth());
        let snapshot = handle.establish(movie(0)).unwrap();
        assert_eq!(snapshot.played_percentage(), 0.0);
    }

    #[tokio::test]
    async fn test_wait_terminal_sees_completion() {
        let handle = std::sync::Arc::new(playing());
        handle.claim_finalize().unwrap();

        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.wait_terminal().await })
        };
        handle.complete_finalize(true);

        assert_eq!(waiter.await.unwrap(), SessionState::Stopped);
    }

    #[test]
    fn test_wait_terminal_after_failure() {
        let handle = SessionHandle::new(&identity());
        handle.begin_authentication();
        handle.fail();

        let state = tokio_test::block_on(handle.wait_terminal());
        assert_eq!(state, SessionState::Failed);
    }
}
