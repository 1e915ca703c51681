//! Collaborator traits: the media server client and its factory
//!
//! The engine never talks HTTP itself. Every remote interaction goes through
//! [`MediaServerClient`], which a backend crate (e.g. `kwemby`) implements
//! for one concrete server.

use crate::error::{ClientError, Result};
use crate::session::SessionSnapshot;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// One configured account on one remote server
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ServerIdentity {
    /// Display name used in logs and in the final report
    pub name: String,
    /// Base URL of the server (e.g. `https://emby.example.org:8920`)
    pub endpoint: String,
    /// Account login
    pub username: String,
    #[serde(skip)]
    pub password: String,
}

impl ServerIdentity {
    /// Create an identity whose display name is the endpoint itself
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into();
        Self {
            name: endpoint.clone(),
            endpoint,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Override the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// Le mot de passe ne doit jamais apparaître dans les logs
impl fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerIdentity")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Credentials returned by a successful login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthInfo {
    /// Access token sent with every subsequent request
    pub token: String,
    /// Server side id of the account
    pub user_id: String,
    /// Server side display name of the account
    pub user_name: Option<String>,
}

/// A playable item of the account's library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    pub id: String,
    pub name: String,
    /// Total duration in seconds
    pub runtime_seconds: u64,
}

/// Remote media server operations used by a session
///
/// Every push returns success or failure only; the engine decides whether a
/// failure is fatal (login, listing) or merely logged (all pushes).
#[async_trait::async_trait]
pub trait MediaServerClient: Send + Sync {
    /// Log into the server with the identity's username and password
    async fn authenticate(&self, identity: &ServerIdentity) -> Result<AuthInfo>;

    /// List the playable items of the authenticated account
    async fn list_items(&self, auth: &AuthInfo) -> Result<Vec<MediaItem>>;

    /// Announce the start of a playback session
    async fn push_playback_start(&self, session: &SessionSnapshot) -> Result<()>;

    /// Report the current position, optionally flagged as paused
    async fn push_progress(&self, session: &SessionSnapshot, paused: bool) -> Result<()>;

    /// End the playback session at the current position, explicitly not failed
    async fn push_stop(&self, session: &SessionSnapshot) -> Result<()>;

    /// Write position and played percentage directly into the item's user data
    async fn push_user_data_position(&self, session: &SessionSnapshot) -> Result<()>;

    /// Read back the resume position (seconds) the server recorded for the item
    async fn fetch_resume_position(&self, _session: &SessionSnapshot) -> Result<u64> {
        Err(ClientError::Unsupported("fetch_resume_position"))
    }
}

/// Builds one client per configured server
pub trait ClientFactory: Send + Sync {
    fn connect(&self, identity: &ServerIdentity) -> Result<Arc<dyn MediaServerClient>>;
}

impl<F> ClientFactory for F
where
    F: Fn(&ServerIdentity) -> Result<Arc<dyn MediaServerClient>> + Send + Sync,
{
    fn connect(&self, identity: &ServerIdentity) -> Result<Arc<dyn MediaServerClient>> {
        self(identity)
    }
}
