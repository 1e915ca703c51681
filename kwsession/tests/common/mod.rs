#![allow(dead_code)]

use kwsession::error::Result;
use kwsession::{
    AuthInfo, ClientError, MediaItem, MediaServerClient, PlaybackSettings, ServerIdentity,
    SessionSnapshot,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Start,
    Progress,
    PausedProgress,
    Stop,
    UserData,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub kind: CallKind,
    pub session_token: String,
    pub media_id: String,
    pub position: u64,
    /// Time since the client was created
    pub at: Duration,
}

/// In-memory media server recording every push
pub struct ScriptedClient {
    items: Vec<MediaItem>,
    reject_login: bool,
    failing: HashSet<CallKind>,
    failing_progress_at: HashSet<u64>,
    delays: HashMap<CallKind, Duration>,
    list_delay: Option<Duration>,
    panic_on_login: bool,
    calls: Mutex<Vec<Call>>,
    epoch: Instant,
}

impl ScriptedClient {
    pub fn new(media_id: &str, runtime_seconds: u64) -> Self {
        Self {
            items: vec![MediaItem {
                id: media_id.to_string(),
                name: format!("Movie {}", media_id),
                runtime_seconds,
            }],
            reject_login: false,
            failing: HashSet::new(),
            failing_progress_at: HashSet::new(),
            delays: HashMap::new(),
            list_delay: None,
            panic_on_login: false,
            calls: Mutex::new(Vec::new()),
            epoch: Instant::now(),
        }
    }

    pub fn empty_library(mut self) -> Self {
        self.items.clear();
        self
    }

    pub fn rejecting_login(mut self) -> Self {
        self.reject_login = true;
        self
    }

    pub fn panicking_on_login(mut self) -> Self {
        self.panic_on_login = true;
        self
    }

    pub fn failing(mut self, kind: CallKind) -> Self {
        self.failing.insert(kind);
        self
    }

    pub fn failing_progress_at(mut self, position: u64) -> Self {
        self.failing_progress_at.insert(position);
        self
    }

    pub fn slow(mut self, kind: CallKind, delay: Duration) -> Self {
        self.delays.insert(kind, delay);
        self
    }

    pub fn slow_listing(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.kind == kind).collect()
    }

    pub fn kinds(&self) -> Vec<CallKind> {
        self.calls().into_iter().map(|c| c.kind).collect()
    }

    async fn record(&self, kind: CallKind, session: &SessionSnapshot) -> Result<()> {
        self.calls.lock().unwrap().push(Call {
            kind,
            session_token: session.session_token.clone(),
            media_id: session.media.id.clone(),
            position: session.position,
            at: self.epoch.elapsed(),
        });

        if let Some(delay) = self.delays.get(&kind) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing.contains(&kind)
            || (kind == CallKind::Progress && self.failing_progress_at.contains(&session.position))
        {
            return Err(ClientError::status(500, "Internal Server Error"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MediaServerClient for ScriptedClient {
    async fn authenticate(&self, identity: &ServerIdentity) -> Result<AuthInfo> {
        if self.panic_on_login {
            panic!("login exploded");
        }
        if self.reject_login {
            return Err(ClientError::Unauthorized("Invalid username or password".into()));
        }
        Ok(AuthInfo {
            token: format!("token-{}", identity.username),
            user_id: format!("user-{}", identity.username),
            user_name: Some(identity.username.clone()),
        })
    }

    async fn list_items(&self, _auth: &AuthInfo) -> Result<Vec<MediaItem>> {
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.items.clone())
    }

    async fn push_playback_start(&self, session: &SessionSnapshot) -> Result<()> {
        self.record(CallKind::Start, session).await
    }

    async fn push_progress(&self, session: &SessionSnapshot, paused: bool) -> Result<()> {
        let kind = if paused {
            CallKind::PausedProgress
        } else {
            CallKind::Progress
        };
        self.record(kind, session).await
    }

    async fn push_stop(&self, session: &SessionSnapshot) -> Result<()> {
        self.record(CallKind::Stop, session).await
    }

    async fn push_user_data_position(&self, session: &SessionSnapshot) -> Result<()> {
        self.record(CallKind::UserData, session).await
    }

    async fn fetch_resume_position(&self, session: &SessionSnapshot) -> Result<u64> {
        let saved = self
            .calls_of(CallKind::UserData)
            .into_iter()
            .filter(|c| c.session_token == session.session_token)
            .last()
            .map(|c| c.position)
            .unwrap_or(0);
        Ok(saved)
    }
}

/// Fixed 300 s watch with a 60 s tick
pub fn settings(watch_secs: u64) -> PlaybackSettings {
    PlaybackSettings {
        tick_interval: Duration::from_secs(60),
        min_watch: Duration::from_secs(watch_secs),
        max_watch: Duration::from_secs(watch_secs),
        ..Default::default()
    }
}

pub fn identity(name: &str) -> ServerIdentity {
    ServerIdentity::new(format!("http://{}.local:8096", name), name, "secret").with_name(name)
}

pub fn finalize_kinds() -> Vec<CallKind> {
    vec![CallKind::PausedProgress, CallKind::Stop, CallKind::UserData]
}
