//! Session driver: the full lifecycle of one simulated playback
//!
//! authenticate → select media → establish playback → tick loop → finalize

use crate::client::{MediaItem, MediaServerClient, ServerIdentity};
use crate::error::SessionError;
use crate::finalize::{finalize_session, format_position, DEFAULT_STEP_DELAY};
use crate::registry::SessionRegistry;
use crate::session::{SessionHandle, SessionState};
use crate::shutdown::ShutdownSignal;
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Upper bound of the signal polling granularity
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing of a simulated playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// Time between two progress pushes
    pub tick_interval: Duration,
    /// Lower bound of the watch duration
    pub min_watch: Duration,
    /// Upper bound of the watch duration (also capped by the item runtime)
    pub max_watch: Duration,
    /// Granularity at which the shutdown signal is polled
    pub poll_interval: Duration,
    /// Pause between two finalize pushes
    pub finalize_step_delay: Duration,
    /// How long drivers may take to return once the graceful shutdown is done
    pub shutdown_drain: Duration,
    /// Read back the resume position after a normal completion
    pub verify_saved_position: bool,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            min_watch: Duration::from_secs(300),
            max_watch: Duration::from_secs(1800),
            poll_interval: MAX_POLL_INTERVAL,
            finalize_step_delay: DEFAULT_STEP_DELAY,
            shutdown_drain: Duration::from_secs(5),
            verify_saved_position: false,
        }
    }
}

impl PlaybackSettings {
    /// Polling granularity, clamped to `1ms..=1s`
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval
            .clamp(Duration::from_millis(1), MAX_POLL_INTERVAL)
    }

    /// Draw a watch duration in seconds for an item of `runtime` seconds
    ///
    /// Uniform in `[min_watch, min(max_watch, runtime)]`; when the item is
    /// shorter than `min_watch` the whole item is watched.
    pub fn pick_target(&self, runtime: u64) -> u64 {
        let upper = self.max_watch.as_secs().min(runtime);
        let lower = self.min_watch.as_secs().min(upper);
        rand::rng().random_range(lower..=upper)
    }
}

/// Result of a successful session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub media_id: String,
    pub media_name: String,
    pub session_token: String,
    /// Position persisted by finalize, in seconds
    pub position: u64,
    /// Watch duration that was scheduled, in seconds
    pub target: u64,
    /// The shutdown signal ended the playback early
    pub interrupted: bool,
    /// Resume position read back from the server, when verification ran
    pub saved_position: Option<u64>,
}

/// Terminal outcome of one driver
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Success(SessionSummary),
    Failed(SessionError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn error(&self) -> Option<&SessionError> {
        match self {
            Outcome::Failed(e) => Some(e),
            Outcome::Success(_) => None,
        }
    }
}

/// Runs one session against one server
pub struct SessionDriver {
    client: Arc<dyn MediaServerClient>,
    registry: Arc<SessionRegistry>,
    signal: ShutdownSignal,
    settings: PlaybackSettings,
}

impl SessionDriver {
    pub fn new(
        client: Arc<dyn MediaServerClient>,
        registry: Arc<SessionRegistry>,
        signal: ShutdownSignal,
        settings: PlaybackSettings,
    ) -> Self {
        Self {
            client,
            registry,
            signal,
            settings,
        }
    }

    /// Drive a whole session; never fails past its own boundary
    pub async fn run(&self, identity: &ServerIdentity) -> Outcome {
        let session = Arc::new(SessionHandle::new(identity));
        match self.drive(identity, &session).await {
            Ok(summary) => Outcome::Success(summary),
            Err(e) => {
                session.fail();
                error!(server = %identity.name, "Session failed: {}", e);
                Outcome::Failed(e)
            }
        }
    }

    async fn drive(
        &self,
        identity: &ServerIdentity,
        session: &Arc<SessionHandle>,
    ) -> Result<SessionSummary, SessionError> {
        let server = identity.name.as_str();

        session.begin_authentication();
        let auth = self
            .client
            .authenticate(identity)
            .await
            .map_err(|e| SessionError::Authentication(e.to_string()))?;
        info!(
            server,
            "Logged in as {}",
            auth.user_name.as_deref().unwrap_or(&identity.username)
        );
        session.set_authenticated(auth.clone());

        let items = self
            .client
            .list_items(&auth)
            .await
            .map_err(|e| SessionError::NoContent(e.to_string()))?;
        let media = choose_media(&items)
            .ok_or_else(|| SessionError::NoContent("no playable item in library".to_string()))?;
        info!(
            server,
            "Selected: {} (runtime: {} min)",
            media.name,
            media.runtime_seconds / 60
        );

        if self.signal.is_raised() {
            return Err(SessionError::Interrupted(
                "shutdown requested before playback started".to_string(),
            ));
        }

        let snapshot = session.establish(media).ok_or_else(|| {
            SessionError::Authentication("session is not authenticated".to_string())
        })?;
        self.registry.add(session.clone(), self.client.clone());

        match self.client.push_playback_start(&snapshot).await {
            Ok(()) => info!(server, session = %snapshot.session_token, "Playback session established"),
            Err(e) => warn!(server, "Playback start push failed: {}", e),
        }

        let target = self.settings.pick_target(snapshot.media.runtime_seconds);
        info!(server, "Watching for {}s", target);

        let interrupted = self.tick_loop(session, target).await;

        // Own task: aborting the driver must not cut the sequence short
        let finalize = {
            let client = self.client.clone();
            let session = session.clone();
            let registry = self.registry.clone();
            let step_delay = self.settings.finalize_step_delay;
            tokio::spawn(async move {
                finalize_session(client.as_ref(), &session, &registry, step_delay).await
            })
        };
        let report = finalize
            .await
            .map_err(|e| SessionError::Panicked(e.to_string()))?;

        let position = match report {
            Some(report) if report.persisted() => report.position,
            Some(report) => return Err(SessionError::Finalize(report.error_summary())),
            None => {
                debug!(server, "Session finalized by the interrupt coordinator");
                match session.wait_terminal().await {
                    SessionState::Stopped => session.position(),
                    _ => {
                        return Err(SessionError::Finalize(
                            "progress could not be saved during shutdown".to_string(),
                        ));
                    }
                }
            }
        };

        let saved_position = if self.settings.verify_saved_position && !self.signal.is_raised() {
            self.verify(session, position).await
        } else {
            None
        };

        Ok(SessionSummary {
            media_id: snapshot.media.id,
            media_name: snapshot.media.name,
            session_token: snapshot.session_token,
            position,
            target,
            interrupted: interrupted || self.signal.is_raised(),
            saved_position,
        })
    }

    /// Play until `target` seconds or until interrupted
    ///
    /// Returns `true` when the loop was cut short.
    async fn tick_loop(&self, session: &SessionHandle, target: u64) -> bool {
        if target == 0 {
            return false;
        }

        let start = Instant::now();
        let end = start + Duration::from_secs(target);
        let interval = self.settings.tick_interval.max(Duration::from_secs(1));
        let mut tick: u32 = 1;

        loop {
            let deadline = (start + interval * tick).min(end);
            if self.wait_until(session, start, target, deadline).await {
                info!(
                    server = %session.server(),
                    "Playback interrupted at {}",
                    format_position(session.position())
                );
                return true;
            }

            let position = self.update_position(session, start, target);
            if let Some(snapshot) = session
                .snapshot()
                .filter(|s| s.state == SessionState::Playing)
            {
                match self.client.push_progress(&snapshot, false).await {
                    Ok(()) => info!(
                        server = %session.server(),
                        "Progress: {}",
                        format_position(position)
                    ),
                    Err(e) => warn!(server = %session.server(), "Progress push failed: {}", e),
                }
            }

            if position >= target {
                return false;
            }
            tick = tick.saturating_add(1);
        }
    }

    /// Sleep until `deadline` in poll slices, refreshing the position
    ///
    /// Returns `true` as soon as the shutdown signal is seen or the session
    /// left `Playing`.
    async fn wait_until(
        &self,
        session: &SessionHandle,
        start: Instant,
        target: u64,
        deadline: Instant,
    ) -> bool {
        let poll = self.settings.effective_poll_interval();
        loop {
            if self.signal.is_raised() || session.state() != SessionState::Playing {
                self.update_position(session, start, target);
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            let slice = (deadline - now).min(poll);
            tokio::select! {
                _ = tokio::time::sleep(slice) => {}
                _ = self.signal.raised() => {}
            }
            self.update_position(session, start, target);
        }
    }

    fn update_position(&self, session: &SessionHandle, start: Instant, target: u64) -> u64 {
        let elapsed = start.elapsed().as_secs().min(target);
        session.advance_to(elapsed)
    }

    async fn verify(&self, session: &SessionHandle, expected: u64) -> Option<u64> {
        let snapshot = session.snapshot()?;
        match self.client.fetch_resume_position(&snapshot).await {
            Ok(saved) if saved == expected => {
                info!(server = %session.server(), "Server recorded position {}", format_position(saved));
                Some(saved)
            }
            Ok(saved) => {
                warn!(
                    server = %session.server(),
                    "Server recorded position {} instead of {}",
                    format_position(saved),
                    format_position(expected)
                );
                Some(saved)
            }
            Err(e) => {
                warn!(server = %session.server(), "Could not read back resume position: {}", e);
                None
            }
        }
    }
}

/// Pick one item uniformly at random
fn choose_media(items: &[MediaItem]) -> Option<MediaItem> {
    items.choose(&mut rand::rng()).cloned()
}
