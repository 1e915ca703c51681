//! Rapports de lecture : démarrage, progression, arrêt et position sauvegardée

use super::EmbyApi;
use crate::error::Result;
use crate::models::{
    PlaybackProgressInfo, PlaybackStartInfo, PlaybackStopInfo, UserDataUpdate,
};
use chrono::Utc;
use kwsession::{SessionSnapshot, TICKS_PER_SECOND};
use tracing::debug;

/// Instant courant exprimé en ticks depuis l'epoch Unix
fn now_ticks() -> i64 {
    Utc::now().timestamp_millis() * (TICKS_PER_SECOND as i64 / 1000)
}

impl EmbyApi {
    /// Annonce le démarrage d'une lecture
    pub async fn report_playback_start(&self, session: &SessionSnapshot) -> Result<()> {
        let body = PlaybackStartInfo::new(session, now_ticks());
        self.post_empty("/Sessions/Playing", &session.auth.token, &body)
            .await
    }

    /// Rapporte la position courante
    pub async fn report_playback_progress(
        &self,
        session: &SessionSnapshot,
        paused: bool,
    ) -> Result<()> {
        let body = PlaybackProgressInfo::new(session, paused);
        debug!(
            "Progress {} at {} ticks (paused: {})",
            session.session_token, body.position_ticks, paused
        );
        self.post_empty("/Sessions/Playing/Progress", &session.auth.token, &body)
            .await
    }

    /// Termine la lecture à la position courante
    pub async fn report_playback_stopped(&self, session: &SessionSnapshot) -> Result<()> {
        let body = PlaybackStopInfo::new(session);
        self.post_empty("/Sessions/Playing/Stopped", &session.auth.token, &body)
            .await
    }

    /// Écrit directement la position dans les données utilisateur de l'item
    pub async fn update_user_data(&self, session: &SessionSnapshot) -> Result<()> {
        let path = format!(
            "/Users/{}/Items/{}/UserData",
            session.auth.user_id, session.media.id
        );
        let body = UserDataUpdate::new(session);
        self.post_empty(&path, &session.auth.token, &body).await
    }
}
