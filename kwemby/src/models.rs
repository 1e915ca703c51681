//! Structures de données échangées avec l'API Emby
//!
//! Emby utilise des noms de champs en PascalCase et exprime les durées en
//! "ticks" de 100 ns.

use kwsession::{MediaItem, SessionSnapshot, TICKS_PER_SECOND};
use serde::{Deserialize, Serialize};

/// Durée supposée d'un item dont le serveur ne donne pas la durée (2 h)
pub const DEFAULT_RUNTIME_SECONDS: u64 = 7200;

/// Méthode de lecture déclarée pour toutes les sessions
pub const PLAY_METHOD: &str = "DirectPlay";

/// Débit maximal annoncé, celui d'un client de salon
pub const MAX_STREAMING_BITRATE: u64 = 140_000_000;

/// Corps de la requête `/Users/AuthenticateByName`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticateRequest<'a> {
    pub username: &'a str,
    pub pw: &'a str,
}

/// Réponse de `/Users/AuthenticateByName`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthenticateResponse {
    pub access_token: String,
    pub user: User,
}

/// Utilisateur Emby
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Réponse paginée de `/Users/{id}/Items`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub total_record_count: Option<u64>,
}

/// Item de la bibliothèque (film)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Durée en ticks
    #[serde(default)]
    pub run_time_ticks: Option<u64>,
    #[serde(default)]
    pub user_data: Option<UserItemData>,
}

impl Item {
    /// Durée en secondes, 2 h si inconnue
    pub fn runtime_seconds(&self) -> u64 {
        self.run_time_ticks
            .map(|ticks| ticks / TICKS_PER_SECOND)
            .unwrap_or(DEFAULT_RUNTIME_SECONDS)
    }
}

impl From<Item> for MediaItem {
    fn from(item: Item) -> Self {
        let runtime_seconds = item.runtime_seconds();
        MediaItem {
            name: item.name.unwrap_or_else(|| item.id.clone()),
            id: item.id,
            runtime_seconds,
        }
    }
}

/// Données de lecture propres à l'utilisateur pour un item
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserItemData {
    #[serde(default)]
    pub playback_position_ticks: u64,
    #[serde(default)]
    pub played_percentage: Option<f64>,
    #[serde(default)]
    pub played: bool,
}

/// Corps de `/Sessions/Playing`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStartInfo<'a> {
    pub user_id: &'a str,
    pub item_id: &'a str,
    pub media_source_id: &'a str,
    pub play_method: &'static str,
    pub position_ticks: u64,
    pub play_session_id: &'a str,
    pub can_seek: bool,
    pub is_paused: bool,
    pub volume_level: u32,
    pub is_muted: bool,
    pub audio_stream_index: i32,
    pub subtitle_stream_index: i32,
    pub playback_start_time_ticks: i64,
    pub max_streaming_bitrate: u64,
    pub playback_order: &'static str,
}

impl<'a> PlaybackStartInfo<'a> {
    pub fn new(session: &'a SessionSnapshot, started_at_ticks: i64) -> Self {
        Self {
            user_id: &session.auth.user_id,
            item_id: &session.media.id,
            media_source_id: &session.media.id,
            play_method: PLAY_METHOD,
            position_ticks: 0,
            play_session_id: &session.session_token,
            can_seek: true,
            is_paused: false,
            volume_level: 100,
            is_muted: false,
            audio_stream_index: 0,
            subtitle_stream_index: -1,
            playback_start_time_ticks: started_at_ticks,
            max_streaming_bitrate: MAX_STREAMING_BITRATE,
            playback_order: "Default",
        }
    }
}

/// Corps de `/Sessions/Playing/Progress`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackProgressInfo<'a> {
    pub user_id: &'a str,
    pub item_id: &'a str,
    pub media_source_id: &'a str,
    pub position_ticks: u64,
    pub play_method: &'static str,
    pub play_session_id: &'a str,
    pub is_paused: bool,
    pub can_seek: bool,
    pub volume_level: u32,
    pub is_muted: bool,
    pub audio_stream_index: i32,
    pub subtitle_stream_index: i32,
    pub playback_rate: f64,
    pub max_streaming_bitrate: u64,
}

impl<'a> PlaybackProgressInfo<'a> {
    pub fn new(session: &'a SessionSnapshot, paused: bool) -> Self {
        Self {
            user_id: &session.auth.user_id,
            item_id: &session.media.id,
            media_source_id: &session.media.id,
            position_ticks: session.position_ticks(),
            play_method: PLAY_METHOD,
            play_session_id: &session.session_token,
            is_paused: paused,
            can_seek: true,
            volume_level: 100,
            is_muted: false,
            audio_stream_index: 0,
            subtitle_stream_index: -1,
            playback_rate: 1.0,
            max_streaming_bitrate: MAX_STREAMING_BITRATE,
        }
    }
}

/// Corps de `/Sessions/Playing/Stopped`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaybackStopInfo<'a> {
    pub user_id: &'a str,
    pub item_id: &'a str,
    pub media_source_id: &'a str,
    pub position_ticks: u64,
    pub play_session_id: &'a str,
    pub play_method: &'static str,
    /// Toujours `false` : la lecture s'est terminée normalement
    pub failed: bool,
    pub next_media_type: &'static str,
}

impl<'a> PlaybackStopInfo<'a> {
    pub fn new(session: &'a SessionSnapshot) -> Self {
        Self {
            user_id: &session.auth.user_id,
            item_id: &session.media.id,
            media_source_id: &session.media.id,
            position_ticks: session.position_ticks(),
            play_session_id: &session.session_token,
            play_method: PLAY_METHOD,
            failed: false,
            next_media_type: "Video",
        }
    }
}

/// Corps de `/Users/{id}/Items/{item}/UserData`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserDataUpdate {
    pub playback_position_ticks: u64,
    pub played_percentage: f64,
}

impl UserDataUpdate {
    pub fn new(session: &SessionSnapshot) -> Self {
        Self {
            playback_position_ticks: session.position_ticks(),
            played_percentage: session.played_percentage(),
        }
    }
}
