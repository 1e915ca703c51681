//! Client Emby de haut niveau, branché sur le moteur de sessions

use crate::api::{ApiOptions, EmbyApi};
use crate::error::EmbyError;
use kwsession::error::Result;
use kwsession::{
    AuthInfo, ClientFactory, MediaItem, MediaServerClient, ServerIdentity, SessionSnapshot,
    TICKS_PER_SECOND,
};
use std::sync::Arc;
use tracing::debug;

/// Client d'un serveur Emby
///
/// Chaque instance parle à un seul serveur ; les sessions de plusieurs
/// serveurs utilisent chacune leur propre client.
pub struct EmbyClient {
    api: EmbyApi,
}

impl EmbyClient {
    /// Crée un client pour l'URL donnée
    pub fn new(base_url: &str, options: ApiOptions) -> crate::error::Result<Self> {
        Ok(Self {
            api: EmbyApi::new(base_url, options)?,
        })
    }

    /// Accès à l'API bas-niveau
    pub fn api(&self) -> &EmbyApi {
        &self.api
    }
}

#[async_trait::async_trait]
impl MediaServerClient for EmbyClient {
    async fn authenticate(&self, identity: &ServerIdentity) -> Result<AuthInfo> {
        Ok(self
            .api
            .authenticate_by_name(&identity.username, &identity.password)
            .await?)
    }

    async fn list_items(&self, auth: &AuthInfo) -> Result<Vec<MediaItem>> {
        let items = self.api.movies(auth).await?;
        Ok(items.into_iter().map(MediaItem::from).collect())
    }

    async fn push_playback_start(&self, session: &SessionSnapshot) -> Result<()> {
        Ok(self.api.report_playback_start(session).await?)
    }

    async fn push_progress(&self, session: &SessionSnapshot, paused: bool) -> Result<()> {
        Ok(self.api.report_playback_progress(session, paused).await?)
    }

    async fn push_stop(&self, session: &SessionSnapshot) -> Result<()> {
        Ok(self.api.report_playback_stopped(session).await?)
    }

    async fn push_user_data_position(&self, session: &SessionSnapshot) -> Result<()> {
        Ok(self.api.update_user_data(session).await?)
    }

    async fn fetch_resume_position(&self, session: &SessionSnapshot) -> Result<u64> {
        let item = self.api.item(&session.auth, &session.media.id).await?;
        let ticks = item
            .user_data
            .map(|data| data.playback_position_ticks)
            .unwrap_or_default();
        debug!("Server reports {} ticks for {}", ticks, session.media.id);
        Ok(ticks / TICKS_PER_SECOND)
    }
}

/// Fabrique de clients Emby partageant les mêmes options HTTP
#[derive(Debug, Clone, Default)]
pub struct EmbyClientFactory {
    options: ApiOptions,
}

impl EmbyClientFactory {
    pub fn new(options: ApiOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ApiOptions {
        &self.options
    }
}

impl ClientFactory for EmbyClientFactory {
    fn connect(&self, identity: &ServerIdentity) -> Result<Arc<dyn MediaServerClient>> {
        let client = EmbyClient::new(&identity.endpoint, self.options.clone())
            .map_err(|e: EmbyError| kwsession::ClientError::from(e))?;
        Ok(Arc::new(client))
    }
}
