//! Couche d'accès à l'API REST Emby
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec un
//! serveur Emby (ou Jellyfin, qui expose les mêmes routes).

pub mod auth;
pub mod library;
pub mod playback;

use crate::error::{EmbyError, Result};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// Header portant le jeton d'accès une fois authentifié
pub const TOKEN_HEADER: &str = "X-MediaBrowser-Token";

/// Header décrivant le client auprès du serveur
pub const AUTHORIZATION_HEADER: &str = "X-Emby-Authorization";

/// Timeout par défaut des requêtes HTTP
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Identification du client annoncée au serveur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Nom de l'application cliente
    pub client: String,
    /// Nom de l'appareil
    pub device: String,
    /// Identifiant stable de l'appareil
    pub device_id: String,
    /// Version de l'application cliente
    pub version: String,
}

impl DeviceInfo {
    /// Valeur du header `X-Emby-Authorization`
    pub fn authorization_header(&self) -> String {
        format!(
            "Emby UserId=\"\", Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
            self.client, self.device, self.device_id, self.version
        )
    }
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            client: "EmbyClient".to_string(),
            device: "Windows".to_string(),
            device_id: "keepwatch".to_string(),
            version: "4.8.0".to_string(),
        }
    }
}

/// Options de construction du client HTTP
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub timeout: Duration,
    /// Accepte les certificats auto-signés des serveurs domestiques
    pub accept_invalid_certs: bool,
    pub device: DeviceInfo,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
            device: DeviceInfo::default(),
        }
    }
}

/// Client API bas-niveau pour un serveur Emby
pub struct EmbyApi {
    /// Client HTTP
    client: Client,
    /// URL de base du serveur, sans `/` final
    base_url: String,
    device: DeviceInfo,
}

impl EmbyApi {
    /// Crée une nouvelle instance de l'API pour le serveur donné
    pub fn new(base_url: impl AsRef<str>, options: ApiOptions) -> Result<Self> {
        let base_url = base_url.as_ref().trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EmbyError::Configuration(format!(
                "invalid server url: {:?}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(options.timeout)
            .user_agent(format!(
                "{}/{}",
                options.device.client, options.device.version
            ))
            .danger_accept_invalid_certs(options.accept_invalid_certs)
            .build()?;

        Ok(Self {
            client,
            base_url,
            device: options.device,
        })
    }

    /// Retourne l'URL de base du serveur
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retourne l'identification du client
    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ajoute les headers communs à toutes les requêtes
    fn decorate(&self, request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        let request = request.header(AUTHORIZATION_HEADER, self.device.authorization_header());
        match token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Effectue une requête GET authentifiée et décode la réponse
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = self.url(path);
        debug!("GET {} with {} params", url, params.len());

        let request = self.decorate(self.client.get(&url), Some(token)).query(params);
        let response = request.send().await?;
        let text = Self::check_status(response).await?;
        Self::parse(&text)
    }

    /// Effectue une requête POST JSON et décode la réponse
    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<T> {
        let text = self.send_post(path, token, body).await?;
        Self::parse(&text)
    }

    /// Effectue une requête POST JSON dont le corps de réponse est ignoré
    pub(crate) async fn post_empty<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: &str,
        body: &B,
    ) -> Result<()> {
        self.send_post(path, Some(token), body).await.map(|_| ())
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<String> {
        let url = self.url(path);
        debug!("POST {}", url);

        let request = self.decorate(self.client.post(&url), token).json(body);
        let response = request.send().await?;
        Self::check_status(response).await
    }

    /// Traite le statut HTTP et retourne le corps de la réponse
    async fn check_status(response: Response) -> Result<String> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("API error ({}): {}", status_code, error_text);
            let message = if error_text.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                error_text
            };
            return Err(EmbyError::from_status_code(status_code, message));
        }

        Ok(response.text().await?)
    }

    fn parse<T: DeserializeOwned>(text: &str) -> Result<T> {
        serde_json::from_str(text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            EmbyError::JsonParse(e)
        })
    }
}
