//! Module d'authentification pour l'API Emby

use super::EmbyApi;
use crate::error::Result;
use crate::models::{AuthenticateRequest, AuthenticateResponse};
use kwsession::AuthInfo;
use tracing::{debug, info};

impl EmbyApi {
    /// Authentifie l'utilisateur avec username et password
    ///
    /// # Errors
    ///
    /// * `EmbyError::Unauthorized` - Credentials invalides
    /// * `EmbyError::JsonParse` - Réponse sans `AccessToken` ou sans `User.Id`
    pub async fn authenticate_by_name(&self, username: &str, password: &str) -> Result<AuthInfo> {
        info!("Attempting to login to {} as {}", self.base_url(), username);

        let body = AuthenticateRequest {
            username,
            pw: password,
        };
        let response: AuthenticateResponse = self
            .post_json("/Users/AuthenticateByName", None, &body)
            .await?;

        debug!("Login successful - User ID: {}", response.user.id);

        Ok(AuthInfo {
            token: response.access_token,
            user_id: response.user.id,
            user_name: response.user.name,
        })
    }
}
