//! Gestion des erreurs pour le client Emby

use kwsession::ClientError;
use thiserror::Error;

/// Type Result personnalisé pour kwemby
pub type Result<T> = std::result::Result<T, EmbyError>;

/// Erreurs possibles lors de l'utilisation du client Emby
#[derive(Error, Debug)]
pub enum EmbyError {
    /// Erreur d'authentification (credentials invalides, token expiré)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// Ressource non trouvée (item, utilisateur)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur de configuration (URL du serveur invalide, etc.)
    #[error("Emby configuration error: {0}")]
    Configuration(String),

    /// Erreur de l'API Emby
    #[error("Emby API error (code {code}): {message}")]
    ApiError { code: u16, message: String },
}

impl EmbyError {
    /// Crée une erreur API depuis un code de statut HTTP et un message
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        match code {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            _ => Self::ApiError {
                code,
                message: message.into(),
            },
        }
    }

    /// Vérifie si l'erreur est une erreur de credentials (401/403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, EmbyError::Unauthorized(_))
    }
}

impl From<EmbyError> for ClientError {
    fn from(err: EmbyError) -> Self {
        match err {
            EmbyError::Unauthorized(message) => ClientError::Unauthorized(message),
            EmbyError::NotFound(message) => ClientError::status(404, message),
            EmbyError::ApiError { code, message } => ClientError::status(code, message),
            EmbyError::JsonParse(e) => ClientError::Decode(e.to_string()),
            EmbyError::Http(e) if e.is_decode() => ClientError::Decode(e.to_string()),
            EmbyError::Http(e) => ClientError::transport(e),
            EmbyError::Configuration(message) => ClientError::Transport(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_code() {
        assert!(EmbyError::from_status_code(401, "nope").is_auth_error());
        assert!(matches!(
            EmbyError::from_status_code(404, "gone"),
            EmbyError::NotFound(_)
        ));
        assert!(matches!(
            EmbyError::from_status_code(500, "boom"),
            EmbyError::ApiError { code: 500, .. }
        ));
    }

    #[test]
    fn test_into_client_error() {
        let err: ClientError = EmbyError::from_status_code(403, "forbidden").into();
        assert!(matches!(err, ClientError::Unauthorized(_)));

        let err: ClientError = EmbyError::from_status_code(503, "busy").into();
        assert!(matches!(err, ClientError::Status { code: 503, .. }));
    }
}
