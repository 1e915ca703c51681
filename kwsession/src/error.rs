//! Error types for the session engine

use serde::Serialize;

/// Result type alias for collaborator calls
pub type Result<T> = std::result::Result<T, ClientError>;

/// Failure of a single call to a media server
///
/// These are the recoverable errors of the engine: a failed progress push or
/// a failed finalize step is logged and the session carries on.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    /// Credentials rejected by the server
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Server answered with a non-success status
    #[error("Server returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Network level failure (connection refused, timeout, TLS...)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Operation not implemented by this client
    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),
}

impl ClientError {
    /// Create a transport error from any displayable error
    pub fn transport(msg: impl std::fmt::Display) -> Self {
        Self::Transport(msg.to_string())
    }

    /// Create a status error
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }
}

/// Reason why a session ended in `Failed`
///
/// None of these ever crosses the boundary of the driver that produced it:
/// they end up in the [`Outcome`](crate::Outcome) of that driver only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SessionError {
    /// Login against the server failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// No playable item could be found for the account
    #[error("No playable content: {0}")]
    NoContent(String),

    /// Neither the stop event nor the user-data write reached the server
    #[error("Finalize failed: {0}")]
    Finalize(String),

    /// The shutdown signal ended the session before it could complete
    #[error("Interrupted: {0}")]
    Interrupted(String),

    /// No client could be built for this server
    #[error("Client setup failed: {0}")]
    Client(String),

    /// The driver task panicked
    #[error("Driver panicked: {0}")]
    Panicked(String),
}

impl SessionError {
    /// Short machine friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            SessionError::Authentication(_) => "authentication",
            SessionError::NoContent(_) => "no_content",
            SessionError::Finalize(_) => "finalize",
            SessionError::Interrupted(_) => "interrupted",
            SessionError::Client(_) => "client",
            SessionError::Panicked(_) => "panicked",
        }
    }
}
