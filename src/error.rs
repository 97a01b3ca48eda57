//! Error types for Folio.

use thiserror::Error;

/// Common error type for Folio.
#[derive(Error, Debug)]
pub enum FolioError {
    /// The remote store answered with a non-success status.
    ///
    /// `message` carries the store's own `detail` text when the response had one.
    #[error("store error: {message}")]
    Store {
        /// HTTP status code, if the failure came from an HTTP response.
        status: Option<u16>,
        /// Message reported by the store.
        message: String,
    },

    /// The request never completed (connection refused, timeout, broken body).
    #[error("network error: {0}")]
    Network(String),

    /// The store rejected our credentials.
    #[error("unauthorized")]
    Unauthorized,

    /// Validation error for user input, raised before any network call.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The operation was cancelled before its result could be applied.
    #[error("operation cancelled")]
    Cancelled,

    /// A mutating action was attempted on a read-only explorer.
    #[error("explorer is read-only")]
    ReadOnly,

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error.
    #[error("JSON error: {0}")]
    Json(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FolioError {
    /// Build a store error from a status code and message.
    pub fn store(status: Option<u16>, message: impl Into<String>) -> Self {
        FolioError::Store {
            status,
            message: message.into(),
        }
    }

    /// Text suitable for a user-visible notification.
    ///
    /// Store failures show the store's message; transport failures fall back
    /// to `fallback`, since their raw text is rarely meaningful to a user.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            FolioError::Store { message, .. } if !message.trim().is_empty() => message.clone(),
            FolioError::Validation(msg) => msg.clone(),
            FolioError::Unauthorized => "Your session has expired, please sign in again".to_string(),
            FolioError::ReadOnly => "This view is read-only".to_string(),
            _ => fallback.to_string(),
        }
    }

    /// Whether this error is a cancelled (stale) operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FolioError::Cancelled)
    }
}

impl From<serde_json::Error> for FolioError {
    fn from(e: serde_json::Error) -> Self {
        FolioError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for FolioError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return FolioError::Unauthorized;
            }
            return FolioError::store(Some(status.as_u16()), e.to_string());
        }
        FolioError::Network(e.to_string())
    }
}

/// Result type alias for Folio operations.
pub type Result<T> = std::result::Result<T, FolioError>;
