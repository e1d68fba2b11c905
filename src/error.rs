//! Error types for vidsat.

use thiserror::Error;

/// Common error type for vidsat.
#[derive(Error, Debug)]
pub enum VidsatError {
    /// Configuration is missing, unreadable or incomplete.
    ///
    /// Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error from the SQLite watermark backend.
    #[error("database error: {0}")]
    Database(String),

    /// A feed or permalink could not be fetched.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The feed document could not be parsed.
    #[error("feed parse error: {0}")]
    Parse(String),

    /// The watermark could not be read or persisted.
    #[error("watermark error: {0}")]
    Watermark(String),

    /// The sharing endpoint rejected the credentials.
    ///
    /// Fatal for the whole batch.
    #[error("authentication rejected for login {login:?} (HTTP {status})")]
    Auth { login: String, status: u16 },

    /// A single share attempt failed for a non-auth reason.
    #[error("failed to share {url}: {reason}")]
    Share { url: String, reason: String },
}

impl VidsatError {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, VidsatError::Config(_) | VidsatError::Auth { .. })
    }

    pub(crate) fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
        VidsatError::Fetch {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<sqlx::Error> for VidsatError {
    fn from(e: sqlx::Error) -> Self {
        VidsatError::Database(e.to_string())
    }
}

/// Result type alias for vidsat operations.
pub type Result<T> = std::result::Result<T, VidsatError>;
