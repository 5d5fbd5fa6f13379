//! Error types for postsync.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, 6=remote, etc.)
//! - Retryability flags so callers can tell transient remote failures apart
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for postsync operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    PostNotFound,

    // Validation (exit 4)
    InvalidStatus,
    InvalidArgument,

    // Remote (exit 6)
    RemoteUnavailable,
    RemoteApiError,

    // Config (exit 7)
    ConfigError,
    RemoteNotConfigured,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::PostNotFound => "POST_NOT_FOUND",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::RemoteUnavailable => "REMOTE_UNAVAILABLE",
            Self::RemoteApiError => "REMOTE_API_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::RemoteNotConfigured => "REMOTE_NOT_CONFIGURED",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::PostNotFound => 3,
            Self::InvalidStatus | Self::InvalidArgument => 4,
            Self::RemoteUnavailable | Self::RemoteApiError => 6,
            Self::ConfigError | Self::RemoteNotConfigured => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// True for transient remote failures (network, timeout, 5xx) and
    /// database contention. False for configuration and validation errors.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RemoteUnavailable | Self::DatabaseError | Self::InvalidStatus
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in postsync operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `postsync init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Post not found: {id}")]
    PostNotFound { id: String },

    #[error("Post not found: {id} (did you mean: {}?)", similar.join(", "))]
    PostNotFoundSimilar { id: String, similar: Vec<String> },

    #[error("Invalid status: {value}")]
    InvalidStatus {
        value: String,
        suggestion: Option<String>,
    },

    /// Network failure, timeout, or server-side (5xx) error from the remote.
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote rejected the request (4xx other than not-found).
    #[error("Remote API error ({status}): {message}")]
    RemoteApi { status: u16, message: String },

    /// Credentials for the remote publisher are missing.
    #[error("Remote publisher not configured")]
    RemoteNotConfigured,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::PostNotFound { .. } | Self::PostNotFoundSimilar { .. } => {
                ErrorCode::PostNotFound
            }
            Self::InvalidStatus { .. } => ErrorCode::InvalidStatus,
            Self::RemoteUnavailable(_) => ErrorCode::RemoteUnavailable,
            Self::RemoteApi { .. } => ErrorCode::RemoteApiError,
            Self::RemoteNotConfigured => ErrorCode::RemoteNotConfigured,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `postsync init` to create the local post database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::PostNotFound { id } => Some(format!(
                "No post with ID '{id}'. Use `postsync post list` to see local posts."
            )),
            Self::PostNotFoundSimilar { similar, .. } => {
                Some(format!("Did you mean: {}?", similar.join(", ")))
            }

            Self::InvalidStatus { suggestion, .. } => Some(suggestion.as_ref().map_or_else(
                || "Valid statuses: draft, reviewed, published".to_string(),
                |s| format!("Did you mean '{s}'? Valid statuses: draft, reviewed, published"),
            )),

            Self::RemoteNotConfigured => Some(
                "Set BLOGGER_BLOG_ID, BLOGGER_CLIENT_ID, BLOGGER_CLIENT_SECRET and \
                 BLOGGER_REFRESH_TOKEN, or add a \"remote\" section to ~/.postsync/config.json"
                    .to_string(),
            ),

            Self::RemoteUnavailable(_) => Some(
                "The remote did not answer in time or failed server-side. Retry later."
                    .to_string(),
            ),

            Self::RemoteApi { .. }
            | Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
