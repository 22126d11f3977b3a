//! Domain-specific error types for the remote-control engine.
//!
//! Every fallible operation inside the core returns
//! `Result<T, RemoteError>`. The service boundary converts these into
//! sentinel / `false` results, so no error ever reaches the transport.

use thiserror::Error;

/// The canonical error type for the remote-control engine.
#[derive(Debug, Error)]
pub enum RemoteError {
    // ── Session Errors ───────────────────────────────────────────
    /// The token is the sentinel or does not match the live session.
    #[error("invalid token: {0}")]
    InvalidToken(i32),

    /// The password offered on connect was rejected.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// A controller is already attached.
    #[error("session busy: a controller is already connected")]
    SessionBusy,

    // ── Storage Errors ───────────────────────────────────────────
    /// Directory creation or file write failed.
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A received file name would escape the storage directory.
    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    // ── Pipeline Errors ──────────────────────────────────────────
    /// The OS capture primitive is unavailable or failed.
    #[error("capture failure: {0}")]
    Capture(String),

    /// Resizing or image compression failed.
    #[error("encoding error: {0}")]
    Encoding(String),

    // ── Collaborator Errors ──────────────────────────────────────
    /// An input / volume / power actuator reported a failure.
    #[error("actuator error: {0}")]
    Actuator(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for RemoteError {
    fn from(s: String) -> Self {
        RemoteError::Other(s)
    }
}

impl From<&str> for RemoteError {
    fn from(s: &str) -> Self {
        RemoteError::Other(s.to_string())
    }
}

impl From<image::ImageError> for RemoteError {
    fn from(e: image::ImageError) -> Self {
        RemoteError::Encoding(e.to_string())
    }
}

impl From<Box<bincode::ErrorKind>> for RemoteError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        RemoteError::Encoding(e.to_string())
    }
}
