//! Error types for the Reflexa domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! The completion boundary has its own error type so callers can tell a
//! transport problem from a rejected or garbled response.

use thiserror::Error;

/// The top-level error type for all Reflexa operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Caller input ---
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures of a single completion call.
#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    /// Timeout, refused connection, broken body stream.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Completion service returned status {status_code}: {body}")]
    Service { status_code: u16, body: String },

    /// The endpoint answered 200 but without `choices[0].message.content`.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("Completion client not configured: {0}")]
    NotConfigured(String),
}

impl CompletionError {
    /// HTTP status for service errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Service { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }
}
