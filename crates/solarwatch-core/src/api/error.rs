use std::fmt;

use thiserror::Error;

use super::response::GraphQLError;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Failure to deliver an operation or to read its response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Unexpected status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode request: {0}")]
    Encode(String),

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

impl TransportError {
    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        TransportError::Status {
            status,
            body: Self::truncate_body(body),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Unreachable(e.to_string())
        } else if e.is_decode() {
            TransportError::InvalidResponse(e.to_string())
        } else {
            TransportError::Http(e)
        }
    }
}

/// Why an operation was stopped before it reached the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    NoSession,
    /// Past `exp`, or the credential could not be read at all
    SessionExpired,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::NoSession => f.write_str("not signed in"),
            CancelReason::SessionExpired => f.write_str("session expired"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("{}", format_errors(.0))]
    Application(Vec<GraphQLError>),

    #[error("Operation cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Session store error: {0}")]
    Store(anyhow::Error),
}

impl PipelineError {
    /// Errors that end the session and are handled by redirecting to login
    /// rather than by showing a message.
    pub fn is_session_error(&self) -> bool {
        match self {
            PipelineError::Cancelled(_) => true,
            PipelineError::Application(errors) => errors.iter().any(|e| e.is_unauthenticated()),
            _ => false,
        }
    }
}

fn format_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
