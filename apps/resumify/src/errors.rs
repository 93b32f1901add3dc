use thiserror::Error;

use crate::form::validation::ValidationErrors;
use crate::form::FormError;

/// Client-level error type.
/// Every call against the Resume Service and every local mutation that can fail
/// funnels into this enum so callers only deal with one `Result` type.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No active resume; create or attach one before saving")]
    NoActiveResume,

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Form error: {0}")]
    Form(#[from] FormError),

    #[error("The assistant is still replying to the previous message")]
    ChatBusy,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid base64 payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// True for failures worth offering the user a manual retry for.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(_) => true,
            ClientError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
