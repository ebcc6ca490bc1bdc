//! Error types for the remote service client.

use std::fmt;

use pdfchat_core::error::PdfChatError;

/// Which remote operation an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Upload,
    Query,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upload => write!(f, "upload"),
            Operation::Query => write!(f, "query"),
        }
    }
}

/// Uniform failure type for both remote operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl ServiceError {
    /// The user-facing message. A non-success response yields its body as-is.
    pub fn message(&self) -> String {
        match self {
            ServiceError::Status { body, .. } => body.clone(),
            other => other.to_string(),
        }
    }

    /// Lift into the application error for the given operation.
    pub fn into_error(self, operation: Operation) -> PdfChatError {
        match operation {
            Operation::Upload => PdfChatError::Upload(self.message()),
            Operation::Query => PdfChatError::Query(self.message()),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else if err.is_builder() {
            ServiceError::InvalidEndpoint(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}
