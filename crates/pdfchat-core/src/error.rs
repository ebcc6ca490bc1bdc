use thiserror::Error;

/// Top-level error type for pdfchat.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for PdfChatError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PdfChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("File upload failed: {0}")]
    Upload(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Session is shutting down")]
    Shutdown,
}

/// Problems caught before any request is sent.
///
/// These are surfaced to the user as an inline notice and never reach the
/// network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please choose a file first!")]
    NoFileSelected,

    #[error("Please drop a valid PDF file.")]
    NotPdf(String),

    #[error("An upload is already in progress.")]
    UploadInProgress,

    #[error("Choose a new file to replace the current document.")]
    NotInUpload,

    #[error("Enter a query.")]
    EmptyQuestion,

    #[error("Please upload a file first.")]
    NoDocument,

    #[error("Upload a PDF before asking questions.")]
    NotInChat,

    #[error("Still waiting for the previous answer.")]
    QueryPending,
}

impl From<toml::de::Error> for PdfChatError {
    fn from(err: toml::de::Error) -> Self {
        PdfChatError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for PdfChatError {
    fn from(err: toml::ser::Error) -> Self {
        PdfChatError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for PdfChatError {
    fn from(err: serde_json::Error) -> Self {
        PdfChatError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for pdfchat operations.
pub type Result<T> = std::result::Result<T, PdfChatError>;
