//! Shared configuration, error types, and domain types for pdfchat.

pub mod config;
pub mod error;
pub mod types;

pub use config::PdfChatConfig;
pub use error::{PdfChatError, Result, ValidationError};
pub use types::*;
