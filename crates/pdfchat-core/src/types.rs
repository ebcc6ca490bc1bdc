use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Leading bytes of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

// =============================================================================
// Documents
// =============================================================================

/// A file chosen by the user for upload.
///
/// Owned by the session and replaced wholesale on every new selection.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    content: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Read a file from disk, keeping only its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Whether this looks like a PDF, by extension or by magic bytes.
    pub fn is_pdf(&self) -> bool {
        self.name.to_ascii_lowercase().ends_with(".pdf") || self.content.starts_with(PDF_MAGIC)
    }

    /// Human-readable size in megabytes with two decimals, e.g. `2.00 MB`.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size() as f64 / 1024.0 / 1024.0)
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Opaque identifier the remote service assigns to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a new handle with `suffix` appended, e.g. `abc123` -> `abc123.pdf`.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self(format!("{}{}", self.0, suffix))
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Conversation
// =============================================================================

/// Author of a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One committed message in the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}
