//! Session state and its transitions.
//!
//! `Session` holds everything the user can observe and validates every
//! request against it. It performs no I/O: the controller runs the network
//! calls and timers and feeds their outcomes back in.
//!
//! Lifecycle:
//! - Upload mode: select a PDF, upload it (Idle -> InProgress -> Succeeded | Failed)
//! - Succeeded switches to Chat mode with the document handle set
//! - Chat mode: each question moves the query Idle -> Pending -> Idle
//! - Reset, or selecting a new file from Chat, returns to Upload mode

use std::fmt;

use uuid::Uuid;

use pdfchat_core::error::ValidationError;
use pdfchat_core::types::{DocumentHandle, Role, SelectedFile, Turn};

use crate::transcript::{ProjectedTurn, Transcript};

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Upload,
    Chat,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Upload => write!(f, "Upload"),
            Mode::Chat => write!(f, "Chat"),
        }
    }
}

/// Status of the current upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    /// `progress` is the whole percentage shown on the progress bar.
    InProgress { progress: u8 },
    Succeeded,
    Failed { message: String },
}

impl UploadState {
    /// Text shown next to the progress bar.
    pub fn status_label(&self) -> Option<&'static str> {
        match self {
            UploadState::Idle => None,
            UploadState::InProgress { .. } => Some("Uploading..."),
            UploadState::Succeeded => Some("Uploaded successfully!"),
            UploadState::Failed { .. } => Some("Upload failed."),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, UploadState::InProgress { .. })
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadState::Idle => write!(f, "Idle"),
            UploadState::InProgress { progress } => write!(f, "InProgress({progress}%)"),
            UploadState::Succeeded => write!(f, "Succeeded"),
            UploadState::Failed { message } => write!(f, "Failed({message})"),
        }
    }
}

/// Whether a question is awaiting its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Pending,
}

/// A question accepted by [`Session::submit_question`], ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub handle: DocumentHandle,
}

/// A rendered turn in a [`SessionView`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTurn {
    pub role: Role,
    pub text: String,
    /// The answer is still being revealed and is not yet committed.
    pub pending: bool,
}

impl From<ProjectedTurn<'_>> for ViewTurn {
    fn from(turn: ProjectedTurn<'_>) -> Self {
        Self {
            role: turn.role,
            text: turn.text.to_string(),
            pending: turn.pending,
        }
    }
}

/// Owned, render-ready copy of the observable session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session_id: Uuid,
    pub mode: Mode,
    pub file_name: Option<String>,
    pub file_size: Option<String>,
    pub handle: Option<DocumentHandle>,
    pub upload: UploadState,
    /// Whole percentage shown on the progress bar.
    pub progress: u8,
    pub status_label: Option<&'static str>,
    pub query_pending: bool,
    /// The typewriter is still revealing the pending answer.
    pub typing: bool,
    pub turns: Vec<ViewTurn>,
    pub notice: Option<ValidationError>,
    pub input: String,
}

impl SessionView {
    /// Committed turns only.
    pub fn committed(&self) -> impl Iterator<Item = &ViewTurn> {
        self.turns.iter().filter(|turn| !turn.pending)
    }

    /// The answer currently being revealed, if any.
    pub fn pending_reply(&self) -> Option<&str> {
        self.turns
            .iter()
            .find(|turn| turn.pending)
            .map(|turn| turn.text.as_str())
    }
}

/// The state of one user session.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    mode: Mode,
    file: Option<SelectedFile>,
    handle: Option<DocumentHandle>,
    upload: UploadState,
    query: QueryState,
    transcript: Transcript,
    input: String,
    notice: Option<ValidationError>,
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            mode: Mode::Upload,
            file: None,
            handle: None,
            upload: UploadState::Idle,
            query: QueryState::Idle,
            transcript: Transcript::new(),
            input: String::new(),
            notice: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn handle(&self) -> Option<&DocumentHandle> {
        self.handle.as_ref()
    }

    pub fn upload(&self) -> &UploadState {
        &self.upload
    }

    pub fn query(&self) -> QueryState {
        self.query
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn notice(&self) -> Option<&ValidationError> {
        self.notice.as_ref()
    }

    /// Incremented whenever the session starts over. Outcomes of work issued
    /// under an older generation no longer apply.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Choose the file to upload. Always starts the session over, so an
    /// upload in flight or an open chat is abandoned.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), ValidationError> {
        if !file.is_pdf() {
            return self.reject(ValidationError::NotPdf(file.name().to_string()));
        }

        self.reset();
        tracing::debug!(
            session_id = %self.id,
            generation = self.generation,
            file = %file.name(),
            bytes = file.size(),
            "File selected"
        );
        self.file = Some(file);
        Ok(())
    }

    /// Mark the upload as started and return the file to send.
    pub fn begin_upload(&mut self) -> Result<SelectedFile, ValidationError> {
        if self.mode != Mode::Upload {
            return self.reject(ValidationError::NotInUpload);
        }
        if self.upload.is_in_progress() {
            return self.reject(ValidationError::UploadInProgress);
        }
        let Some(file) = self.file.clone() else {
            return self.reject(ValidationError::NoFileSelected);
        };

        self.notice = None;
        self.upload = UploadState::InProgress { progress: 0 };
        Ok(file)
    }

    /// The upload was confirmed. `handle` already carries its suffix.
    pub fn upload_succeeded(&mut self, handle: DocumentHandle) {
        tracing::info!(session_id = %self.id, handle = %handle, "Document ready");
        self.upload = UploadState::Succeeded;
        self.handle = Some(handle);
        self.mode = Mode::Chat;
    }

    pub fn upload_failed(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(session_id = %self.id, message = %message, "Upload failed");
        self.upload = UploadState::Failed { message };
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Accept a question: the user turn is committed and the query goes
    /// Pending before anything is sent.
    pub fn submit_question(&mut self, text: &str) -> Result<Question, ValidationError> {
        if self.mode != Mode::Chat {
            return self.reject(ValidationError::NotInChat);
        }
        let Some(handle) = self.handle.clone() else {
            return self.reject(ValidationError::NoDocument);
        };
        let text = text.trim();
        if text.is_empty() {
            return self.reject(ValidationError::EmptyQuestion);
        }
        if self.query == QueryState::Pending {
            return self.reject(ValidationError::QueryPending);
        }

        self.notice = None;
        self.transcript.append(Turn::user(text));
        self.input.clear();
        self.query = QueryState::Pending;
        Ok(Question {
            text: text.to_string(),
            handle,
        })
    }

    /// Submit the input buffer as a question.
    pub fn submit_input(&mut self) -> Result<Question, ValidationError> {
        let text = self.input.clone();
        self.submit_question(&text)
    }

    /// Commit the assistant turn and return the query to Idle.
    pub fn finish_query(&mut self, answer: impl Into<String>) {
        if self.query != QueryState::Pending {
            tracing::debug!(session_id = %self.id, "No pending query to finish");
            return;
        }
        self.transcript.append(Turn::assistant(answer));
        self.query = QueryState::Idle;
    }

    /// Start over in Upload mode with nothing selected.
    pub fn reset(&mut self) {
        self.mode = Mode::Upload;
        self.file = None;
        self.handle = None;
        self.upload = UploadState::Idle;
        self.query = QueryState::Idle;
        self.transcript.clear();
        self.input.clear();
        self.notice = None;
        self.generation += 1;
    }

    /// Build a view, given the runtime-owned progress, revealed text and
    /// typewriter state. The last two only show while a query is pending.
    pub fn view(&self, progress: u8, pending_reply: Option<&str>, typing: bool) -> SessionView {
        let pending_reply = pending_reply.filter(|_| self.query == QueryState::Pending);
        let typing = typing && self.query == QueryState::Pending;
        SessionView {
            session_id: self.id,
            mode: self.mode,
            file_name: self.file.as_ref().map(|f| f.name().to_string()),
            file_size: self.file.as_ref().map(SelectedFile::size_label),
            handle: self.handle.clone(),
            upload: match self.upload {
                UploadState::InProgress { .. } => UploadState::InProgress { progress },
                ref other => other.clone(),
            },
            progress,
            status_label: self.upload.status_label(),
            query_pending: self.query == QueryState::Pending,
            typing,
            turns: self
                .transcript
                .projection(pending_reply)
                .map(ViewTurn::from)
                .collect(),
            notice: self.notice.clone(),
            input: self.input.clone(),
        }
    }

    fn reject<T>(&mut self, err: ValidationError) -> Result<T, ValidationError> {
        tracing::debug!(session_id = %self.id, error = %err, "Request rejected");
        self.notice = Some(err.clone());
        Err(err)
    }
}

// =============================================================================
// Tests
// =============================================================================
