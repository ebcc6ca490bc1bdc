//! Session runtime.
//!
//! A single task owns the [`Session`] and applies every change to it, so no
//! locks guard session state. Requests from the front-end and completions
//! from background work both arrive as [`Event`]s on one channel. Background
//! completions carry the generation they were issued under and are dropped
//! if the session has started over since.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};

use pdfchat_client::{RemoteService, ServiceError};
use pdfchat_core::config::SessionConfig;
use pdfchat_core::error::{PdfChatError, Result, ValidationError};
use pdfchat_core::types::{DocumentHandle, SelectedFile};

use crate::progress::{ProgressSettings, ProgressSimulator};
use crate::state::{QueryState, Question, Session, SessionView};
use crate::typewriter::Typewriter;

/// A user request.
#[derive(Debug, Clone)]
pub enum Command {
    SelectFile(SelectedFile),
    BeginUpload,
    SubmitQuestion(String),
    SetInput(String),
    SubmitInput,
    Reset,
}

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Event {
    Command {
        command: Command,
        reply: oneshot::Sender<std::result::Result<(), ValidationError>>,
    },
    Snapshot(oneshot::Sender<SessionView>),
    UploadFinished {
        generation: u64,
        outcome: std::result::Result<DocumentHandle, ServiceError>,
    },
    UploadConfirmed {
        generation: u64,
        handle: DocumentHandle,
    },
    QueryFinished {
        generation: u64,
        outcome: std::result::Result<String, ServiceError>,
    },
    RevealCompleted {
        generation: u64,
    },
    Shutdown,
}

impl Event {
    /// Generation stamp of a background completion.
    fn generation(&self) -> Option<u64> {
        match self {
            Event::UploadFinished { generation, .. }
            | Event::UploadConfirmed { generation, .. }
            | Event::QueryFinished { generation, .. }
            | Event::RevealCompleted { generation } => Some(*generation),
            _ => None,
        }
    }
}

/// Owns the session and the timers and requests working on its behalf.
pub struct SessionController {
    session: Session,
    config: SessionConfig,
    service: Arc<dyn RemoteService>,
    events: mpsc::UnboundedSender<Event>,
    inbox: mpsc::UnboundedReceiver<Event>,
    progress: Option<ProgressSimulator>,
    typewriter: Typewriter,
    /// Full answer being revealed, committed once the reveal completes.
    revealing: Option<String>,
    tasks: Vec<AbortHandle>,
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("session", &self.session)
            .field("progress", &self.progress)
            .field("revealing", &self.revealing)
            .field("tasks", &self.tasks.len())
            .finish()
    }
}

impl SessionController {
    pub fn new(config: SessionConfig, service: Arc<dyn RemoteService>) -> (Self, SessionHandle) {
        let (events, inbox) = mpsc::unbounded_channel();
        let handle = SessionHandle {
            events: events.clone(),
        };
        let controller = Self {
            session: Session::new(),
            typewriter: Typewriter::new(config.typewriter_delay()),
            config,
            service,
            events,
            inbox,
            progress: None,
            revealing: None,
            tasks: Vec::new(),
        };
        (controller, handle)
    }

    /// Create a controller and run it on a new task.
    pub fn spawn(
        config: SessionConfig,
        service: Arc<dyn RemoteService>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (controller, handle) = Self::new(config, service);
        let task = tokio::spawn(controller.run());
        (handle, task)
    }

    /// Process events until shutdown.
    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session.id(), "Session started");
        while let Some(event) = self.inbox.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        self.cancel_activity();
        tracing::info!(session_id = %self.session.id(), "Session stopped");
    }

    /// Apply one event. Returns `false` once the controller should stop.
    fn handle_event(&mut self, event: Event) -> bool {
        if let Some(generation) = event.generation() {
            if generation != self.session.generation() {
                tracing::debug!(
                    session_id = %self.session.id(),
                    generation,
                    current = self.session.generation(),
                    "Discarding stale completion"
                );
                return true;
            }
        }

        match event {
            Event::Command { command, reply } => {
                let result = self.apply(command);
                let _ = reply.send(result);
            }
            Event::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Event::UploadFinished { generation, outcome } => {
                self.on_upload_finished(generation, outcome)
            }
            Event::UploadConfirmed { handle, .. } => {
                let handle = handle.with_suffix(&self.config.handle_suffix);
                self.session.upload_succeeded(handle);
            }
            Event::QueryFinished { generation, outcome } => {
                self.on_query_finished(generation, outcome)
            }
            Event::RevealCompleted { .. } => self.finish_query(),
            Event::Shutdown => return false,
        }
        true
    }

    fn apply(&mut self, command: Command) -> std::result::Result<(), ValidationError> {
        match command {
            Command::SelectFile(file) => {
                self.session.select_file(file)?;
                self.cancel_activity();
            }
            Command::BeginUpload => {
                let file = self.session.begin_upload()?;
                self.start_upload(file);
            }
            Command::SubmitQuestion(text) => {
                let question = self.session.submit_question(&text)?;
                self.start_query(question);
            }
            Command::SetInput(text) => self.session.set_input(text),
            Command::SubmitInput => {
                let question = self.session.submit_input()?;
                self.start_query(question);
            }
            Command::Reset => {
                tracing::info!(session_id = %self.session.id(), "Session reset");
                self.session.reset();
                self.cancel_activity();
            }
        }
        Ok(())
    }

    fn start_upload(&mut self, file: SelectedFile) {
        let generation = self.session.generation();
        tracing::info!(
            session_id = %self.session.id(),
            generation,
            file = %file.name(),
            bytes = file.size(),
            "Uploading document"
        );

        self.progress = Some(ProgressSimulator::start(ProgressSettings::from_config(
            &self.config,
        )));

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        self.track(tokio::spawn(async move {
            let outcome = service.submit_document(&file).await;
            let _ = events.send(Event::UploadFinished {
                generation,
                outcome,
            });
        }));
    }

    fn on_upload_finished(
        &mut self,
        generation: u64,
        outcome: std::result::Result<DocumentHandle, ServiceError>,
    ) {
        match outcome {
            Ok(handle) => {
                self.stop_progress(100.0);
                let delay = self.config.confirm_delay();
                let events = self.events.clone();
                self.track(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = events.send(Event::UploadConfirmed { generation, handle });
                }));
            }
            Err(err) => {
                self.stop_progress(0.0);
                self.session.upload_failed(err.message());
            }
        }
    }

    fn start_query(&mut self, question: Question) {
        let generation = self.session.generation();
        tracing::info!(
            session_id = %self.session.id(),
            generation,
            handle = %question.handle,
            "Submitting question"
        );

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        self.track(tokio::spawn(async move {
            let outcome = service
                .submit_question(&question.text, &question.handle)
                .await;
            let _ = events.send(Event::QueryFinished {
                generation,
                outcome,
            });
        }));
    }

    fn on_query_finished(
        &mut self,
        generation: u64,
        outcome: std::result::Result<String, ServiceError>,
    ) {
        let answer = match outcome {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(
                    session_id = %self.session.id(),
                    error = %err,
                    "Query failed, showing fallback"
                );
                self.config.fallback_message.clone()
            }
        };

        self.revealing = Some(answer.clone());
        let events = self.events.clone();
        self.typewriter.reveal(answer, move || {
            let _ = events.send(Event::RevealCompleted { generation });
        });
    }

    /// The single place a pending query returns to Idle.
    fn finish_query(&mut self) {
        if let Some(answer) = self.revealing.take() {
            self.session.finish_query(answer);
        }
        self.typewriter.clear();
    }

    fn snapshot(&self) -> SessionView {
        let progress = self.progress.as_ref().map_or(0, ProgressSimulator::percent);
        let revealed = (self.session.query() == QueryState::Pending
            && self.revealing.is_some())
        .then(|| self.typewriter.revealed());
        let typing = self.revealing.is_some() && self.typewriter.is_typing();
        self.session.view(progress, revealed.as_deref(), typing)
    }

    fn stop_progress(&mut self, final_value: f64) {
        if let Some(progress) = self.progress.as_mut() {
            progress.stop(final_value);
        }
    }

    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(task.abort_handle());
    }

    /// Abort requests and timers, and drop whatever they were producing.
    fn cancel_activity(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.progress = None;
        self.revealing = None;
        self.typewriter.clear();
    }
}

/// Cloneable front-end to a running [`SessionController`].
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<Event>,
}

impl SessionHandle {
    pub async fn select_file(&self, file: SelectedFile) -> Result<()> {
        self.command(Command::SelectFile(file)).await
    }

    pub async fn begin_upload(&self) -> Result<()> {
        self.command(Command::BeginUpload).await
    }

    pub async fn submit_question(&self, text: impl Into<String>) -> Result<()> {
        self.command(Command::SubmitQuestion(text.into())).await
    }

    pub async fn set_input(&self, text: impl Into<String>) -> Result<()> {
        self.command(Command::SetInput(text.into())).await
    }

    pub async fn submit_input(&self) -> Result<()> {
        self.command(Command::SubmitInput).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.command(Command::Reset).await
    }

    /// Send a command and wait for it to be accepted or rejected.
    pub async fn command(&self, command: Command) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Command { command, reply })?;
        rx.await.map_err(|_| PdfChatError::Shutdown)??;
        Ok(())
    }

    pub async fn snapshot(&self) -> Result<SessionView> {
        let (reply, rx) = oneshot::channel();
        self.send(Event::Snapshot(reply))?;
        rx.await.map_err(|_| PdfChatError::Shutdown)
    }

    /// Stop the controller. Its timers and requests are cancelled.
    pub fn shutdown(&self) {
        let _ = self.events.send(Event::Shutdown);
    }

    fn send(&self, event: Event) -> Result<()> {
        self.events.send(event).map_err(|_| PdfChatError::Shutdown)
    }
}

// =============================================================================
// Tests
// =============================================================================
