//! pdfchat binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Build the HTTP client for the document service
//! 3. Spawn the session controller
//! 4. Upload the PDF, then answer questions read from stdin
//!
//! Logs go to stderr; stdout carries the conversation.

mod cli;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use pdfchat_client::{HttpServiceClient, RemoteService};
use pdfchat_core::config::PdfChatConfig;
use pdfchat_core::error::{PdfChatError, Result};
use pdfchat_core::types::{DocumentHandle, Role, SelectedFile};
use pdfchat_session::{SessionController, SessionHandle, SessionView, UploadState};

use cli::{CliArgs, Input};

/// How often the upload progress line is redrawn.
const PROGRESS_POLL: Duration = Duration::from_millis(100);

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let mut config = PdfChatConfig::load_or_default(&config_file);
    args.apply(&mut config);

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting pdfchat v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Remote service.
    let client = HttpServiceClient::new(&config.service)
        .map_err(|e| PdfChatError::Config(e.to_string()))?;
    tracing::info!(
        upload = %client.upload_url(),
        query = %client.query_url(),
        "Document service configured"
    );
    let service: Arc<dyn RemoteService> = Arc::new(client);

    // Session.
    let (session, task) = SessionController::spawn(config.session.clone(), service);
    let answer_poll = (config.session.typewriter_delay() / 2).max(Duration::from_millis(1));

    let result = run(&session, &args.pdf, answer_poll).await;

    session.shutdown();
    if let Err(e) = task.await {
        tracing::warn!(error = %e, "Session task ended abnormally");
    }
    tracing::info!("pdfchat stopped");
    Ok(result?)
}

/// Upload the initial document, then serve the question loop until EOF or `/quit`.
async fn run(session: &SessionHandle, pdf: &Path, answer_poll: Duration) -> Result<()> {
    upload(session, pdf).await?;
    print_help()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match cli::parse_input(&line) {
            Input::Quit => break,
            Input::MissingPath => println!("Usage: /new <PATH>"),
            Input::NewDocument(path) => {
                session.reset().await?;
                match upload(session, &path).await {
                    Ok(_) => {}
                    Err(PdfChatError::Shutdown) => return Err(PdfChatError::Shutdown),
                    Err(e) => println!("{e}"),
                }
            }
            Input::Question(text) => {
                session.set_input(text).await?;
                match session.submit_input().await {
                    Ok(()) => print_answer(session, answer_poll).await?,
                    Err(PdfChatError::Validation(notice)) => println!("{notice}"),
                    Err(e) => return Err(e),
                }
            }
        }
        prompt()?;
    }
    Ok(())
}

/// Select and upload `path`, drawing the progress bar until the session
/// reaches Chat mode or the upload fails.
async fn upload(session: &SessionHandle, path: &Path) -> Result<DocumentHandle> {
    let file = SelectedFile::from_path(path)?;
    session.select_file(file).await?;

    let view = session.snapshot().await?;
    println!(
        "{} ({})",
        view.file_name.as_deref().unwrap_or_default(),
        view.file_size.as_deref().unwrap_or_default()
    );
    session.begin_upload().await?;

    let mut out = std::io::stdout();
    loop {
        let view = session.snapshot().await?;
        match (&view.upload, view.handle.as_ref()) {
            (UploadState::Succeeded, Some(handle)) => {
                writeln!(out, "\r{} {:>3}%", status(&view), view.progress)?;
                tracing::debug!(handle = %handle, "Ready for questions");
                return Ok(handle.clone());
            }
            (UploadState::Failed { message }, _) => {
                writeln!(out, "\r{}", status(&view))?;
                return Err(PdfChatError::Upload(message.clone()));
            }
            (UploadState::Idle, _) => {
                return Err(PdfChatError::Upload("upload was cancelled".to_string()));
            }
            _ => {
                write!(out, "\r{} {:>3}%", status(&view), view.progress)?;
                out.flush()?;
            }
        }
        tokio::time::sleep(PROGRESS_POLL).await;
    }
}

/// Stream the answer as it is revealed, ending once it is committed.
async fn print_answer(session: &SessionHandle, poll: Duration) -> Result<()> {
    let mut out = std::io::stdout();
    let mut printed = 0;
    loop {
        let view = session.snapshot().await?;
        let text = if view.query_pending {
            view.pending_reply().unwrap_or_default().to_string()
        } else {
            last_answer(&view)
        };

        if let Some(fresh) = text.get(printed..).filter(|s| !s.is_empty()) {
            write!(out, "{fresh}")?;
            out.flush()?;
            printed = text.len();
        }

        if !view.query_pending {
            writeln!(out)?;
            return Ok(());
        }
        tokio::time::sleep(poll).await;
    }
}

fn last_answer(view: &SessionView) -> String {
    view.committed()
        .last()
        .filter(|turn| turn.role == Role::Assistant)
        .map(|turn| turn.text.clone())
        .unwrap_or_default()
}

fn status(view: &SessionView) -> &'static str {
    view.status_label.unwrap_or_default()
}

fn print_help() -> std::io::Result<()> {
    let mut out = std::io::stdout();
    writeln!(out, "Ask a question about the document. /new <PATH> uploads another PDF, /quit exits.")
}

fn prompt() -> std::io::Result<()> {
    let mut out = std::io::stdout();
    write!(out, "> ")?;
    out.flush()
}
