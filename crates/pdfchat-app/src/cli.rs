//! CLI argument definitions for the pdfchat binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use pdfchat_core::config::PdfChatConfig;

/// Ask questions about a PDF document from the terminal.
#[derive(Parser, Debug)]
#[command(name = "pdfchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Upload endpoint URL.
    #[arg(long = "upload-endpoint")]
    pub upload_endpoint: Option<String>,

    /// Query endpoint URL.
    #[arg(long = "query-endpoint")]
    pub query_endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// The PDF to upload.
    pub pdf: PathBuf,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PDFCHAT_CONFIG env var > ~/.pdfchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PDFCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --upload-endpoint flag > PDFCHAT_UPLOAD_ENDPOINT > config file value.
    pub fn resolve_upload_endpoint(&self, config_value: &str) -> String {
        pick(
            self.upload_endpoint.as_deref(),
            std::env::var("PDFCHAT_UPLOAD_ENDPOINT").ok(),
            config_value,
        )
    }

    /// Priority: --query-endpoint flag > PDFCHAT_QUERY_ENDPOINT > config file value.
    pub fn resolve_query_endpoint(&self, config_value: &str) -> String {
        pick(
            self.query_endpoint.as_deref(),
            std::env::var("PDFCHAT_QUERY_ENDPOINT").ok(),
            config_value,
        )
    }

    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_value: &str) -> String {
        pick(self.log_level.as_deref(), None, config_value)
    }

    /// Apply every override to a loaded configuration.
    pub fn apply(&self, config: &mut PdfChatConfig) {
        config.service.upload_endpoint = self.resolve_upload_endpoint(&config.service.upload_endpoint);
        config.service.query_endpoint = self.resolve_query_endpoint(&config.service.query_endpoint);
        config.general.log_level = self.resolve_log_level(&config.general.log_level);
    }
}

fn pick(flag: Option<&str>, env: Option<String>, config_value: &str) -> String {
    if let Some(v) = flag {
        return v.to_string();
    }
    match env {
        Some(v) if !v.trim().is_empty() => v,
        _ => config_value.to_string(),
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".pdfchat").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".pdfchat").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Anything that is not a command, submitted as the question.
    Question(String),
    /// `/new <PATH>`: start over with another document.
    NewDocument(PathBuf),
    /// `/new` without a path.
    MissingPath,
    Quit,
}

pub fn parse_input(line: &str) -> Input {
    let trimmed = line.trim();
    match trimmed {
        "/quit" | "/exit" => Input::Quit,
        "/new" => Input::MissingPath,
        _ => match trimmed.strip_prefix("/new ") {
            Some(path) if !path.trim().is_empty() => Input::NewDocument(PathBuf::from(path.trim())),
            _ => Input::Question(line.trim_end_matches(['\r', '\n']).to_string()),
        },
    }
}
