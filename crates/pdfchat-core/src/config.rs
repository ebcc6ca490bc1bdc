use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PdfChatError, Result};

/// Top-level configuration for pdfchat.
///
/// Loaded from `~/.pdfchat/config.toml` by default. Missing sections and
/// fields fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PdfChatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl PdfChatConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PdfChatConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| PdfChatError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Remote document service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Endpoint accepting the multipart document upload.
    pub upload_endpoint: String,
    /// Endpoint accepting JSON questions.
    pub query_endpoint: String,
    /// Send the document key along with each question. When false only
    /// `{ "query": ... }` is sent.
    pub bind_document: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upload_endpoint: "http://127.0.0.1:8000/upload".to_string(),
            query_endpoint: "http://127.0.0.1:8000/query".to_string(),
            bind_document: true,
        }
    }
}

/// Timing and presentation settings for the chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interval between simulated progress ticks, in milliseconds.
    pub progress_tick_ms: u64,
    /// Upper bound the simulated progress stays below while running.
    pub progress_cap: f64,
    /// Largest random increment per progress tick.
    pub progress_max_step: f64,
    /// Pause between a confirmed upload and switching to chat, in milliseconds.
    pub confirm_delay_ms: u64,
    /// Delay between revealed characters, in milliseconds.
    pub typewriter_delay_ms: u64,
    /// Appended to the identifier returned by the upload service.
    pub handle_suffix: String,
    /// Assistant message shown when a question fails.
    pub fallback_message: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            progress_tick_ms: 200,
            progress_cap: 90.0,
            progress_max_step: 10.0,
            confirm_delay_ms: 500,
            typewriter_delay_ms: 30,
            handle_suffix: ".pdf".to_string(),
            fallback_message: "Error getting response.".to_string(),
        }
    }
}

impl SessionConfig {
    pub fn progress_tick(&self) -> Duration {
        Duration::from_millis(self.progress_tick_ms.max(1))
    }

    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.confirm_delay_ms)
    }

    pub fn typewriter_delay(&self) -> Duration {
        Duration::from_millis(self.typewriter_delay_ms.max(1))
    }
}
