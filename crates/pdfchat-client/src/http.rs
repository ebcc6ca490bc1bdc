//! HTTP implementation of [`RemoteService`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, Response, Url};
use serde::{Deserialize, Serialize};

use pdfchat_core::config::ServiceConfig;
use pdfchat_core::types::{DocumentHandle, SelectedFile};

use crate::error::{Operation, ServiceError};
use crate::RemoteService;

/// The User-Agent sent with every request.
const USER_AGENT: &str = concat!("pdfchat/", env!("CARGO_PKG_VERSION"));

/// Multipart field carrying the document.
const UPLOAD_FIELD: &str = "file";

const PDF_MIME: &str = "application/pdf";

/// Client for the remote upload and query endpoints.
#[derive(Debug, Clone)]
pub struct HttpServiceClient {
    upload_url: Url,
    query_url: Url,
    bind_document: bool,
    client: HttpClient,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file_id: FileId,
}

/// Some backends hand out numeric identifiers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FileId {
    Text(String),
    Number(i64),
}

impl FileId {
    fn into_handle(self) -> DocumentHandle {
        match self {
            FileId::Text(id) => DocumentHandle::new(id),
            FileId::Number(id) => DocumentHandle::new(id.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    reply: String,
}

impl HttpServiceClient {
    /// Build a client for the configured endpoints.
    ///
    /// Both endpoint URLs are validated here so a bad configuration fails at
    /// startup rather than on first use.
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let client = HttpClient::builder().user_agent(USER_AGENT).build()?;
        Self::with_client(config, client)
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(config: &ServiceConfig, client: HttpClient) -> Result<Self, ServiceError> {
        Ok(Self {
            upload_url: parse_endpoint(&config.upload_endpoint)?,
            query_url: parse_endpoint(&config.query_endpoint)?,
            bind_document: config.bind_document,
            client,
        })
    }

    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

#[async_trait]
impl RemoteService for HttpServiceClient {
    async fn submit_document(&self, file: &SelectedFile) -> Result<DocumentHandle, ServiceError> {
        tracing::debug!(
            endpoint = %self.upload_url,
            file = %file.name(),
            bytes = file.size(),
            "Submitting document"
        );

        let part = Part::bytes(file.content().to_vec())
            .file_name(file.name().to_string())
            .mime_str(PDF_MIME)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let res = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .await
            .inspect_err(|e| log_transport_failure(Operation::Upload, &self.upload_url, e))?;

        if res.status().is_success() {
            let body: UploadResponse = res.json().await?;
            let handle = body.file_id.into_handle();
            tracing::debug!(handle = %handle, "Document accepted");
            Ok(handle)
        } else {
            Err(status_error(Operation::Upload, res).await)
        }
    }

    async fn submit_question(
        &self,
        question: &str,
        handle: &DocumentHandle,
    ) -> Result<String, ServiceError> {
        tracing::debug!(
            endpoint = %self.query_url,
            handle = %handle,
            question_len = question.len(),
            "Submitting question"
        );

        let payload = QueryRequest {
            query: question,
            file_key: self.bind_document.then_some(handle.as_str()),
        };

        let res = self
            .client
            .post(self.query_url.clone())
            .json(&payload)
            .send()
            .await
            .inspect_err(|e| log_transport_failure(Operation::Query, &self.query_url, e))?;

        if res.status().is_success() {
            let body: QueryResponse = res.json().await?;
            Ok(body.reply)
        } else {
            Err(status_error(Operation::Query, res).await)
        }
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Url, ServiceError> {
    Url::parse(endpoint).map_err(|e| ServiceError::InvalidEndpoint(format!("{endpoint}: {e}")))
}

/// Convert a non-success response into an error carrying its body text.
async fn status_error(operation: Operation, res: Response) -> ServiceError {
    let status = res.status().as_u16();
    let body = res.text().await.unwrap_or_default();
    tracing::warn!(%operation, status, body = %body, "Remote service rejected request");
    ServiceError::Status { status, body }
}

fn log_transport_failure(operation: Operation, endpoint: &Url, err: &reqwest::Error) {
    tracing::warn!(%operation, endpoint = %endpoint, error = %err, "Request failed");
}
