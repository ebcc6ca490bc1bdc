//! pdfchat remote service client.
//!
//! Provides the `RemoteService` trait for the two remote operations (submit a
//! document, ask a question about it), an HTTP implementation, and a scripted
//! `MockService` for tests.

pub mod error;
pub mod http;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use pdfchat_core::types::{DocumentHandle, SelectedFile};

pub use error::{Operation, ServiceError};
pub use http::HttpServiceClient;

/// The remote document question-answering service.
///
/// Both calls make a single attempt and report every failure through the
/// returned `Result`.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Upload a document and return the identifier the service assigned to it.
    async fn submit_document(&self, file: &SelectedFile) -> Result<DocumentHandle, ServiceError>;

    /// Ask a question about a previously uploaded document.
    async fn submit_question(
        &self,
        question: &str,
        handle: &DocumentHandle,
    ) -> Result<String, ServiceError>;
}

/// Scripted service for testing.
///
/// Outcomes are queued per operation and consumed in order; when a queue is
/// empty a default success is returned. An optional latency is applied to
/// every call.
#[derive(Debug, Default)]
pub struct MockService {
    uploads: Mutex<VecDeque<Result<DocumentHandle, ServiceError>>>,
    answers: Mutex<VecDeque<Result<String, ServiceError>>>,
    questions: Mutex<Vec<(String, DocumentHandle)>>,
    upload_calls: AtomicUsize,
    query_calls: AtomicUsize,
    latency: Option<Duration>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency`.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Queue the outcome of the next unscripted upload.
    pub fn push_upload(&self, outcome: Result<DocumentHandle, ServiceError>) {
        lock(&self.uploads).push_back(outcome);
    }

    /// Queue the outcome of the next unscripted question.
    pub fn push_answer(&self, outcome: Result<String, ServiceError>) {
        lock(&self.answers).push_back(outcome);
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    /// Every question received so far, with the handle it was bound to.
    pub fn questions(&self) -> Vec<(String, DocumentHandle)> {
        lock(&self.questions).clone()
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl RemoteService for MockService {
    async fn submit_document(&self, _file: &SelectedFile) -> Result<DocumentHandle, ServiceError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        lock(&self.uploads)
            .pop_front()
            .unwrap_or_else(|| Ok(DocumentHandle::new("mock-file")))
    }

    async fn submit_question(
        &self,
        question: &str,
        handle: &DocumentHandle,
    ) -> Result<String, ServiceError> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.questions).push((question.to_string(), handle.clone()));
        self.delay().await;
        lock(&self.answers)
            .pop_front()
            .unwrap_or_else(|| Ok("Mock answer".to_string()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
