//! Integration tests for `HttpServiceClient` against a local fake service.
//!
//! Each test starts its own axum server on an ephemeral port.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use pdfchat_client::{HttpServiceClient, RemoteService, ServiceError};
use pdfchat_core::config::ServiceConfig;
use pdfchat_core::types::{DocumentHandle, SelectedFile};

// =============================================================================
// Helpers
// =============================================================================

#[derive(Debug, Clone, Default)]
struct Received {
    upload: Option<(String, Option<String>, Option<String>, Vec<u8>)>,
    query: Option<Value>,
}

type Shared = Arc<Mutex<Received>>;

async fn upload_ok(
    State(received): State<Shared>,
    mut multipart: Multipart,
) -> Result<Json<Value>, (StatusCode, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
        received.lock().unwrap().upload = Some((name, file_name, content_type, data.to_vec()));
    }
    Ok(Json(json!({ "message": "File processed", "file_id": "abc123" })))
}

async fn upload_rejected() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "could not parse PDF")
}

async fn query_ok(State(received): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    received.lock().unwrap().query = Some(body);
    Json(json!({ "reply": "It is about X." }))
}

async fn query_rejected() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "model unavailable")
}

async fn garbled() -> &'static str {
    "this is not json"
}

/// Start the fake service and return its address plus the shared request log.
async fn start_server() -> (SocketAddr, Shared) {
    let received: Shared = Arc::new(Mutex::new(Received::default()));
    let app = Router::new()
        .route("/upload", post(upload_ok))
        .route("/upload-rejected", post(upload_rejected))
        .route("/query", post(query_ok))
        .route("/query-rejected", post(query_rejected))
        .route("/garbled", post(garbled))
        .with_state(Arc::clone(&received));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, received)
}

fn client_for(addr: SocketAddr, upload: &str, query: &str, bind_document: bool) -> HttpServiceClient {
    let config = ServiceConfig {
        upload_endpoint: format!("http://{}{}", addr, upload),
        query_endpoint: format!("http://{}{}", addr, query),
        bind_document,
    };
    HttpServiceClient::new(&config).unwrap()
}

fn pdf() -> SelectedFile {
    SelectedFile::new("doc.pdf", b"%PDF-1.4 test body".to_vec())
}

// =============================================================================
// Upload
// =============================================================================

#[tokio::test]
async fn test_submit_document_returns_handle() {
    let (addr, received) = start_server().await;
    let client = client_for(addr, "/upload", "/query", true);

    let handle = client.submit_document(&pdf()).await.unwrap();
    assert_eq!(handle.as_str(), "abc123");

    let (field, file_name, content_type, data) = received.lock().unwrap().upload.clone().unwrap();
    assert_eq!(field, "file");
    assert_eq!(file_name.as_deref(), Some("doc.pdf"));
    assert_eq!(content_type.as_deref(), Some("application/pdf"));
    assert_eq!(data, b"%PDF-1.4 test body");
}

#[tokio::test]
async fn test_submit_document_non_success_carries_body() {
    let (addr, _) = start_server().await;
    let client = client_for(addr, "/upload-rejected", "/query", true);

    let err = client.submit_document(&pdf()).await.unwrap_err();
    assert_eq!(
        err,
        ServiceError::Status {
            status: 500,
            body: "could not parse PDF".to_string(),
        }
    );
    assert_eq!(err.message(), "could not parse PDF");
}

#[tokio::test]
async fn test_submit_document_garbled_body_is_decode_error() {
    let (addr, _) = start_server().await;
    let client = client_for(addr, "/garbled", "/query", true);

    let err = client.submit_document(&pdf()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)), "got {err:?}");
}

// =============================================================================
// Query
// =============================================================================

#[tokio::test]
async fn test_submit_question_sends_query_and_file_key() {
    let (addr, received) = start_server().await;
    let client = client_for(addr, "/upload", "/query", true);

    let answer = client
        .submit_question("What is this about?", &DocumentHandle::new("abc123.pdf"))
        .await
        .unwrap();
    assert_eq!(answer, "It is about X.");

    let body = received.lock().unwrap().query.clone().unwrap();
    assert_eq!(
        body,
        json!({ "query": "What is this about?", "file_key": "abc123.pdf" })
    );
}

#[tokio::test]
async fn test_submit_question_unbound_omits_file_key() {
    let (addr, received) = start_server().await;
    let client = client_for(addr, "/upload", "/query", false);

    client
        .submit_question("hello", &DocumentHandle::new("abc123.pdf"))
        .await
        .unwrap();

    let body = received.lock().unwrap().query.clone().unwrap();
    assert_eq!(body, json!({ "query": "hello" }));
}

#[tokio::test]
async fn test_submit_question_non_success_carries_body() {
    let (addr, _) = start_server().await;
    let client = client_for(addr, "/upload", "/query-rejected", true);

    let err = client
        .submit_question("anything", &DocumentHandle::new("abc123.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Status { status: 502, .. }));
    assert_eq!(err.message(), "model unavailable");
}

#[tokio::test]
async fn test_submit_question_garbled_body_is_decode_error() {
    let (addr, _) = start_server().await;
    let client = client_for(addr, "/upload", "/garbled", true);

    let err = client
        .submit_question("anything", &DocumentHandle::new("abc123.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)), "got {err:?}");
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Reserve a port, then release it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = client_for(addr, "/upload", "/query", true);
    let err = client.submit_document(&pdf()).await.unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "got {err:?}");
}
