//! Test helpers for integration tests.
//!
//! Provides a mock storage API served by axum on a random local port, and
//! helpers for building clients against it.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use folio::config::StoreConfig;
use folio::store::{HttpStore, SharedStore};

/// Token the mock server accepts when auth is required.
pub const GOOD_TOKEN: &str = "good-token";

/// One uploaded file part as received by the mock server.
#[derive(Debug, Clone)]
pub struct ReceivedPart {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// One upload request as received by the mock server.
#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub files: Vec<ReceivedPart>,
    pub folder_path: Option<String>,
    pub relative_paths: Option<String>,
}

/// Mutable state behind the mock server.
#[derive(Default)]
pub struct MockState {
    pub tree: Value,
    pub contents: HashMap<String, Vec<u8>>,
    pub failing_deletes: HashSet<String>,
    pub require_token: bool,
    pub requests: Vec<String>,
    pub folder_bodies: Vec<Value>,
    pub deleted: Vec<String>,
    pub uploads: Vec<ReceivedUpload>,
    pub processing: Vec<(String, String)>,
    pub last_query: Option<String>,
    /// `authorization` header of each raw content request.
    pub raw_auth: Vec<Option<String>>,
}

/// A running mock storage API.
pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Arc<Mutex<MockState>>,
}

impl MockServer {
    /// Start a server with an empty tree.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(MockState {
            tree: json!([]),
            ..MockState::default()
        }));

        let router = Router::new()
            .route("/api/v1/files/tree", get(list_tree))
            .route("/api/v1/files/folder", post(create_folder))
            .route("/api/v1/files/upload", post(upload))
            .route("/api/v1/files/storage", get(storage))
            .route("/api/v1/files/search", get(search))
            .route("/api/v1/files/:id", delete(delete_node))
            .route("/uploads/*path", get(raw))
            .route("/api/processing/:job", post(processing))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Failed to get local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("mock server failed");
        });

        Self { addr, state }
    }

    /// Base URL of the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Store configuration pointing at this server.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            base_url: self.base_url(),
            ..StoreConfig::default()
        }
    }

    /// HTTP client for this server.
    pub fn store(&self) -> SharedStore {
        Arc::new(HttpStore::new(&self.store_config()).expect("Failed to create client"))
    }

    /// Replace the tree served by `GET /files/tree`.
    pub async fn set_tree(&self, tree: Value) {
        self.state.lock().await.tree = tree;
    }

    /// Serve `bytes` under `/uploads/{path}`.
    pub async fn set_content(&self, path: &str, bytes: Vec<u8>) {
        self.state
            .lock()
            .await
            .contents
            .insert(path.trim_start_matches('/').to_string(), bytes);
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn authorized(state: &MockState, headers: &HeaderMap) -> bool {
    if !state.require_token {
        return true;
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bearer {GOOD_TOKEN}"))
}

async fn list_tree(State(state): State<Arc<Mutex<MockState>>>, headers: HeaderMap) -> Response {
    let mut state = state.lock().await;
    state.requests.push("GET /files/tree".to_string());
    if !authorized(&state, &headers) {
        return detail(StatusCode::UNAUTHORIZED, "Not authenticated");
    }
    Json(state.tree.clone()).into_response()
}

async fn create_folder(
    State(state): State<Arc<Mutex<MockState>>>,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock().await;
    state.requests.push("POST /files/folder".to_string());
    let duplicate = body["folder_name"] == "taken";
    state.folder_bodies.push(body);
    if duplicate {
        return detail(StatusCode::BAD_REQUEST, "Folder already exists");
    }
    Json(json!({ "message": "Folder created" })).into_response()
}

async fn delete_node(State(state): State<Arc<Mutex<MockState>>>, Path(id): Path<String>) -> Response {
    let mut state = state.lock().await;
    state.requests.push(format!("DELETE /files/{id}"));
    if state.failing_deletes.contains(&id) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete file");
    }
    state.deleted.push(id);
    Json(json!({ "message": "File deleted" })).into_response()
}

async fn upload(State(state): State<Arc<Mutex<MockState>>>, mut multipart: Multipart) -> Response {
    let mut received = ReceivedUpload::default();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                received.files.push(ReceivedPart {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "folder_path" => received.folder_path = field.text().await.ok(),
            "relative_paths" => received.relative_paths = field.text().await.ok(),
            _ => {}
        }
    }

    let mut state = state.lock().await;
    state.requests.push("POST /files/upload".to_string());
    let count = received.files.len();
    state.uploads.push(received);
    Json(json!({ "message": format!("{count} file(s) uploaded") })).into_response()
}

async fn storage(State(state): State<Arc<Mutex<MockState>>>) -> Response {
    state.lock().await.requests.push("GET /files/storage".to_string());
    Json(json!({ "total_size": 1536, "file_count": 3 })).into_response()
}

async fn search(
    State(state): State<Arc<Mutex<MockState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let mut state = state.lock().await;
    state.requests.push("GET /files/search".to_string());
    let query = params.get("q").cloned().unwrap_or_default();
    state.last_query = Some(query.clone());
    Json(json!([{
        "id": "f-1",
        "original_filename": format!("{query}.csv"),
        "file_size": 42,
        "mime_type": "text/csv",
        "folder_path": "/reports",
        "is_folder": false,
        "uploaded_at": "2024-05-01T10:00:00"
    }]))
    .into_response()
}

async fn raw(
    State(state): State<Arc<Mutex<MockState>>>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock().await;
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.raw_auth.push(auth);
    match state.contents.get(&path) {
        Some(bytes) => bytes.clone().into_response(),
        None => detail(StatusCode::NOT_FOUND, "File not found"),
    }
}

async fn processing(
    State(state): State<Arc<Mutex<MockState>>>,
    Path(job): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut file_path = String::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file_path") {
            file_path = field.text().await.unwrap_or_default();
        }
    }
    let mut state = state.lock().await;
    state.processing.push((job.clone(), file_path.clone()));
    Json(json!({ "message": format!("{job} queued for {file_path}") })).into_response()
}

/// A small tree in wire format.
pub fn sample_tree() -> Value {
    json!([
        {
            "id": "d-docs",
            "name": "docs",
            "type": "folder",
            "path": "/docs",
            "uploaded_at": "2024-05-01T10:00:00",
            "children": [
                {
                    "id": "f-report",
                    "name": "report.csv",
                    "type": "file",
                    "size": 2048,
                    "mime_type": "text/csv",
                    "path": "/docs/report.csv",
                    "uploaded_at": "2024-05-01T10:05:00.123456",
                    "folder_path": "/docs"
                },
                {
                    "id": "d-empty",
                    "name": "empty",
                    "type": "folder",
                    "path": "/docs/empty",
                    "uploaded_at": "2024-05-01T10:06:00Z",
                    "children": null
                }
            ]
        },
        {
            "id": "f-top",
            "name": "top.json",
            "type": "file",
            "size": 12,
            "path": "/top.json",
            "uploaded_at": "2024-05-02T08:00:00+02:00"
        }
    ])
}
