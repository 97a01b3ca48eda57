//! HTTP client for the storage API.

use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::io::ReaderStream;
use tracing::debug;
use url::{Origin, Url};

use super::types::{
    FileRecord, ProgressFn, ProgressTracker, StorageUsage, UploadBatch, UploadSource,
};
use super::RemoteStore;
use crate::config::StoreConfig;
use crate::processing::ProcessingAction;
use crate::tree::FileNode;
use crate::{FolioError, Result};

/// Upload chunk size. Progress is reported once per chunk.
const CHUNK_SIZE: usize = 64 * 1024;

/// Client for the storage API over HTTP.
pub struct HttpStore {
    client: Client,
    base_url: String,
    origin: Option<Origin>,
    api_base: String,
    uploads_prefix: String,
    access_token: Option<String>,
}

impl HttpStore {
    /// Create a client from configuration.
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FolioError::Config(format!("failed to create HTTP client: {e}")))?;

        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            api_base: format!("{}{}", base_url, route_prefix(&config.api_prefix)),
            uploads_prefix: route_prefix(&config.uploads_prefix),
            origin: Url::parse(&base_url).ok().map(|u| u.origin()),
            base_url,
            access_token: config.access_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn api_url(&self, route: &str) -> String {
        format!("{}{}", self.api_base, route)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Whether `url` points at the configured store, by scheme, host and port.
    fn is_own_origin(&self, url: &str) -> bool {
        match (&self.origin, Url::parse(url)) {
            (Some(origin), Ok(target)) => target.origin() == *origin,
            _ => false,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.dispatch(self.authorize(request)).await
    }

    async fn dispatch(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| FolioError::Network(e.to_string()))?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| FolioError::Json(format!("unexpected response body: {e}")))
    }
}

/// Normalize a configured route prefix to `/segment` form; empty stays empty.
fn route_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Map a non-success response to an error carrying the store's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(FolioError::Unauthorized);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_detail(&body).unwrap_or_else(|| format!("HTTP error: {status}"));
    Err(FolioError::store(Some(status.as_u16()), message))
}

/// Extract `detail` from an error body.
///
/// The detail is either a plain string or a list of validation errors with
/// `msg` fields.
fn error_detail(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        detail: Value,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Array(items) => {
            let msgs: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            (!msgs.is_empty()).then(|| msgs.join("; "))
        }
        Value::Null | Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RemoteStore for HttpStore {
    async fn list_tree(&self) -> Result<Vec<FileNode>> {
        debug!("GET /files/tree");
        self.send_json(self.client.get(self.api_url("/files/tree")))
            .await
    }

    async fn create_folder(&self, name: &str, parent_path: &str) -> Result<()> {
        debug!(name, parent_path, "POST /files/folder");
        let body = json!({ "folder_name": name, "parent_path": parent_path });
        self.send(self.client.post(self.api_url("/files/folder")).json(&body))
            .await?;
        Ok(())
    }

    async fn delete_node(&self, id: &str) -> Result<()> {
        debug!(id, "DELETE /files/{{id}}");
        let url = self.api_url(&format!("/files/{}", urlencoding::encode(id)));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn upload_batch(&self, batch: UploadBatch, progress: ProgressFn) -> Result<()> {
        let tracker = ProgressTracker::new(batch.total_bytes(), progress);
        let relative_paths = serde_json::to_string(&batch.relative_paths())?;
        debug!(
            files = batch.files.len(),
            bytes = batch.total_bytes(),
            destination = %batch.destination,
            "POST /files/upload"
        );

        let mut form = Form::new();
        for file in batch.files {
            let ticker = tracker.clone();
            let body = match file.source {
                UploadSource::Path(path) => {
                    let handle = tokio::fs::File::open(&path).await?;
                    Body::wrap_stream(
                        ReaderStream::with_capacity(handle, CHUNK_SIZE)
                            .inspect_ok(move |chunk| ticker.advance(chunk.len() as u64)),
                    )
                }
                UploadSource::Bytes(content) => {
                    let chunks: Vec<Vec<u8>> =
                        content.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
                    Body::wrap_stream(
                        futures::stream::iter(chunks.into_iter().map(Ok::<_, std::io::Error>))
                            .inspect_ok(move |chunk| ticker.advance(chunk.len() as u64)),
                    )
                }
            };

            let part = Part::stream_with_length(body, file.size)
                .file_name(file.name.clone())
                .mime_str(&file.mime_type)
                .map_err(|e| {
                    FolioError::Validation(format!("invalid content type for {}: {e}", file.name))
                })?;
            form = form.part("files", part);
        }
        form = form
            .text("folder_path", batch.destination)
            .text("relative_paths", relative_paths);

        self.send(self.client.post(self.api_url("/files/upload")).multipart(form))
            .await?;
        Ok(())
    }

    async fn fetch_raw(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.resolve_url(path);
        debug!(%url, "GET raw content");
        let request = self.client.get(&url);
        // Credentials only go to the store itself.
        let request = if self.is_own_origin(&url) {
            self.authorize(request)
        } else {
            request
        };
        let response = self.dispatch(request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| FolioError::Network(format!("failed to read response: {e}")))?;
        Ok(bytes.to_vec())
    }

    fn resolve_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if !self.uploads_prefix.is_empty() && path.starts_with(&format!("{}/", self.uploads_prefix)) {
            return format!("{}{}", self.base_url, path);
        }
        format!(
            "{}{}/{}",
            self.base_url,
            self.uploads_prefix,
            path.trim_start_matches('/')
        )
    }

    async fn storage_usage(&self) -> Result<StorageUsage> {
        debug!("GET /files/storage");
        self.send_json(self.client.get(self.api_url("/files/storage")))
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<FileRecord>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FolioError::Validation("search query is empty".to_string()));
        }
        let url = self.api_url(&format!("/files/search?q={}", urlencoding::encode(query)));
        self.send_json(self.client.get(url)).await
    }

    async fn run_processing(&self, file_path: &str, action: ProcessingAction) -> Result<String> {
        #[derive(Deserialize)]
        struct ProcessingReply {
            #[serde(default)]
            message: Option<String>,
        }

        let url = format!("{}{}", self.base_url, action.endpoint());
        debug!(%url, file_path, "POST processing job");
        let form = Form::new().text("file_path", file_path.to_string());
        let reply: ProcessingReply = self.send_json(self.client.post(url).multipart(form)).await?;
        Ok(reply.message.unwrap_or_default())
    }
}
