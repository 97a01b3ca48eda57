//! Preview dispatcher.
//!
//! Each selection moves the preview through `Idle -> Loading ->
//! {Rendered, Failed}`. Selecting another node cancels the in-flight fetch
//! for the previous one; a result that still arrives for an older selection
//! is dropped by the generation check in [`PreviewDispatcher::finish`].

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::classify::{classify_node, PreviewKind};
use super::render::{render_csv, render_json, CsvTable, JsonText};
use crate::config::PreviewConfig;
use crate::store::SharedStore;
use crate::tree::FileNode;
use crate::{FolioError, Result};

/// What a rendered preview shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewContent {
    /// Image loaded by the renderer from `url`.
    Image {
        /// Resolved content URL.
        url: String,
    },
    /// PDF loaded by the renderer from `url`.
    Pdf {
        /// Resolved content URL.
        url: String,
    },
    /// CSV table.
    Table(CsvTable),
    /// JSON text.
    Json(JsonText),
    /// No preview for this type.
    Unsupported,
}

/// Preview state for the current selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    /// Nothing selected.
    Idle,
    /// Content is on its way.
    ///
    /// For images and PDFs `url` is set and the renderer reports back
    /// through [`PreviewDispatcher::renderer_event`].
    Loading {
        /// Node being previewed.
        node_id: String,
        /// Preview type.
        kind: PreviewKind,
        /// URL handed to the renderer, direct kinds only.
        url: Option<String>,
    },
    /// Preview ready.
    Rendered {
        /// Node being previewed.
        node_id: String,
        /// Content to show.
        content: PreviewContent,
    },
    /// Preview failed.
    Failed {
        /// Node being previewed.
        node_id: String,
        /// Message to show.
        message: String,
    },
}

impl PreviewState {
    /// Node the state belongs to.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            PreviewState::Idle => None,
            PreviewState::Loading { node_id, .. }
            | PreviewState::Rendered { node_id, .. }
            | PreviewState::Failed { node_id, .. } => Some(node_id),
        }
    }
}

/// Load or error event from an image or PDF renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererEvent {
    /// The renderer displayed the content.
    Loaded,
    /// The renderer could not load the content.
    Error,
}

fn failure_message(kind: PreviewKind) -> String {
    let label = match kind {
        PreviewKind::Image => "image",
        PreviewKind::Pdf => "PDF",
        PreviewKind::Csv => "CSV",
        PreviewKind::Json => "JSON",
        PreviewKind::Unsupported => "file",
    };
    format!("Failed to load {label} preview")
}

struct Current {
    generation: u64,
    token: CancellationToken,
}

/// Drives previews for the selected node.
pub struct PreviewDispatcher {
    store: SharedStore,
    config: PreviewConfig,
    current: Mutex<Current>,
    state: watch::Sender<PreviewState>,
}

impl PreviewDispatcher {
    /// Create a dispatcher in the `Idle` state.
    pub fn new(store: SharedStore, config: PreviewConfig) -> Arc<Self> {
        let (state, _) = watch::channel(PreviewState::Idle);
        Arc::new(Self {
            store,
            config,
            current: Mutex::new(Current {
                generation: 0,
                token: CancellationToken::new(),
            }),
            state,
        })
    }

    /// Current state.
    pub fn state(&self) -> PreviewState {
        self.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.state.subscribe()
    }

    /// Cancel the in-flight fetch and start a new generation.
    fn advance(&self) -> (u64, CancellationToken) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        current.token.cancel();
        current.generation += 1;
        current.token = CancellationToken::new();
        (current.generation, current.token.clone())
    }

    /// Preview `node`.
    ///
    /// Returns the fetch task for CSV and JSON files, `None` for kinds that
    /// need no fetch.
    pub fn select(self: &Arc<Self>, node: &FileNode) -> Option<JoinHandle<()>> {
        let (generation, token) = self.advance();
        let kind = classify_node(node);
        debug!(id = %node.id, %kind, generation, "preview selected");

        if !kind.needs_fetch() {
            let next = if kind.is_direct() {
                PreviewState::Loading {
                    node_id: node.id.clone(),
                    kind,
                    url: Some(self.store.resolve_url(&node.path)),
                }
            } else {
                PreviewState::Rendered {
                    node_id: node.id.clone(),
                    content: PreviewContent::Unsupported,
                }
            };
            self.state.send_replace(next);
            return None;
        }

        self.state.send_replace(PreviewState::Loading {
            node_id: node.id.clone(),
            kind,
            url: None,
        });

        let this = Arc::clone(self);
        let node_id = node.id.clone();
        let path = node.path.clone();
        Some(tokio::spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(FolioError::Cancelled),
                fetched = this.store.fetch_raw(&path) => fetched,
            };
            this.finish(generation, node_id, kind, result);
        }))
    }

    /// Return to `Idle`, cancelling any fetch.
    pub fn clear(&self) {
        self.advance();
        self.state.send_replace(PreviewState::Idle);
    }

    /// Apply a fetch result if it still belongs to the current selection.
    fn finish(&self, generation: u64, node_id: String, kind: PreviewKind, result: Result<Vec<u8>>) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if current.generation != generation {
            debug!(%node_id, generation, "discarding stale preview result");
            return;
        }
        let next = match result {
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                warn!(%node_id, "preview fetch failed: {}", e);
                PreviewState::Failed {
                    node_id,
                    message: failure_message(kind),
                }
            }
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                let content = match kind {
                    PreviewKind::Csv => PreviewContent::Table(render_csv(&text, self.config.csv_max_rows)),
                    _ => PreviewContent::Json(render_json(&text, self.config.json_max_chars)),
                };
                PreviewState::Rendered { node_id, content }
            }
        };
        self.state.send_replace(next);
    }

    /// Report an image or PDF renderer's outcome for `node_id`.
    ///
    /// Ignored unless that node is currently loading through a renderer.
    pub fn renderer_event(&self, node_id: &str, event: RendererEvent) {
        let _current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let next = match &*self.state.borrow() {
            PreviewState::Loading {
                node_id: loading,
                kind,
                url: Some(url),
            } if loading == node_id => match (event, kind) {
                (RendererEvent::Loaded, PreviewKind::Pdf) => PreviewState::Rendered {
                    node_id: node_id.to_string(),
                    content: PreviewContent::Pdf { url: url.clone() },
                },
                (RendererEvent::Loaded, _) => PreviewState::Rendered {
                    node_id: node_id.to_string(),
                    content: PreviewContent::Image { url: url.clone() },
                },
                (RendererEvent::Error, kind) => PreviewState::Failed {
                    node_id: node_id.to_string(),
                    message: failure_message(*kind),
                },
            },
            _ => {
                debug!(node_id, ?event, "renderer event for inactive preview");
                return;
            }
        };
        self.state.send_replace(next);
    }
}
