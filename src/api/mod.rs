//! HTTP retrieval API.
//!
//! Thin handlers that translate requests into [`VectorStore`] operations. All
//! collaborators arrive through [`AppState`]; blocking store and provider calls
//! run on tokio's blocking pool.

mod error;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

pub use error::ApiError;

use crate::corpus::CorpusLoader;
use crate::embedding::EmbeddingProvider;
use crate::store::VectorStore;

/// Shared handler state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn VectorStore>,
    pub provider: Arc<dyn EmbeddingProvider>,
    pub loader: Arc<dyn CorpusLoader>,
    pub snapshot_path: Arc<PathBuf>,
    pub default_n_results: usize,
    /// Serializes add/delete/clear/reload against the collection.
    pub write_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn VectorStore>,
        provider: Arc<dyn EmbeddingProvider>,
        loader: Arc<dyn CorpusLoader>,
        snapshot_path: PathBuf,
        default_n_results: usize,
    ) -> Self {
        Self {
            store,
            provider,
            loader,
            snapshot_path: Arc::new(snapshot_path),
            default_n_results: default_n_results.max(1),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query_vector", post(handlers::query_vector))
        .route("/collection/info", get(handlers::collection_info))
        .route("/collection/documents", get(handlers::collection_documents))
        .route("/collection/add", post(handlers::add_document))
        .route("/collection/delete", delete(handlers::delete_documents))
        .route("/collection/clear", delete(handlers::clear_collection))
        .route("/collection/load-dataset", post(handlers::load_dataset))
        .route("/health", get(handlers::health))
        .with_state(state)
}
