use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::ingest::{EmbeddingFailure, Indexer};
use crate::store::{self, IndexedDocument, Metadata, QueryMatch, MAX_QUERY_RESULTS};

#[derive(Debug, Deserialize)]
pub struct VectorQueryRequest {
    pub vector: Vec<f32>,
    pub n_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct VectorQueryResponse {
    pub matches: Vec<QueryMatch>,
}

#[derive(Debug, Serialize)]
pub struct DocumentView {
    pub id: String,
    pub content: String,
    pub metadata: Metadata,
}

#[derive(Debug, Serialize)]
pub struct DocumentsResponse {
    pub documents: Vec<DocumentView>,
}

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub content: String,
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Serialize)]
pub struct AddDocumentResponse {
    pub success: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentsRequest {
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteDocumentsResponse {
    pub success: bool,
    pub deleted_count: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub collection_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_count: Option<usize>,
    pub provider_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoadDatasetParams {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct LoadDatasetResponse {
    pub success: bool,
    pub message: String,
    pub documents_added: usize,
    pub dataset_shape: [usize; 2],
    pub skipped: usize,
    pub failures: Vec<EmbeddingFailure>,
}

/// Prefix for ids of individually added documents; ingested passages use
/// `passage-<row>`, so the two can never collide.
const ADDED_ID_PREFIX: &str = "doc-";

pub async fn query_vector(
    State(state): State<AppState>,
    payload: Result<Json<VectorQueryRequest>, JsonRejection>,
) -> Result<Json<VectorQueryResponse>, ApiError> {
    let Json(req) = payload?;
    let dimension = state.store.dimension();
    if req.vector.len() != dimension {
        return Err(ApiError::Validation(format!(
            "query vector has {} dimensions, collection {} expects {dimension}",
            req.vector.len(),
            state.store.name()
        )));
    }
    let k = req.n_results.unwrap_or(state.default_n_results);
    if k == 0 || k > MAX_QUERY_RESULTS {
        return Err(ApiError::Validation(format!(
            "n_results must be between 1 and {MAX_QUERY_RESULTS}"
        )));
    }

    let store = Arc::clone(&state.store);
    let matches =
        tokio::task::spawn_blocking(move || store.query(&req.vector, k)).await??;
    tracing::debug!(k, returned = matches.len(), "vector query served");

    Ok(Json(VectorQueryResponse { matches }))
}

pub async fn collection_info(
    State(state): State<AppState>,
) -> Result<Json<store::CollectionInfo>, ApiError> {
    let store = Arc::clone(&state.store);
    let info = tokio::task::spawn_blocking(move || store.info()).await??;
    Ok(Json(info))
}

pub async fn collection_documents(
    State(state): State<AppState>,
) -> Result<Json<DocumentsResponse>, ApiError> {
    let store = Arc::clone(&state.store);
    let docs = tokio::task::spawn_blocking(move || store.get_all()).await??;
    let documents = docs
        .into_iter()
        .map(|d| DocumentView {
            id: d.id,
            content: d.content,
            metadata: d.metadata.unwrap_or_default(),
        })
        .collect();
    Ok(Json(DocumentsResponse { documents }))
}

pub async fn add_document(
    State(state): State<AppState>,
    payload: Result<Json<AddDocumentRequest>, JsonRejection>,
) -> Result<Json<AddDocumentResponse>, ApiError> {
    let Json(req) = payload?;
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("content must not be empty".into()));
    }

    let _guard = state.write_lock.lock().await;

    let provider = Arc::clone(&state.provider);
    let content = req.content.clone();
    let embedding = tokio::task::spawn_blocking(move || provider.embed(&content)).await??;

    let id = format!("{ADDED_ID_PREFIX}{}", uuid::Uuid::now_v7());
    let doc = IndexedDocument {
        id: id.clone(),
        text: req.content,
        embedding,
        metadata: Some(req.metadata.unwrap_or_default()),
    };
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || store.add(std::slice::from_ref(&doc))).await??;

    tracing::info!(id = %id, "document added");
    Ok(Json(AddDocumentResponse { success: true, id }))
}

pub async fn delete_documents(
    State(state): State<AppState>,
    payload: Result<Json<DeleteDocumentsRequest>, JsonRejection>,
) -> Result<Json<DeleteDocumentsResponse>, ApiError> {
    let Json(req) = payload?;
    let _guard = state.write_lock.lock().await;

    let store = Arc::clone(&state.store);
    let requested = req.ids.len();
    let deleted_count = tokio::task::spawn_blocking(move || store.delete(&req.ids)).await??;

    tracing::info!(requested, deleted_count, "documents deleted");
    Ok(Json(DeleteDocumentsResponse {
        success: true,
        deleted_count,
    }))
}

pub async fn clear_collection(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let _guard = state.write_lock.lock().await;

    let collection = Arc::clone(&state.store);
    let deleted_count =
        tokio::task::spawn_blocking(move || store::clear(collection.as_ref())).await??;

    tracing::info!(deleted_count, "collection cleared");
    Ok(Json(ClearResponse {
        success: true,
        message: format!("Collection cleared successfully. Deleted {deleted_count} documents."),
        deleted_count,
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store = Arc::clone(&state.store);
    let provider = Arc::clone(&state.provider);
    let checked = tokio::task::spawn_blocking(move || (store.count(), provider.is_available())).await;

    let collection_name = state.store.name().to_string();
    match checked {
        Ok((Ok(count), provider_available)) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy",
                collection_name,
                document_count: Some(count),
                provider_available,
                error: None,
            }),
        ),
        Ok((Err(e), provider_available)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                collection_name,
                document_count: None,
                provider_available,
                error: Some(e.to_string()),
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unhealthy",
                collection_name,
                document_count: None,
                provider_available: false,
                error: Some(format!("health check task failed: {e}")),
            }),
        ),
    }
}

pub async fn load_dataset(
    State(state): State<AppState>,
    Query(params): Query<LoadDatasetParams>,
) -> Result<Json<LoadDatasetResponse>, ApiError> {
    let force = params.force;
    let _guard = state.write_lock.lock().await;

    tracing::info!(force, "dataset reload requested");
    let worker = state.clone();
    let report = tokio::task::spawn_blocking(move || {
        Indexer::new(
            worker.loader.as_ref(),
            worker.provider.as_ref(),
            worker.store.as_ref(),
            worker.snapshot_path.as_path(),
        )
        .run(force)
    })
    .await??;

    Ok(Json(LoadDatasetResponse {
        success: true,
        message: format!(
            "Dataset loaded successfully! Added {} documents to the collection.",
            report.documents_added
        ),
        documents_added: report.documents_added,
        dataset_shape: report.dataset_shape,
        skipped: report.skipped,
        failures: report.failures,
    }))
}
