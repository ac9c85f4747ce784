//! Vector store contract and record types.
//!
//! [`VectorStore`] is the capability interface the pipeline and API depend on.
//! [`sqlite::SqliteVecStore`] implements it over SQLite + sqlite-vec; distance
//! and ranking are delegated to the engine.

pub mod sqlite;

use serde::{Deserialize, Serialize};

pub use sqlite::SqliteVecStore;

/// Free-form document metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A document ready to be written to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: Option<Metadata>,
}

/// A stored document as returned by [`VectorStore::get_all`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub content: String,
    pub metadata: Option<Metadata>,
}

/// One nearest-neighbor hit. Lower distance is closer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub content: String,
    pub metadata: Option<Metadata>,
    pub distance: f64,
}

/// Summary of a collection.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    pub metadata: Metadata,
}

/// Largest `k` a single query serves (the sqlite-vec KNN limit).
pub const MAX_QUERY_RESULTS: usize = 4096;

/// Errors from vector index operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("metadata serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("vector for {id} has {actual} dimensions, collection expects {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
    #[error("collection {name} was created with {stored} dimensions, configured {configured}")]
    CollectionDimension {
        name: String,
        stored: usize,
        configured: usize,
    },
    #[error("document id already present in collection: {0}")]
    DuplicateId(String),
    #[error("collection not found: {0}")]
    CollectionNotFound(String),
    #[error("invalid collection name: {0:?}")]
    InvalidName(String),
    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Persistent collection of `(id, vector, document, metadata)` records.
///
/// Implementations guarantee: [`query`](Self::query) returns at most `k`
/// matches in ascending distance order, and an empty collection yields an
/// empty list rather than an error.
pub trait VectorStore: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    /// Fixed vector dimensionality of the collection.
    fn dimension(&self) -> usize;

    /// Add documents in one all-or-nothing operation.
    fn add(&self, docs: &[IndexedDocument]) -> Result<(), StoreError>;

    /// Delete documents by id. Unknown ids are ignored. Returns the number removed.
    fn delete(&self, ids: &[String]) -> Result<usize, StoreError>;

    /// Every document in the collection, without vectors.
    fn get_all(&self) -> Result<Vec<StoredDocument>, StoreError>;

    /// The `min(k, N)` nearest documents to `vector`, where `k` is capped at
    /// [`MAX_QUERY_RESULTS`].
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>, StoreError>;

    fn count(&self) -> Result<usize, StoreError>;

    fn info(&self) -> Result<CollectionInfo, StoreError>;
}

/// Remove every document by reading all ids and deleting them.
///
/// Two steps, not atomic: a document added between the read and the delete
/// survives.
pub fn clear(store: &dyn VectorStore) -> Result<usize, StoreError> {
    let ids: Vec<String> = store.get_all()?.into_iter().map(|d| d.id).collect();
    if ids.is_empty() {
        return Ok(0);
    }
    store.delete(&ids)
}
