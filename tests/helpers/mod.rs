#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use parquet::data_type::{ByteArray, ByteArrayType};
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::parser::parse_message_type;
use ragstore::api::{self, AppState};
use ragstore::corpus::{CorpusError, CorpusLoader, Passage};
use ragstore::db;
use ragstore::embedding::{EmbeddingProvider, ProviderError};
use ragstore::store::SqliteVecStore;

pub const TEST_DIM: usize = 4;

/// Fresh in-memory collection named `chunks` with `dim` dimensions.
pub fn test_store(dim: usize) -> SqliteVecStore {
    let conn = db::open_memory_database().unwrap();
    SqliteVecStore::open_or_create(Arc::new(Mutex::new(conn)), "chunks", dim, "test-model").unwrap()
}

/// Deterministic embedding with a spike at `seed % dim`.
pub fn spike(seed: usize, dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; dim];
    v[seed % dim] = 1.0;
    v
}

/// Provider that embeds by text length and counts every call.
///
/// Texts listed in `failing` return a network error instead.
pub struct FakeProvider {
    pub dim: usize,
    pub calls: AtomicUsize,
    pub failing: Vec<String>,
}

impl FakeProvider {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            calls: AtomicUsize::new(0),
            failing: Vec::new(),
        }
    }

    pub fn failing_on(dim: usize, texts: &[&str]) -> Self {
        Self {
            failing: texts.iter().map(|t| t.to_string()).collect(),
            ..Self::new(dim)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EmbeddingProvider for FakeProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|t| t == text) {
            return Err(ProviderError::Network("connection refused".into()));
        }
        Ok(spike(text.len(), self.dim))
    }

    fn dimensions(&self) -> usize {
        self.dim
    }

    fn model(&self) -> &str {
        "fake-embed"
    }
}

/// Loader returning a fixed list of passages with positional ids.
pub struct FixedCorpus {
    pub texts: Vec<String>,
}

impl FixedCorpus {
    pub fn new(texts: &[&str]) -> Self {
        Self {
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl CorpusLoader for FixedCorpus {
    fn load(&self) -> Result<Vec<Passage>, CorpusError> {
        Ok(self
            .texts
            .iter()
            .enumerate()
            .map(|(row, text)| Passage {
                id: Passage::id_for_row(row),
                text: text.clone(),
            })
            .collect())
    }
}

/// Write a single-column Parquet file whose column is named `column`.
pub fn write_parquet(path: &Path, column: &str, texts: &[&str]) {
    let message = format!("message schema {{ REQUIRED BYTE_ARRAY {column} (UTF8); }}");
    let schema = Arc::new(parse_message_type(&message).unwrap());
    let props = Arc::new(WriterProperties::builder().build());
    let file = File::create(path).unwrap();
    let mut writer = SerializedFileWriter::new(file, schema, props).unwrap();
    let mut row_group = writer.next_row_group().unwrap();
    if let Some(mut col) = row_group.next_column().unwrap() {
        let values: Vec<ByteArray> = texts.iter().map(|t| ByteArray::from(*t)).collect();
        col.typed::<ByteArrayType>()
            .write_batch(&values, None, None)
            .unwrap();
        col.close().unwrap();
    }
    row_group.close().unwrap();
    writer.close().unwrap();
}

/// Serve `router` on an ephemeral port from a leaked runtime and return its base URL.
///
/// Tests stay on plain threads so they can use blocking clients.
pub fn spawn_router(router: axum::Router) -> String {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let listener = rt
        .block_on(tokio::net::TcpListener::bind("127.0.0.1:0"))
        .unwrap();
    let addr = listener.local_addr().unwrap();
    rt.spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    std::mem::forget(rt);
    format!("http://{addr}")
}

/// Serve the retrieval API over `state`.
pub fn spawn_api(state: AppState) -> String {
    spawn_router(api::router(state))
}
