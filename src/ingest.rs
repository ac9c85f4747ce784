//! Ingestion pipeline: corpus → embeddings → collection.
//!
//! [`Indexer::run`] loads passages, takes embeddings from the processed
//! snapshot when one exists (or computes them one passage at a time), then
//! clears the collection and bulk-adds every document. A provider failure on
//! one passage degrades only that document: it is stored with a zero vector
//! and listed in [`IngestionReport::failures`]. Corpus, snapshot, and store
//! failures abort the run.

use std::path::Path;

use serde::Serialize;

use crate::corpus::snapshot::{self, Snapshot, SnapshotEntry, SnapshotError};
use crate::corpus::{CorpusError, CorpusLoader, Passage};
use crate::embedding::{EmbeddingProvider, ProviderError};
use crate::store::{self, IndexedDocument, Metadata, StoreError, VectorStore};

/// Progress is logged every this many passages.
pub const PROGRESS_EVERY: usize = 100;

/// Columns of an embedded passage: id, text, embedding.
const SNAPSHOT_COLUMNS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Corpus(#[from] CorpusError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A passage whose embedding call failed.
#[derive(Debug, Clone, Serialize)]
pub struct EmbeddingFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    /// Documents written to the collection, fallbacks included.
    pub documents_added: usize,
    /// Documents whose embedding was taken from the snapshot instead of recomputed.
    pub skipped: usize,
    pub failures: Vec<EmbeddingFailure>,
    /// Documents removed from the collection before the reload.
    pub deleted: usize,
    pub reused_snapshot: bool,
    /// `[rows, columns]` of the embedded passage table.
    pub dataset_shape: [usize; 2],
}

/// Orchestrates one ingestion run over injected collaborators.
pub struct Indexer<'a> {
    loader: &'a dyn CorpusLoader,
    provider: &'a dyn EmbeddingProvider,
    store: &'a dyn VectorStore,
    snapshot_path: &'a Path,
}

impl<'a> Indexer<'a> {
    pub fn new(
        loader: &'a dyn CorpusLoader,
        provider: &'a dyn EmbeddingProvider,
        store: &'a dyn VectorStore,
        snapshot_path: &'a Path,
    ) -> Self {
        Self {
            loader,
            provider,
            store,
            snapshot_path,
        }
    }

    pub fn run(&self, force_recompute: bool) -> Result<IngestionReport, IngestError> {
        let dimension = self.store.dimension();
        let passages = self.loader.load()?;

        let existing = if force_recompute {
            None
        } else {
            snapshot::load(self.snapshot_path)?
        };

        let (entries, failures, reused_snapshot) = match existing {
            Some(snap) => {
                snap.validate(dimension)?;
                if snap.model != self.provider.model() {
                    tracing::warn!(
                        snapshot_model = %snap.model,
                        provider_model = %self.provider.model(),
                        "snapshot was built with a different model, reload with force to re-embed"
                    );
                }
                tracing::info!(
                    entries = snap.entries.len(),
                    model = %snap.model,
                    "loading embeddings from processed snapshot"
                );
                (snap.entries, Vec::new(), true)
            }
            None => {
                tracing::info!(passages = passages.len(), force_recompute, "generating embeddings");
                let (entries, failures) = self.embed_all(&passages, dimension);
                snapshot::save(
                    self.snapshot_path,
                    &Snapshot::new(self.provider.model(), dimension, entries.clone()),
                )?;
                (entries, failures, false)
            }
        };

        let deleted = store::clear(self.store)?;
        if deleted > 0 {
            tracing::info!(deleted, collection = %self.store.name(), "cleared existing documents");
        }

        let docs: Vec<IndexedDocument> = entries.into_iter().enumerate().map(to_document).collect();
        self.store.add(&docs)?;

        let report = IngestionReport {
            documents_added: docs.len(),
            skipped: if reused_snapshot { docs.len() } else { 0 },
            failures,
            deleted,
            reused_snapshot,
            dataset_shape: [docs.len(), SNAPSHOT_COLUMNS],
        };
        tracing::info!(
            documents_added = report.documents_added,
            skipped = report.skipped,
            failures = report.failures.len(),
            collection = %self.store.name(),
            "ingestion complete"
        );
        Ok(report)
    }

    /// Embed every passage in order, substituting the zero vector on failure.
    fn embed_all(
        &self,
        passages: &[Passage],
        dimension: usize,
    ) -> (Vec<SnapshotEntry>, Vec<EmbeddingFailure>) {
        let total = passages.len();
        let mut entries = Vec::with_capacity(total);
        let mut failures = Vec::new();

        for (i, passage) in passages.iter().enumerate() {
            let outcome: Result<Vec<f32>, ProviderError> = self.provider.embed(&passage.text);
            let (embedding, fallback) = match outcome {
                Ok(embedding) => (embedding, false),
                Err(e) => {
                    tracing::warn!(id = %passage.id, error = %e, "embedding failed, using zero vector");
                    failures.push(EmbeddingFailure {
                        id: passage.id.clone(),
                        error: e.to_string(),
                    });
                    (vec![0.0; dimension], true)
                }
            };
            entries.push(SnapshotEntry {
                id: passage.id.clone(),
                text: passage.text.clone(),
                embedding,
                fallback,
            });

            if (i + 1) % PROGRESS_EVERY == 0 {
                tracing::info!(processed = i + 1, total, "embedding progress");
            }
        }

        (entries, failures)
    }
}

fn to_document((row, entry): (usize, SnapshotEntry)) -> IndexedDocument {
    let mut metadata = Metadata::new();
    metadata.insert("row".into(), row.into());
    if entry.fallback {
        metadata.insert("embedding_fallback".into(), true.into());
    }
    IndexedDocument {
        id: entry.id,
        text: entry.text,
        embedding: entry.embedding,
        metadata: Some(metadata),
    }
}
