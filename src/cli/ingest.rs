//! CLI `ingest` command: load, embed, and reload the collection.

use anyhow::{Context, Result};

use ragstore::config::RagConfig;
use ragstore::corpus::ParquetCorpus;
use ragstore::embedding;
use ragstore::ingest::Indexer;

/// Run the ingestion pipeline once and print the report.
pub fn ingest(config: &RagConfig, force: bool) -> Result<()> {
    let store = super::open_store(config)?;
    let provider = embedding::create_provider(&config.embedding)
        .context("failed to create embedding provider")?;
    let loader = ParquetCorpus::from_config(config).with_progress(true);
    let snapshot_path = config.snapshot_path();

    println!(
        "Ingesting into collection '{}' with model '{}'{}...",
        config.storage.collection,
        config.embedding.model,
        if force { " (forcing re-embed)" } else { "" }
    );

    let report = Indexer::new(&loader, provider.as_ref(), &store, &snapshot_path)
        .run(force)
        .context("ingestion failed")?;

    println!("Documents added:     {}", report.documents_added);
    println!("Removed beforehand:  {}", report.deleted);
    if report.reused_snapshot {
        println!("Embeddings reused:   {} (from {})", report.skipped, snapshot_path.display());
    }
    println!("Embedding failures:  {}", report.failures.len());
    for failure in report.failures.iter().take(10) {
        println!("  {}: {}", failure.id, failure.error);
    }
    if report.failures.len() > 10 {
        println!("  ... and {} more", report.failures.len() - 10);
    }
    Ok(())
}
