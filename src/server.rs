//! HTTP server initialization.
//!
//! [`build_state`] wires the database, collection, embedding provider, and
//! corpus loader into an [`AppState`]; [`serve`] runs the axum router until
//! ctrl-c.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use crate::api::{self, AppState};
use crate::config::RagConfig;
use crate::corpus::ParquetCorpus;
use crate::db;
use crate::embedding;
use crate::store::SqliteVecStore;

/// Open the database and collection and create the provider.
///
/// The provider uses a blocking HTTP client, so call this before entering the
/// async runtime.
pub fn build_state(config: &RagConfig) -> Result<AppState> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    let conn = Arc::new(Mutex::new(conn));

    let store = SqliteVecStore::open_or_create(
        conn,
        &config.storage.collection,
        config.embedding.dimensions,
        &config.embedding.model,
    )
    .with_context(|| format!("failed to open collection {}", config.storage.collection))?;
    tracing::info!(db = %db_path.display(), collection = %config.storage.collection, "vector store ready");

    let provider: Arc<dyn embedding::EmbeddingProvider> =
        Arc::from(embedding::create_provider(&config.embedding)?);
    let loader = Arc::new(ParquetCorpus::from_config(config));

    Ok(AppState::new(
        Arc::new(store),
        provider,
        loader,
        config.snapshot_path(),
        config.retrieval.default_n_results,
    ))
}

/// Serve the retrieval API on `bind_addr` until ctrl-c.
pub async fn serve(bind_addr: &str, state: AppState) -> Result<()> {
    let router = api::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "retrieval API listening at http://{bind_addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            tracing::info!("shutting down retrieval API");
        })
        .await
        .context("server error")?;

    Ok(())
}
