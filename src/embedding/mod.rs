//! Text-to-vector embedding via a remote provider.
//!
//! Provides the [`EmbeddingProvider`] trait and an Ollama-compatible HTTP
//! implementation. Calls are synchronous and single-attempt; fallback policy
//! belongs to the caller (see [`crate::ingest`]).

pub mod ollama;

use std::time::Duration;

/// Errors from a single embedding call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("embedding request timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding provider unreachable: {0}")]
    Network(String),
    #[error("embedding provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("embedding has {actual} dimensions, expected {expected}")]
    Dimension { expected: usize, actual: usize },
}

/// Trait for embedding text into vectors.
///
/// All methods block the caller. Async callers should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text string into a vector of exactly [`dimensions`](Self::dimensions) floats.
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Model identifier, recorded in collection and snapshot metadata.
    fn model(&self) -> &str;

    /// Best-effort reachability probe for health reporting.
    fn is_available(&self) -> bool {
        true
    }
}

/// Create the configured embedding provider.
///
/// Builds a blocking HTTP client, so this must not be called from inside an
/// async context.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> anyhow::Result<Box<dyn EmbeddingProvider>> {
    let provider = ollama::OllamaEmbeddingProvider::new(
        config.base_url(),
        config.model.clone(),
        config.dimensions,
        config.timeout(),
    )?;
    tracing::info!(
        url = %config.base_url(),
        model = %config.model,
        dimensions = config.dimensions,
        "embedding provider configured"
    );
    Ok(Box::new(provider))
}
