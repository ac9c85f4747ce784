//! Ollama embeddings client.
//!
//! Implements [`EmbeddingProvider`] over `POST /api/embeddings`
//! (`{model, prompt}` → `{embedding: [..]}`) with a blocking `reqwest` client.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::{EmbeddingProvider, ProviderError};

/// Timeout for the reachability probe; kept short so `/health` stays fast.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Blocking embeddings client for an Ollama-compatible endpoint.
pub struct OllamaEmbeddingProvider {
    client: Client,
    endpoint: String,
    tags_endpoint: String,
    model: String,
    dimensions: usize,
    timeout: Duration,
}

impl OllamaEmbeddingProvider {
    pub fn new(
        base_url: String,
        model: String,
        dimensions: usize,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!model.trim().is_empty(), "missing embedding model name");
        anyhow::ensure!(dimensions > 0, "embedding dimensions must be positive");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build embedding HTTP client")?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            endpoint: format!("{base}/api/embeddings"),
            tags_endpoint: format!("{base}/api/tags"),
            model,
            dimensions,
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.timeout)
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().map_err(|e| self.map_send_error(e))?;
        let parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;
        let embedding = parsed
            .embedding
            .ok_or_else(|| ProviderError::Malformed("missing `embedding` field".into()))?;

        if embedding.len() != self.dimensions {
            return Err(ProviderError::Dimension {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_available(&self) -> bool {
        match self
            .client
            .get(&self.tags_endpoint)
            .timeout(PROBE_TIMEOUT)
            .send()
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, "embedding provider probe failed");
                false
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Option<Vec<f32>>,
}
