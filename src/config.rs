use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Passages parquet of the rag-mini-wikipedia dataset.
pub const DEFAULT_CORPUS_SOURCE: &str = "https://huggingface.co/datasets/rag-datasets/rag-mini-wikipedia/resolve/main/data/passages.parquet/part.0.parquet";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RagConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: String,
    pub db_file: String,
    pub collection: String,
    pub raw_cache: String,
    pub snapshot: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CorpusConfig {
    pub source: String,
    pub text_column: String,
    pub download_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_n_results: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./LOCAL".into(),
            db_file: "vectors.db".into(),
            collection: "chunks".into(),
            raw_cache: "raw.parquet".into(),
            snapshot: "processed.json".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 11434,
            model: "nomic-embed-text".into(),
            dimensions: 768,
            timeout_secs: 30,
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_CORPUS_SOURCE.into(),
            text_column: "passage".into(),
            download_timeout_secs: 300,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_n_results: 5,
        }
    }
}

/// Returns the default config file path: `./ragstore.toml`
pub fn default_config_path() -> PathBuf {
    PathBuf::from("ragstore.toml")
}

impl RagConfig {
    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RagConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (OLLAMA_HOST, OLLAMA_PORT,
    /// RAGSTORE_DATA_DIR, RAGSTORE_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("OLLAMA_HOST") {
            self.embedding.host = val;
        }
        if let Ok(val) = std::env::var("OLLAMA_PORT") {
            match val.parse() {
                Ok(port) => self.embedding.port = port,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid OLLAMA_PORT"),
            }
        }
        if let Ok(val) = std::env::var("RAGSTORE_DATA_DIR") {
            self.storage.data_dir = val;
        }
        if let Ok(val) = std::env::var("RAGSTORE_LOG_LEVEL") {
            self.server.log_level = val;
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.storage.data_dir)
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.db_file)
    }

    pub fn raw_cache_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.raw_cache)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir().join(&self.storage.snapshot)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl EmbeddingConfig {
    /// Base URL of the provider. `host` may already carry a scheme
    /// (`OLLAMA_HOST=http://gpu-box`), in which case it is kept.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            format!("{host}:{}", self.port)
        } else {
            format!("http://{host}:{}", self.port)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    }
}
