//! Corpus loading and the processed-embedding snapshot.
//!
//! [`ParquetCorpus`] implements a cache-or-fetch policy: the raw Parquet file is
//! downloaded once, persisted next to the database, and every later load reads
//! the cache. Passage ids are derived from row position so repeated loads of
//! the same source produce identical ids.

pub mod snapshot;

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use parquet::file::reader::{FileReader, SerializedFileReader};
use parquet::record::Field;
use serde::{Deserialize, Serialize};

/// A single corpus passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub id: String,
    pub text: String,
}

impl Passage {
    /// Stable id for the passage at `row` in the source table.
    pub fn id_for_row(row: usize) -> String {
        format!("passage-{row}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("corpus I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corpus download failed: {0}")]
    Download(String),
    #[error("invalid parquet corpus: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
    #[error("corpus has no column named {0:?}")]
    MissingColumn(String),
}

/// Source of raw passages.
pub trait CorpusLoader: Send + Sync {
    fn load(&self) -> Result<Vec<Passage>, CorpusError>;
}

/// Parquet corpus with a local raw cache.
pub struct ParquetCorpus {
    source: String,
    cache_path: PathBuf,
    text_column: String,
    download_timeout: Duration,
    show_progress: bool,
}

impl ParquetCorpus {
    /// `source` is an `http(s)://` URL or a local file path.
    pub fn new(
        source: impl Into<String>,
        cache_path: impl Into<PathBuf>,
        text_column: impl Into<String>,
        download_timeout: Duration,
    ) -> Self {
        Self {
            source: source.into(),
            cache_path: cache_path.into(),
            text_column: text_column.into(),
            download_timeout,
            show_progress: false,
        }
    }

    pub fn from_config(config: &crate::config::RagConfig) -> Self {
        Self::new(
            config.corpus.source.clone(),
            config.raw_cache_path(),
            config.corpus.text_column.clone(),
            Duration::from_secs(config.corpus.download_timeout_secs.max(1)),
        )
    }

    /// Draw a terminal progress bar while downloading (CLI use).
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Persist the source into the raw cache. Writes a temp file then renames,
    /// so a failed fetch never leaves a truncated cache behind.
    fn fetch_into_cache(&self) -> Result<(), CorpusError> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CorpusError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let tmp_path = self.cache_path.with_extension("tmp");

        if self.source.starts_with("http://") || self.source.starts_with("https://") {
            tracing::info!(url = %self.source, "downloading corpus");
            self.download(&tmp_path)?;
        } else {
            tracing::info!(path = %self.source, "copying local corpus");
            std::fs::copy(&self.source, &tmp_path).map_err(|source| CorpusError::Io {
                path: PathBuf::from(&self.source),
                source,
            })?;
        }

        std::fs::rename(&tmp_path, &self.cache_path).map_err(|source| CorpusError::Io {
            path: self.cache_path.clone(),
            source,
        })?;
        tracing::info!(path = %self.cache_path.display(), "raw corpus cached");
        Ok(())
    }

    fn download(&self, dest: &Path) -> Result<(), CorpusError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.download_timeout)
            .build()
            .map_err(|e| CorpusError::Download(e.to_string()))?;
        let mut response = client
            .get(&self.source)
            .send()
            .map_err(|e| CorpusError::Download(e.to_string()))?;
        if !response.status().is_success() {
            return Err(CorpusError::Download(format!(
                "HTTP {} from {}",
                response.status(),
                self.source
            )));
        }

        let pb = if !self.show_progress {
            ProgressBar::hidden()
        } else if let Some(size) = response.content_length() {
            let pb = ProgressBar::new(size);
            if let Ok(style) =
                ProgressStyle::default_bar().template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
            {
                pb.set_style(style.progress_chars("##-"));
            }
            pb
        } else {
            ProgressBar::new_spinner()
        };

        let io_err = |source| CorpusError::Io {
            path: dest.to_path_buf(),
            source,
        };
        let mut file = File::create(dest).map_err(io_err)?;
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            let n = response
                .read(&mut buf)
                .map_err(|e| CorpusError::Download(e.to_string()))?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).map_err(io_err)?;
            pb.inc(n as u64);
        }
        file.flush().map_err(io_err)?;
        pb.finish_and_clear();
        Ok(())
    }

    fn read_cache(&self) -> Result<Vec<Passage>, CorpusError> {
        let file = File::open(&self.cache_path).map_err(|source| CorpusError::Io {
            path: self.cache_path.clone(),
            source,
        })?;
        read_passages(file, &self.text_column)
    }
}

impl CorpusLoader for ParquetCorpus {
    fn load(&self) -> Result<Vec<Passage>, CorpusError> {
        if self.cache_path.exists() {
            tracing::debug!(path = %self.cache_path.display(), "reading cached corpus");
        } else {
            self.fetch_into_cache()?;
        }
        let passages = self.read_cache()?;
        tracing::info!(passages = passages.len(), "corpus loaded");
        Ok(passages)
    }
}

/// Read `text_column` from every row of a Parquet file. The row ordinal becomes
/// the passage id; a null cell yields an empty passage so positions never shift.
pub fn read_passages(file: File, text_column: &str) -> Result<Vec<Passage>, CorpusError> {
    let reader = SerializedFileReader::new(file)?;

    let has_column = reader
        .metadata()
        .file_metadata()
        .schema_descr()
        .columns()
        .iter()
        .any(|c| c.name() == text_column);
    if !has_column {
        return Err(CorpusError::MissingColumn(text_column.to_string()));
    }

    let mut passages = Vec::new();
    for (row_idx, row) in reader.get_row_iter(None)?.enumerate() {
        let row = row?;
        let text = row
            .get_column_iter()
            .find(|(name, _)| name.as_str() == text_column)
            .and_then(|(_, field)| match field {
                Field::Str(s) => Some(s.clone()),
                Field::Null => None,
                other => Some(other.to_string()),
            })
            .unwrap_or_default();
        passages.push(Passage {
            id: Passage::id_for_row(row_idx),
            text,
        });
    }
    Ok(passages)
}


#[cfg(test)]
mod tests {
    use super::test_support::write_passages;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_positional_ids() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("raw.parquet");
        write_passages(&path, &["alpha", "beta", "gamma"]);

        let passages = read_passages(File::open(&path).unwrap(), "passage").unwrap();
        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].id, "passage-0");
        assert_eq!(passages[2].id, "passage-2");
        assert_eq!(passages[1].text, "beta");
    }

    #[test]
    fn missing_column_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("raw.parquet");
        write_passages(&path, &["alpha"]);

        let err = read_passages(File::open(&path).unwrap(), "text").unwrap_err();
        assert!(matches!(err, CorpusError::MissingColumn(ref c) if c == "text"));
    }

    #[test]
    fn local_source_is_cached_then_reused() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("source.parquet");
        write_passages(&source, &["one", "two"]);
        let cache = tmp.path().join("cache").join("raw.parquet");

        let corpus = ParquetCorpus::new(
            source.to_string_lossy(),
            &cache,
            "passage",
            Duration::from_secs(5),
        );
        let first = corpus.load().unwrap();
        assert!(cache.exists());

        // Source gone: the cache must be enough.
        std::fs::remove_file(&source).unwrap();
        let second = corpus.load().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_local_source_fails_without_cache() {
        let tmp = TempDir::new().unwrap();
        let corpus = ParquetCorpus::new(
            tmp.path().join("nope.parquet").to_string_lossy(),
            tmp.path().join("raw.parquet"),
            "passage",
            Duration::from_secs(5),
        );
        assert!(matches!(corpus.load(), Err(CorpusError::Io { .. })));
        assert!(!tmp.path().join("raw.parquet").exists());
    }
}
