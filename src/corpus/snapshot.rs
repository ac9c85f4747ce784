//! On-disk cache of embedded passages.
//!
//! A snapshot holds every passage with its embedding, so a restart can reload
//! the collection without calling the embedding provider. When present it is
//! authoritative. Writes go to a temp file that is renamed over the old
//! snapshot.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("snapshot entry {id} has {actual} dimensions, expected {expected}")]
    Dimension {
        id: String,
        expected: usize,
        actual: usize,
    },
}

/// One embedded passage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    /// `true` when the provider failed and the zero vector was substituted.
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub model: String,
    pub dimension: usize,
    pub created_at: String,
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub fn new(model: impl Into<String>, dimension: usize, entries: Vec<SnapshotEntry>) -> Self {
        Self {
            model: model.into(),
            dimension,
            created_at: chrono::Utc::now().to_rfc3339(),
            entries,
        }
    }

    /// Every entry must carry exactly `dimension` floats.
    pub fn validate(&self, dimension: usize) -> Result<(), SnapshotError> {
        for entry in &self.entries {
            if entry.embedding.len() != dimension {
                return Err(SnapshotError::Dimension {
                    id: entry.id.clone(),
                    expected: dimension,
                    actual: entry.embedding.len(),
                });
            }
        }
        Ok(())
    }
}

/// Load the snapshot at `path`, or `None` if there is none.
pub fn load(path: &Path) -> Result<Option<Snapshot>, SnapshotError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SnapshotError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let snapshot = serde_json::from_reader(BufReader::new(file)).map_err(|source| {
        SnapshotError::Json {
            path: path.to_path_buf(),
            source,
        }
    })?;
    Ok(Some(snapshot))
}

/// Persist `snapshot` at `path`, replacing any previous one.
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let io_err = |source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let tmp_path = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp_path).map_err(io_err)?);
        serde_json::to_writer(&mut writer, snapshot).map_err(|source| SnapshotError::Json {
            path: tmp_path.clone(),
            source,
        })?;
        writer.flush().map_err(io_err)?;
    }
    std::fs::rename(&tmp_path, path).map_err(io_err)?;

    tracing::info!(
        path = %path.display(),
        entries = snapshot.entries.len(),
        "processed snapshot saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, embedding: Vec<f32>) -> SnapshotEntry {
        SnapshotEntry {
            id: id.into(),
            text: format!("text of {id}"),
            embedding,
            fallback: false,
        }
    }

    #[test]
    fn missing_snapshot_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load(&tmp.path().join("processed.json")).unwrap().is_none());
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("processed.json");

        save(&path, &Snapshot::new("m", 2, vec![entry("passage-0", vec![1.0, 0.0])])).unwrap();
        save(
            &path,
            &Snapshot::new(
                "m",
                2,
                vec![
                    entry("passage-0", vec![0.0, 1.0]),
                    entry("passage-1", vec![1.0, 1.0]),
                ],
            ),
        )
        .unwrap();

        let loaded = load(&path).unwrap().unwrap();
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].embedding, vec![0.0, 1.0]);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("processed.json");
        std::fs::write(&path, b"{not json").unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Json { .. })));
    }

    #[test]
    fn validate_flags_wrong_dimension() {
        let snapshot = Snapshot::new(
            "m",
            3,
            vec![entry("passage-0", vec![1.0, 0.0, 0.0]), entry("passage-1", vec![1.0])],
        );
        let err = snapshot.validate(3).unwrap_err();
        assert!(matches!(
            err,
            SnapshotError::Dimension { ref id, expected: 3, actual: 1 } if id == "passage-1"
        ));
    }
}
