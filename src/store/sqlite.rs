//! SQLite + sqlite-vec implementation of [`VectorStore`].
//!
//! Document text and metadata live in the `documents` table; vectors live in a
//! per-collection `vec0` table keyed by the same id. Every write runs in a
//! transaction so the two tables never diverge.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::{
    CollectionInfo, MAX_QUERY_RESULTS, IndexedDocument, Metadata, QueryMatch, StoreError, StoredDocument, VectorStore,
};
use crate::db::schema::{vec_table_ddl, vec_table_name};


/// A named collection backed by a shared SQLite connection.
pub struct SqliteVecStore {
    conn: Arc<Mutex<Connection>>,
    name: String,
    dimension: usize,
    vec_table: String,
}

impl SqliteVecStore {
    /// Open the collection, creating it if absent.
    ///
    /// An existing collection must have been created with `dimension`; a
    /// different stored embedding model only logs a warning.
    pub fn open_or_create(
        conn: Arc<Mutex<Connection>>,
        name: &str,
        dimension: usize,
        embedding_model: &str,
    ) -> Result<Self, StoreError> {
        validate_name(name)?;
        {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            match read_collection(&guard, name)? {
                Some((stored_dim, metadata)) => {
                    if stored_dim != dimension {
                        return Err(StoreError::CollectionDimension {
                            name: name.to_string(),
                            stored: stored_dim,
                            configured: dimension,
                        });
                    }
                    let stored_model = metadata.get("embedding_model").and_then(|v| v.as_str());
                    if let Some(stored) = stored_model {
                        if stored != embedding_model {
                            tracing::warn!(
                                collection = %name,
                                stored = %stored,
                                configured = %embedding_model,
                                "embedding model changed, reload the dataset with force to re-embed"
                            );
                        }
                    }
                    guard.execute_batch(&vec_table_ddl(name, dimension))?;
                    tracing::info!(collection = %name, dimension, "found existing collection");
                }
                None => {
                    create_collection(&guard, name, dimension, embedding_model)?;
                    tracing::info!(collection = %name, dimension, "created new collection");
                }
            }
        }

        Ok(Self {
            vec_table: vec_table_name(name),
            name: name.to_string(),
            dimension,
            conn,
        })
    }

    /// Open an existing collection. Fails with [`StoreError::CollectionNotFound`]
    /// if it was never created.
    pub fn open(conn: Arc<Mutex<Connection>>, name: &str) -> Result<Self, StoreError> {
        validate_name(name)?;
        let dimension = {
            let guard = conn.lock().map_err(|_| StoreError::LockPoisoned)?;
            read_collection(&guard, name)?
                .map(|(dim, _)| dim)
                .ok_or_else(|| StoreError::CollectionNotFound(name.to_string()))?
        };
        Ok(Self {
            vec_table: vec_table_name(name),
            name: name.to_string(),
            dimension,
            conn,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    fn check_dimension(&self, id: &str, vector: &[f32]) -> Result<(), StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                id: id.to_string(),
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Drop a collection with all its documents and vectors. Returns `false` if it
/// did not exist. This is the only way a collection is recreated.
pub fn drop_collection(conn: &mut Connection, name: &str) -> Result<bool, StoreError> {
    validate_name(name)?;
    let tx = conn.transaction()?;
    tx.execute(
        &format!("DROP TABLE IF EXISTS \"{}\"", vec_table_name(name)),
        [],
    )?;
    tx.execute("DELETE FROM documents WHERE collection = ?1", params![name])?;
    let removed = tx.execute("DELETE FROM collections WHERE name = ?1", params![name])?;
    tx.commit()?;
    if removed > 0 {
        tracing::info!(collection = %name, "collection dropped");
    }
    Ok(removed > 0)
}

impl VectorStore for SqliteVecStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn add(&self, docs: &[IndexedDocument]) -> Result<(), StoreError> {
        if docs.is_empty() {
            return Ok(());
        }
        for doc in docs {
            self.check_dimension(&doc.id, &doc.embedding)?;
        }

        let now = chrono::Utc::now().to_rfc3339();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut insert_doc = tx.prepare(
                "INSERT INTO documents (collection, id, content, metadata, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            let mut insert_vec = tx.prepare(&format!(
                "INSERT INTO \"{}\" (id, embedding) VALUES (?1, ?2)",
                self.vec_table
            ))?;

            for doc in docs {
                let metadata_json = doc
                    .metadata
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?;
                insert_doc
                    .execute(params![self.name, doc.id, doc.text, metadata_json, now])
                    .map_err(|e| match e {
                        rusqlite::Error::SqliteFailure(err, _)
                            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                        {
                            StoreError::DuplicateId(doc.id.clone())
                        }
                        other => StoreError::Sqlite(other),
                    })?;
                insert_vec.execute(params![doc.id, embedding_to_bytes(&doc.embedding)])?;
            }
        }
        tx.commit()?;

        tracing::debug!(collection = %self.name, added = docs.len(), "documents added");
        Ok(())
    }

    fn delete(&self, ids: &[String]) -> Result<usize, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut deleted = 0;
        {
            let mut delete_doc =
                tx.prepare("DELETE FROM documents WHERE collection = ?1 AND id = ?2")?;
            let mut delete_vec =
                tx.prepare(&format!("DELETE FROM \"{}\" WHERE id = ?1", self.vec_table))?;
            for id in ids {
                deleted += delete_doc.execute(params![self.name, id])?;
                delete_vec.execute(params![id])?;
            }
        }
        tx.commit()?;

        tracing::debug!(collection = %self.name, requested = ids.len(), deleted, "documents deleted");
        Ok(deleted)
    }

    fn get_all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, content, metadata FROM documents WHERE collection = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![self.name], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, content, metadata)| {
                Ok(StoredDocument {
                    id,
                    content,
                    metadata: parse_metadata(metadata.as_deref())?,
                })
            })
            .collect()
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryMatch>, StoreError> {
        self.check_dimension("<query>", vector)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let conn = self.lock()?;
        let neighbors: Vec<(String, f64)> = {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, distance FROM \"{}\" WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
                self.vec_table
            ))?;
            let rows = stmt
                .query_map(params![embedding_to_bytes(vector), k.min(MAX_QUERY_RESULTS) as i64], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut fetch = conn.prepare(
            "SELECT content, metadata FROM documents WHERE collection = ?1 AND id = ?2",
        )?;
        let mut matches = Vec::with_capacity(neighbors.len());
        for (id, distance) in neighbors {
            let row: Option<(String, Option<String>)> = fetch
                .query_row(params![self.name, id], |row| Ok((row.get(0)?, row.get(1)?)))
                .optional()?;
            // A vector without a document row is a leftover from an interrupted write.
            let Some((content, metadata)) = row else {
                tracing::warn!(id = %id, "vector has no document row, skipping");
                continue;
            };
            matches.push(QueryMatch {
                id,
                content,
                metadata: parse_metadata(metadata.as_deref())?,
                distance,
            });
        }
        Ok(matches)
    }

    fn count(&self) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn info(&self) -> Result<CollectionInfo, StoreError> {
        let metadata = {
            let conn = self.lock()?;
            read_collection(&conn, &self.name)?
                .map(|(_, metadata)| metadata)
                .ok_or_else(|| StoreError::CollectionNotFound(self.name.clone()))?
        };
        Ok(CollectionInfo {
            name: self.name.clone(),
            count: self.count()?,
            metadata,
        })
    }
}

fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}

/// `(dimension, metadata)` of a collection, if it exists.
fn read_collection(
    conn: &Connection,
    name: &str,
) -> Result<Option<(usize, Metadata)>, StoreError> {
    let row: Option<(i64, Option<String>)> = conn
        .query_row(
            "SELECT dimension, metadata FROM collections WHERE name = ?1",
            params![name],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    match row {
        Some((dimension, metadata)) => Ok(Some((
            dimension as usize,
            parse_metadata(metadata.as_deref())?.unwrap_or_default(),
        ))),
        None => Ok(None),
    }
}

fn create_collection(
    conn: &Connection,
    name: &str,
    dimension: usize,
    embedding_model: &str,
) -> Result<(), StoreError> {
    let now = chrono::Utc::now().to_rfc3339();
    let metadata = serde_json::json!({
        "dimension": dimension,
        "distance": "l2",
        "embedding_model": embedding_model,
        "created_at": now,
    });
    conn.execute(
        "INSERT INTO collections (name, dimension, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, dimension as i64, metadata.to_string(), now],
    )?;
    conn.execute_batch(&vec_table_ddl(name, dimension))?;
    Ok(())
}

fn parse_metadata(raw: Option<&str>) -> Result<Option<Metadata>, StoreError> {
    raw.map(serde_json::from_str::<Metadata>)
        .transpose()
        .map_err(StoreError::from)
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            std::mem::size_of_val(embedding),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn shared_db() -> Arc<Mutex<Connection>> {
        Arc::new(Mutex::new(db::open_memory_database().unwrap()))
    }

    fn store(dim: usize) -> SqliteVecStore {
        SqliteVecStore::open_or_create(shared_db(), "chunks", dim, "test-model").unwrap()
    }

    fn doc(id: &str, text: &str, embedding: Vec<f32>) -> IndexedDocument {
        IndexedDocument {
            id: id.into(),
            text: text.into(),
            embedding,
            metadata: None,
        }
    }

    #[test]
    fn query_orders_by_ascending_distance() {
        let store = store(2);
        store
            .add(&[
                doc("far", "far away", vec![-1.0, 0.0]),
                doc("near", "nearby", vec![0.9, 0.1]),
                doc("mid", "middle", vec![0.0, 1.0]),
            ])
            .unwrap();

        let matches = store.query(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "mid", "far"]);
        assert!(matches.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(matches[0].content, "nearby");
    }

    #[test]
    fn query_is_bounded_by_k_and_collection_size() {
        let store = store(2);
        store
            .add(&[
                doc("a", "A", vec![1.0, 0.0]),
                doc("b", "B", vec![0.0, 1.0]),
            ])
            .unwrap();

        assert_eq!(store.query(&[1.0, 0.0], 1).unwrap().len(), 1);
        assert_eq!(store.query(&[1.0, 0.0], 10).unwrap().len(), 2);
        assert!(store.query(&[1.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn query_on_empty_collection_is_empty() {
        let store = store(3);
        assert!(store.query(&[0.1, 0.2, 0.3], 5).unwrap().is_empty());
    }

    #[test]
    fn add_rejects_wrong_dimension_atomically() {
        let store = store(2);
        let err = store
            .add(&[
                doc("ok", "fine", vec![1.0, 0.0]),
                doc("bad", "wrong", vec![1.0, 0.0, 0.0]),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn duplicate_id_rolls_back_batch() {
        let store = store(2);
        store.add(&[doc("a", "A", vec![1.0, 0.0])]).unwrap();

        let err = store
            .add(&[doc("b", "B", vec![0.0, 1.0]), doc("a", "again", vec![0.5, 0.5])])
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "a"));
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.get_all().unwrap().iter().all(|d| d.id != "b"));
    }

    #[test]
    fn delete_reports_removed_count_and_ignores_unknown_ids() {
        let store = store(2);
        store
            .add(&[
                doc("a", "A", vec![1.0, 0.0]),
                doc("b", "B", vec![0.0, 1.0]),
            ])
            .unwrap();

        let deleted = store.delete(&["a".into(), "missing".into()]).unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.count().unwrap(), 1);
        let remaining = store.query(&[1.0, 0.0], 5).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "b");
    }

    #[test]
    fn metadata_round_trips_through_get_all() {
        let store = store(2);
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), serde_json::json!("manual"));
        store
            .add(&[IndexedDocument {
                metadata: Some(metadata.clone()),
                ..doc("a", "A", vec![1.0, 0.0])
            }])
            .unwrap();
        store.add(&[doc("b", "B", vec![0.0, 1.0])]).unwrap();

        let docs = store.get_all().unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].metadata, Some(metadata));
        assert_eq!(docs[1].metadata, None);
    }

    #[test]
    fn clear_removes_everything() {
        let store = store(2);
        store
            .add(&[
                doc("a", "A", vec![1.0, 0.0]),
                doc("b", "B", vec![0.0, 1.0]),
                doc("c", "C", vec![1.0, 1.0]),
            ])
            .unwrap();

        assert_eq!(crate::store::clear(&store).unwrap(), 3);
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(crate::store::clear(&store).unwrap(), 0);
    }

    #[test]
    fn reopen_with_different_dimension_fails() {
        let db = shared_db();
        SqliteVecStore::open_or_create(Arc::clone(&db), "chunks", 4, "m").unwrap();
        let err = SqliteVecStore::open_or_create(db, "chunks", 8, "m")
            .err()
            .unwrap();
        assert!(matches!(
            err,
            StoreError::CollectionDimension {
                stored: 4,
                configured: 8,
                ..
            }
        ));
        assert_eq!(
            err.to_string(),
            "collection chunks was created with 4 dimensions, configured 8"
        );
    }

    #[test]
    fn open_missing_collection_is_not_found() {
        let err = SqliteVecStore::open(shared_db(), "chunks").err().unwrap();
        assert!(matches!(err, StoreError::CollectionNotFound(ref n) if n == "chunks"));
    }

    #[test]
    fn invalid_names_are_rejected() {
        let err = SqliteVecStore::open_or_create(shared_db(), "bad name\"", 2, "m")
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::InvalidName(_)));
    }

    #[test]
    fn dashed_names_are_rejected() {
        let db = shared_db();
        SqliteVecStore::open_or_create(Arc::clone(&db), "a_b", 2, "m").unwrap();
        let err = SqliteVecStore::open_or_create(Arc::clone(&db), "a-b", 2, "m")
            .err()
            .unwrap();
        assert!(matches!(err, StoreError::InvalidName(_)));

        let mut conn = db.lock().unwrap();
        assert!(matches!(
            drop_collection(&mut conn, "a-b"),
            Err(StoreError::InvalidName(_))
        ));
        drop(conn);
        assert!(SqliteVecStore::open(db, "a_b").is_ok());
    }

    #[test]
    fn drop_collection_allows_new_dimension() {
        let db = shared_db();
        let store = SqliteVecStore::open_or_create(Arc::clone(&db), "chunks", 2, "m").unwrap();
        store.add(&[doc("a", "A", vec![1.0, 0.0])]).unwrap();
        drop(store);

        let dropped = drop_collection(&mut db.lock().unwrap(), "chunks").unwrap();
        assert!(dropped);

        let store = SqliteVecStore::open_or_create(Arc::clone(&db), "chunks", 3, "m").unwrap();
        assert_eq!(store.dimension(), 3);
        assert_eq!(store.count().unwrap(), 0);
        let info = store.info().unwrap();
        assert_eq!(info.metadata["dimension"], 3);
        assert_eq!(info.metadata["distance"], "l2");
    }
}
