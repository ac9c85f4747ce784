use std::sync::{Arc, Mutex};

use ragstore::db;
use ragstore::store::{IndexedDocument, SqliteVecStore, VectorStore};

#[test]
fn open_database_creates_file_and_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("LOCAL").join("vectors.db");

    let conn = db::open_database(&path).unwrap();
    assert!(path.exists());

    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");

    let timeout: i64 = conn
        .query_row("PRAGMA busy_timeout", [], |r| r.get(0))
        .unwrap();
    assert_eq!(timeout, 5000);
}

#[test]
fn health_check_reports_collections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectors.db");
    let conn = db::open_database(&path).unwrap();

    let report = db::check_database_health(&conn).unwrap();
    assert!(report.integrity_ok);
    assert_eq!(report.schema_version, db::schema::SCHEMA_VERSION);
    assert!(report.sqlite_vec_version.starts_with('v'));
    assert!(report.collections.is_empty());

    let conn = Arc::new(Mutex::new(conn));
    let store = SqliteVecStore::open_or_create(Arc::clone(&conn), "chunks", 3, "m").unwrap();
    store
        .add(&[IndexedDocument {
            id: "passage-0".into(),
            text: "hello".into(),
            embedding: vec![0.1, 0.2, 0.3],
            metadata: None,
        }])
        .unwrap();

    let guard = conn.lock().unwrap();
    let report = db::check_database_health(&guard).unwrap();
    assert_eq!(report.collections, vec![("chunks".to_string(), 1)]);
}

#[test]
fn collection_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vectors.db");

    {
        let conn = db::open_database(&path).unwrap();
        let store =
            SqliteVecStore::open_or_create(Arc::new(Mutex::new(conn)), "chunks", 2, "m").unwrap();
        store
            .add(&[IndexedDocument {
                id: "passage-0".into(),
                text: "kept".into(),
                embedding: vec![1.0, 0.0],
                metadata: None,
            }])
            .unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let store = SqliteVecStore::open(Arc::new(Mutex::new(conn)), "chunks").unwrap();
    assert_eq!(store.dimension(), 2);
    assert_eq!(store.count().unwrap(), 1);

    let hits = store.query(&[1.0, 0.0], 1).unwrap();
    assert_eq!(hits[0].content, "kept");
}
