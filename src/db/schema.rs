//! SQL DDL for the document store.
//!
//! Defines the `collections`, `documents`, and `schema_meta` tables. Each
//! collection additionally owns a `vec0` virtual table created on demand by
//! [`vec_table_ddl`], since its dimension is only known at collection creation.
//! All DDL uses `IF NOT EXISTS` for idempotent initialization.

use rusqlite::Connection;

/// Schema version written on first initialization.
pub const SCHEMA_VERSION: u32 = 1;

const SCHEMA_SQL: &str = r#"
-- Named collections; dimension is fixed for the collection's lifetime
CREATE TABLE IF NOT EXISTS collections (
    name TEXT PRIMARY KEY,
    dimension INTEGER NOT NULL CHECK(dimension > 0),
    metadata TEXT,
    created_at TEXT NOT NULL
);

-- Document text and metadata; vectors live in the collection's vec0 table
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
    id TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT,
    created_at TEXT NOT NULL,
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Initialize all schema tables. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Read the stored schema version.
pub fn get_schema_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.query_row(
        "SELECT value FROM schema_meta WHERE key = 'schema_version'",
        [],
        |row| {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().unwrap_or(0))
        },
    )
}

/// Name of the vec0 table backing a collection.
///
/// Collection names are restricted to `[A-Za-z0-9_]`, so distinct names map to
/// distinct tables and the result is a safe SQL identifier once quoted.
pub fn vec_table_name(collection: &str) -> String {
    let sanitized: String = collection
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect();
    format!("vec_{sanitized}")
}

/// vec0 DDL for a collection (sqlite-vec syntax, L2 distance).
pub fn vec_table_ddl(collection: &str, dimension: usize) -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS \"{}\" USING vec0(\n    id TEXT PRIMARY KEY,\n    embedding FLOAT[{dimension}]\n);",
        vec_table_name(collection)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_creates_all_tables() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"collections".to_string()));
        assert!(tables.contains(&"documents".to_string()));
        assert!(tables.contains(&"schema_meta".to_string()));
        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(!version.is_empty());
    }

    #[test]
    fn schema_is_idempotent() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn vec_table_ddl_creates_table() {
        crate::db::load_sqlite_vec();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&vec_table_ddl("chunks", 4)).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vec_chunks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn vec_table_name_is_sanitized() {
        assert_eq!(vec_table_name("chunks"), "vec_chunks");
        assert_eq!(vec_table_name("wiki_2024"), "vec_wiki_2024");
    }
}
