pub mod clear;
pub mod doctor;
pub mod info;
pub mod ingest;
pub mod reset;

use anyhow::{Context, Result};
use std::io::Write;
use std::sync::{Arc, Mutex};

use ragstore::config::RagConfig;
use ragstore::db;
use ragstore::store::SqliteVecStore;

/// Open the database and the configured collection, creating it if absent.
fn open_store(config: &RagConfig) -> Result<SqliteVecStore> {
    let conn = db::open_database(config.resolved_db_path())?;
    SqliteVecStore::open_or_create(
        Arc::new(Mutex::new(conn)),
        &config.storage.collection,
        config.embedding.dimensions,
        &config.embedding.model,
    )
    .with_context(|| format!("failed to open collection {}", config.storage.collection))
}

/// Ask for a typed confirmation word on stdin.
fn confirm(prompt: &str, word: &str) -> Result<bool> {
    print!("{prompt} Type {word} to confirm: ");
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim() == word)
}
