//! CLI `reset` command: drop and recreate the collection after user confirmation.

use anyhow::{bail, Context, Result};
use std::sync::{Arc, Mutex};

use ragstore::config::RagConfig;
use ragstore::db;
use ragstore::store::sqlite::drop_collection;
use ragstore::store::SqliteVecStore;

/// Drop the collection (documents and vectors) and create it empty with the
/// configured dimension. The processed snapshot is left in place.
pub fn reset(config: &RagConfig, yes: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let name = &config.storage.collection;

    if !yes {
        println!("WARNING: This will permanently delete collection '{name}' and all its vectors.");
        println!("Database: {}", db_path.display());
        if !super::confirm("Continue?", "YES")? {
            bail!("reset cancelled");
        }
    }

    let mut conn = db::open_database(&db_path)?;
    let existed = drop_collection(&mut conn, name).context("failed to drop collection")?;

    SqliteVecStore::open_or_create(
        Arc::new(Mutex::new(conn)),
        name,
        config.embedding.dimensions,
        &config.embedding.model,
    )?;

    if existed {
        println!("Collection '{name}' recreated with {} dimensions.", config.embedding.dimensions);
    } else {
        println!("Collection '{name}' did not exist; created with {} dimensions.", config.embedding.dimensions);
    }
    Ok(())
}
