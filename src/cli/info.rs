use anyhow::Result;
use std::sync::{Arc, Mutex};

use ragstore::config::RagConfig;
use ragstore::db;
use ragstore::store::{SqliteVecStore, VectorStore};

/// Display collection statistics in the terminal.
pub fn info(config: &RagConfig) -> Result<()> {
    let conn = db::open_database(config.resolved_db_path())?;
    let store = SqliteVecStore::open(Arc::new(Mutex::new(conn)), &config.storage.collection)?;
    let info = store.info()?;

    println!("Collection Info");
    println!("{}", "=".repeat(40));
    println!("  Name:            {}", info.name);
    println!("  Documents:       {}", info.count);
    println!("  Dimension:       {}", store.dimension());
    for (key, value) in &info.metadata {
        if key != "dimension" {
            println!("  {:<16} {}", format!("{key}:"), value);
        }
    }
    Ok(())
}
