//! CLI `clear` command: delete every document, keeping the collection.

use anyhow::{bail, Result};

use ragstore::config::RagConfig;
use ragstore::store::{self, VectorStore};

pub fn clear(config: &RagConfig, yes: bool) -> Result<()> {
    let collection = super::open_store(config)?;

    if !yes {
        let prompt = format!(
            "This will delete all {} documents from '{}'.",
            collection.count()?,
            collection.name()
        );
        if !super::confirm(&prompt, "yes")? {
            bail!("clear cancelled");
        }
    }

    let deleted = store::clear(&collection)?;
    println!("Collection cleared. Deleted {deleted} documents.");
    Ok(())
}
