//! CLI `doctor` command: run diagnostics and print a health report.

use anyhow::{Context, Result};

use ragstore::config::RagConfig;
use ragstore::corpus::snapshot;
use ragstore::db;
use ragstore::embedding;

pub fn doctor(config: &RagConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    println!("ragstore Health Report");
    println!("======================");
    println!();

    if db_path.exists() {
        let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);
        let conn = db::open_database(&db_path)
            .context("failed to open database (may be corrupt)")?;
        let report = db::check_database_health(&conn).context("failed to run health check")?;

        println!("Database:          {}", db_path.display());
        println!("File size:         {}", format_bytes(file_size));
        println!("Schema version:    {}", report.schema_version);
        println!("sqlite-vec:        {}", report.sqlite_vec_version);
        println!("Collections:");
        if report.collections.is_empty() {
            println!("  (none)");
        }
        for (name, count) in &report.collections {
            let marker = if name == &config.storage.collection { " (active)" } else { "" };
            println!("  {name:<16} {count} documents{marker}");
        }
        if report.integrity_ok {
            println!("Integrity check:   PASSED");
        } else {
            println!("Integrity check:   FAILED ({})", report.integrity_details);
        }
    } else {
        println!("Database:          not found at {}", db_path.display());
        println!("Run `ragstore ingest` or `ragstore serve` to initialize.");
    }
    println!();

    let raw_cache = config.raw_cache_path();
    println!(
        "Raw corpus cache:  {}",
        if raw_cache.exists() { raw_cache.display().to_string() } else { "(not downloaded)".into() }
    );

    let snapshot_path = config.snapshot_path();
    match snapshot::load(&snapshot_path) {
        Ok(Some(snap)) => {
            let fallbacks = snap.entries.iter().filter(|e| e.fallback).count();
            println!("Snapshot:          {} entries, model '{}', {} dims", snap.entries.len(), snap.model, snap.dimension);
            println!("  Zero-vector fallbacks: {fallbacks}");
            if snap.model != config.embedding.model || snap.dimension != config.embedding.dimensions {
                println!("  WARNING: snapshot does not match configured model. Run `ragstore ingest --force`.");
            }
        }
        Ok(None) => println!("Snapshot:          (none)"),
        Err(e) => println!("Snapshot:          UNREADABLE ({e})"),
    }
    println!();

    let provider = embedding::create_provider(&config.embedding)?;
    println!("Embedding provider: {}", config.embedding.base_url());
    println!("  Model:           {}", provider.model());
    println!(
        "  Reachable:       {}",
        if provider.is_available() { "yes" } else { "NO" }
    );

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
