//! Passage retrieval over an embedded text corpus.
//!
//! ragstore loads a corpus of short passages, embeds each one through an
//! Ollama-compatible provider, stores the vectors in SQLite via
//! [sqlite-vec](https://github.com/asg017/sqlite-vec), and serves
//! nearest-neighbor search and document CRUD over HTTP.
//!
//! # Architecture
//!
//! - **Corpus**: Parquet file fetched once and cached locally; passage ids are
//!   the row position, so reloads are reproducible
//! - **Embeddings**: remote `POST /api/embeddings`, single attempt with a timeout
//! - **Ingestion**: corpus → embeddings (or the processed snapshot) → clear
//!   and bulk-load the collection; provider failures degrade to zero vectors
//! - **Storage**: SQLite documents table plus a `vec0` table per collection (L2)
//! - **Transport**: JSON over HTTP via axum
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, and health checks
//! - [`embedding`]: Embedding provider trait and Ollama client
//! - [`corpus`]: Corpus loading and the processed snapshot
//! - [`store`]: Vector store contract and the sqlite-vec implementation
//! - [`ingest`]: The ingestion pipeline
//! - [`api`]: HTTP handlers
//! - [`server`]: Server wiring

pub mod api;
pub mod config;
pub mod corpus;
pub mod db;
pub mod embedding;
pub mod ingest;
pub mod server;
pub mod store;
