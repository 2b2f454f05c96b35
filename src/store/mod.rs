//! Vector index abstraction.
//!
//! The [`VectorIndex`] trait is the narrow interface the indexing driver
//! and the answer path need from a nearest-neighbour store: upsert chunk
//! records, query by embedding, and inspect what is already indexed.
//! Distances are cosine distances (`1 - cosine similarity`), so lower is
//! better and results come back best first.
//!
//! Implementations must be `Send + Sync` to be shared across tasks.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::models::{IndexRecord, RetrievalResult};

pub use memory::InMemoryIndex;
pub use sqlite::SqliteIndex;

/// Similarity metric recorded for every collection.
pub const METRIC_COSINE: &str = "cosine";

/// A named collection of embedded chunks.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert`](VectorIndex::upsert) | Insert or replace records by id |
/// | [`query`](VectorIndex::query) | Top-k nearest records, best first |
/// | [`content_hashes`](VectorIndex::content_hashes) | Snapshot of indexed ids and text hashes |
/// | [`count`](VectorIndex::count) | Number of records |
/// | [`reset`](VectorIndex::reset) | Remove every record |
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Collection name.
    fn name(&self) -> &str;

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()>;

    /// Return up to `k` records ordered by ascending cosine distance.
    /// An empty collection yields an empty result.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<RetrievalResult>;

    /// Map of indexed record id to the [`content_hash`] of its text.
    async fn content_hashes(&self) -> Result<HashMap<String, String>>;

    async fn count(&self) -> Result<usize>;

    async fn reset(&self) -> Result<()>;
}

/// SHA-256 of a record's text, used to detect changed chunks.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cosine distance between a query and a stored vector.
pub(crate) fn cosine_distance(query: &[f32], stored: &[f32]) -> f64 {
    1.0 - crate::embedding::cosine_similarity(query, stored) as f64
}

/// Sort `(distance, item)` pairs best first and keep the top `k`.
pub(crate) fn top_k<T>(mut scored: Vec<(f64, T)>, k: usize) -> Vec<(f64, T)> {
    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}
