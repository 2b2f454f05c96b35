//! In-memory [`VectorIndex`] implementation for tests and dry runs.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`. Queries are
//! brute-force cosine distance over every stored vector.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::models::{IndexRecord, RetrievalResult, RetrievedChunk};

use super::{content_hash, cosine_distance, top_k, VectorIndex};

struct StoredRecord {
    record: IndexRecord,
    hash: String,
}

/// In-memory vector index.
pub struct InMemoryIndex {
    name: String,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new("memory")
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("in-memory index lock poisoned")
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let mut stored = self.records.write().map_err(poisoned)?;
        for record in records {
            let entry = StoredRecord {
                record: record.clone(),
                hash: content_hash(&record.document),
            };
            match stored.iter_mut().find(|s| s.record.id == record.id) {
                Some(existing) => *existing = entry,
                None => stored.push(entry),
            }
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<RetrievalResult> {
        let stored = self.records.read().map_err(poisoned)?;
        let scored = stored
            .iter()
            .map(|s| (cosine_distance(embedding, &s.record.embedding), &s.record))
            .collect();

        let hits = top_k(scored, k)
            .into_iter()
            .map(|(distance, record)| RetrievedChunk {
                id: record.id.clone(),
                document: record.document.clone(),
                metadata: record.metadata.clone(),
                distance: Some(distance),
            })
            .collect();
        Ok(RetrievalResult { hits })
    }

    async fn content_hashes(&self) -> Result<HashMap<String, String>> {
        let stored = self.records.read().map_err(poisoned)?;
        Ok(stored
            .iter()
            .map(|s| (s.record.id.clone(), s.hash.clone()))
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().map_err(poisoned)?.len())
    }

    async fn reset(&self) -> Result<()> {
        self.records.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    fn record(id: &str, embedding: Vec<f32>, text: &str) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            embedding,
            document: text.to_string(),
            metadata: ChunkMetadata::default(),
        }
    }

    #[tokio::test]
    async fn test_query_best_first() {
        let index = InMemoryIndex::default();
        index
            .upsert(&[
                record("far", vec![0.0, 1.0], "far"),
                record("near", vec![1.0, 0.1], "near"),
                record("exact", vec![1.0, 0.0], "exact"),
            ])
            .await
            .unwrap();

        let result = index.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = result.hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["exact", "near"]);
        assert!(result.hits[0].distance.unwrap() < 1e-6);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = InMemoryIndex::default();
        index.upsert(&[record("a", vec![1.0], "old")]).await.unwrap();
        index.upsert(&[record("a", vec![1.0], "new")]).await.unwrap();
        assert_eq!(index.count().await.unwrap(), 1);
        let hashes = index.content_hashes().await.unwrap();
        assert_eq!(hashes["a"], content_hash("new"));
    }

    #[tokio::test]
    async fn test_empty_and_reset() {
        let index = InMemoryIndex::default();
        assert!(index.query(&[1.0], 5).await.unwrap().is_empty());
        index.upsert(&[record("a", vec![1.0], "x")]).await.unwrap();
        index.reset().await.unwrap();
        assert_eq!(index.count().await.unwrap(), 0);
    }
}
