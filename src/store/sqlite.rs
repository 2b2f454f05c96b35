//! SQLite-backed [`VectorIndex`] implementation.
//!
//! Every collection lives in the shared `entries` table of
//! `{index_dir}/index.sqlite`. Similarity queries load the collection's
//! vectors and rank them by cosine distance in process.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::path::Path;

use crate::db;
use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::migrate;
use crate::models::{ChunkMetadata, IndexRecord, RetrievalResult, RetrievedChunk};

use super::{content_hash, cosine_distance, top_k, VectorIndex, METRIC_COSINE};

/// A named collection in the SQLite index.
pub struct SqliteIndex {
    pool: SqlitePool,
    name: String,
}

impl SqliteIndex {
    /// Open the index under `index_dir` and get or create `collection`.
    pub async fn open(index_dir: &Path, collection: &str) -> Result<Self> {
        let pool = db::connect(index_dir).await?;
        Self::with_pool(pool, collection).await
    }

    /// Get or create `collection` on an existing pool.
    pub async fn with_pool(pool: SqlitePool, collection: &str) -> Result<Self> {
        migrate::run_migrations(&pool).await?;

        sqlx::query(
            r#"
            INSERT INTO collections (name, metric, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(collection)
        .bind(METRIC_COSINE)
        .bind(chrono::Utc::now().timestamp())
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            name: collection.to_string(),
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VectorIndex for SqliteIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[IndexRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO entries (collection, id, document, metadata_json, embedding, dims, hash, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    document = excluded.document,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding,
                    dims = excluded.dims,
                    hash = excluded.hash,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.name)
            .bind(&record.id)
            .bind(&record.document)
            .bind(metadata_json)
            .bind(vec_to_blob(&record.embedding))
            .bind(record.embedding.len() as i64)
            .bind(content_hash(&record.document))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<RetrievalResult> {
        let rows = sqlx::query(
            "SELECT id, document, metadata_json, embedding FROM entries WHERE collection = ?",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let scored = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                (cosine_distance(embedding, &blob_to_vec(&blob)), row)
            })
            .collect();

        let hits = top_k(scored, k)
            .into_iter()
            .map(|(distance, row)| {
                let metadata_json: String = row.get("metadata_json");
                let metadata: ChunkMetadata =
                    serde_json::from_str(&metadata_json).unwrap_or_default();
                RetrievedChunk {
                    id: row.get("id"),
                    document: row.get("document"),
                    metadata,
                    distance: Some(distance),
                }
            })
            .collect();

        Ok(RetrievalResult { hits })
    }

    async fn content_hashes(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT id, hash FROM entries WHERE collection = ?")
            .bind(&self.name)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| -> (String, String) { (row.get("id"), row.get("hash")) })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries WHERE collection = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn reset(&self) -> Result<()> {
        sqlx::query("DELETE FROM entries WHERE collection = ?")
            .bind(&self.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
