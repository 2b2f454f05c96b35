//! Offline indexing: corpus → embeddings → vector index.
//!
//! Flattens the corpus into one record per chunk, embeds records in
//! batches (with retry and exponential backoff), and upserts them into the
//! configured collection. With `skip_existing`, records whose id is
//! already indexed with identical text are left alone, so re-running is
//! idempotent.

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::config::Config;
use crate::corpus::load_corpus;
use crate::embedding::{create_embedder, embed_with_retry, EmbeddingProvider, RetryPolicy};
use crate::models::{ChunkMetadata, Document, IndexRecord};
use crate::store::{content_hash, SqliteIndex, VectorIndex};

/// A chunk waiting to be embedded.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone)]
pub struct IndexOptions {
    pub batch_size: usize,
    pub reset: bool,
    pub skip_existing: bool,
    /// Index at most this many chunks, in corpus order.
    pub limit: Option<usize>,
    /// Pause between batches.
    pub pause: Option<Duration>,
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.index.batch_size,
            reset: false,
            skip_existing: false,
            limit: None,
            pause: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub indexed: usize,
    pub skipped: usize,
}

/// Flatten documents into per-chunk records, in corpus order.
pub fn pending_records(papers: &[Document]) -> Vec<PendingRecord> {
    papers
        .iter()
        .flat_map(|doc| {
            doc.chunks.iter().map(move |chunk| PendingRecord {
                id: chunk.chunk_id.clone(),
                text: chunk.text.clone(),
                metadata: ChunkMetadata::for_chunk(doc, chunk),
            })
        })
        .collect()
}

/// Embed and upsert every chunk of `papers` into `index`.
pub async fn index_corpus(
    papers: &[Document],
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    policy: &RetryPolicy,
    opts: &IndexOptions,
) -> Result<IndexReport> {
    if opts.reset {
        index.reset().await?;
        tracing::info!(collection = index.name(), "collection reset");
    }

    let existing: HashMap<String, String> = if opts.skip_existing && !opts.reset {
        let hashes = index.content_hashes().await?;
        println!("Found {} existing embeddings", hashes.len());
        hashes
    } else {
        HashMap::new()
    };

    let mut records = pending_records(papers);
    if let Some(limit) = opts.limit {
        records.truncate(limit);
    }

    let mut report = IndexReport::default();
    for batch in records.chunks(opts.batch_size.max(1)) {
        let todo: Vec<&PendingRecord> = batch
            .iter()
            .filter(|r| existing.get(&r.id) != Some(&content_hash(&r.text)))
            .collect();
        report.skipped += batch.len() - todo.len();

        if todo.is_empty() {
            continue;
        }

        let texts: Vec<String> = todo.iter().map(|r| r.text.clone()).collect();
        let vectors = embed_with_retry(embedder, &texts, policy).await?;

        let upserts: Vec<IndexRecord> = todo
            .into_iter()
            .zip(vectors)
            .map(|(r, embedding)| IndexRecord {
                id: r.id.clone(),
                embedding,
                document: r.text.clone(),
                metadata: r.metadata.clone(),
            })
            .collect();
        index.upsert(&upserts).await?;

        report.indexed += upserts.len();
        println!("Indexed {} chunks", report.indexed);

        if let Some(pause) = opts.pause {
            tokio::time::sleep(pause).await;
        }
    }

    Ok(report)
}

/// Run the `index` command against the SQLite index.
pub async fn run_index(config: &Config, corpus_path: &Path, opts: &IndexOptions) -> Result<()> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }
    let papers = load_corpus(corpus_path)?;
    let embedder = create_embedder(&config.embedding)?;
    tracing::info!(
        model = embedder.model_name(),
        collection = %config.index.collection,
        "indexing corpus"
    );
    let index = SqliteIndex::open(&config.paths.index_dir(), &config.index.collection).await?;
    let policy = RetryPolicy::from_config(&config.embedding);

    let report = index_corpus(&papers, embedder.as_ref(), &index, &policy, opts).await;
    index.close().await;
    let report = report?;

    println!(
        "Done. Indexed {} chunks (skipped {}).",
        report.indexed, report.skipped
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn doc(paper_id: &str, texts: &[&str]) -> Document {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                chunk_id: format!("{}-{:06}", paper_id, i),
                chunk_index: i,
                text: t.to_string(),
                kind: "text".to_string(),
                page_idx: Some(i as i64),
                text_level: None,
            })
            .collect();
        Document {
            paper_id: paper_id.to_string(),
            title: format!("Title {}", paper_id),
            source_path: format!("papers/{}/x_content_list.json", paper_id),
            pdf_path: None,
            num_pages: None,
            num_chunks: chunks.len(),
            chunks,
        }
    }

    #[test]
    fn test_pending_records_carry_metadata() {
        let records = pending_records(&[doc("a", &["one", "two"]), doc("b", &["three"])]);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a-000000", "a-000001", "b-000000"]);
        let meta = &records[1].metadata;
        assert_eq!(meta.paper_title.as_deref(), Some("Title a"));
        assert_eq!(meta.page_idx, Some(1));
        assert_eq!(meta.chunk_index, Some(1));
        assert_eq!(meta.chunk_type.as_deref(), Some("text"));
    }
}
