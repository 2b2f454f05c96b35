//! Corpus and index statistics.
//!
//! Gives a quick summary of what has been built: paper and chunk counts,
//! the content-type breakdown, and how many chunks the index holds. Used
//! by `papers stats` to confirm that a corpus build and an indexing run
//! did what was expected.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;
use crate::corpus::load_corpus;
use crate::db::INDEX_DB_FILE;
use crate::models::Document;
use crate::store::{SqliteIndex, VectorIndex};

/// Summary numbers for a set of documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
    pub papers: usize,
    pub chunks: usize,
    pub papers_without_pdf: usize,
    pub chunks_by_type: BTreeMap<String, usize>,
}

pub fn corpus_stats(papers: &[Document]) -> CorpusStats {
    let mut stats = CorpusStats {
        papers: papers.len(),
        ..Default::default()
    };
    for doc in papers {
        stats.chunks += doc.chunks.len();
        if doc.pdf_path.is_none() {
            stats.papers_without_pdf += 1;
        }
        for chunk in &doc.chunks {
            *stats.chunks_by_type.entry(chunk.kind.clone()).or_insert(0) += 1;
        }
    }
    stats
}

/// Run the stats command: load the corpus, inspect the index, print.
pub async fn run_stats(config: &Config, corpus_path: &Path) -> Result<()> {
    let papers = load_corpus(corpus_path)?;
    let stats = corpus_stats(&papers);

    println!("Paper corpus stats");
    println!("==================");
    println!();
    println!("  Corpus:      {}", corpus_path.display());
    println!("  Papers:      {}", stats.papers);
    println!("  Chunks:      {}", stats.chunks);
    println!("  Without PDF: {}", stats.papers_without_pdf);
    println!();
    println!("  By type:");
    for (kind, count) in &stats.chunks_by_type {
        println!("    {:<12} {}", kind, count);
    }
    println!();

    let index_dir = config.paths.index_dir();
    if index_dir.join(INDEX_DB_FILE).exists() {
        let index = SqliteIndex::open(&index_dir, &config.index.collection).await?;
        let indexed = index.count().await?;
        index.close().await;
        println!(
            "  Indexed:     {} / {} ({}%)",
            indexed,
            stats.chunks,
            if stats.chunks > 0 {
                (indexed * 100) / stats.chunks
            } else {
                0
            }
        );
    } else {
        println!("  Indexed:     no index at {}", index_dir.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn chunk(kind: &str) -> Chunk {
        Chunk {
            chunk_id: "p-000000".to_string(),
            chunk_index: 0,
            text: "text".to_string(),
            kind: kind.to_string(),
            page_idx: None,
            text_level: None,
        }
    }

    #[test]
    fn test_corpus_stats() {
        let papers = vec![
            Document {
                paper_id: "a".to_string(),
                title: "A".to_string(),
                source_path: "a".to_string(),
                pdf_path: Some("a.pdf".to_string()),
                num_pages: Some(1),
                num_chunks: 2,
                chunks: vec![chunk("text"), chunk("image")],
            },
            Document {
                paper_id: "b".to_string(),
                title: "B".to_string(),
                source_path: "b".to_string(),
                pdf_path: None,
                num_pages: None,
                num_chunks: 1,
                chunks: vec![chunk("text")],
            },
        ];
        let stats = corpus_stats(&papers);
        assert_eq!(stats.papers, 2);
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.papers_without_pdf, 1);
        assert_eq!(stats.chunks_by_type["text"], 2);
        assert_eq!(stats.chunks_by_type["image"], 1);
    }
}
