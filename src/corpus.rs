//! Corpus assembly, persistence, and loading.
//!
//! Discovers every per-paper content list under the papers root, builds a
//! [`Document`] for each, and packages the survivors into a [`Corpus`].
//! A source that fails to build is logged and skipped; it never aborts
//! the run.

use anyhow::{bail, Context, Result};
use globset::{Glob, GlobMatcher};
use serde_json::Value;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::document::build_document;
use crate::models::{Corpus, Document, CORPUS_SCHEMA_VERSION};

/// Options for one corpus build run.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub papers_dir: PathBuf,
    pub min_chars: usize,
    pub source_suffix: String,
    /// Process at most this many sources, after sorting.
    pub limit: Option<usize>,
}

impl BuildOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            papers_dir: config.paths.papers_dir.clone(),
            min_chars: config.corpus.min_chunk_chars,
            source_suffix: config.corpus.source_suffix.clone(),
            limit: None,
        }
    }
}

/// Recursively find content-list files under `papers_dir`, sorted by path.
pub fn find_content_lists(papers_dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    if !papers_dir.exists() {
        bail!("Papers directory does not exist: {}", papers_dir.display());
    }

    let matcher = suffix_matcher(suffix)?;
    let mut found = Vec::new();
    for entry in WalkDir::new(papers_dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if matcher.is_match(name.as_ref()) {
            found.push(entry.into_path());
        }
    }

    found.sort();
    Ok(found)
}

fn suffix_matcher(suffix: &str) -> Result<GlobMatcher> {
    let escaped = globset::escape(suffix);
    let glob = Glob::new(&format!("*{}", escaped))
        .with_context(|| format!("Invalid source suffix: {}", suffix))?;
    Ok(glob.compile_matcher())
}

/// Build every document under the papers root into a [`Corpus`].
pub fn build_corpus(opts: &BuildOptions) -> Result<Corpus> {
    let mut sources = find_content_lists(&opts.papers_dir, &opts.source_suffix)?;
    if let Some(limit) = opts.limit {
        sources.truncate(limit);
    }

    let mut papers = Vec::new();
    for source in &sources {
        match build_document(source, &opts.papers_dir, opts.min_chars) {
            Ok(Some(doc)) => {
                tracing::debug!(paper = %doc.paper_id, chunks = doc.num_chunks, "built document");
                papers.push(doc);
            }
            Ok(None) => {
                tracing::info!(source = %source.display(), "no usable chunks; skipped");
            }
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "failed to build document; skipped");
            }
        }
    }

    Ok(Corpus {
        schema_version: CORPUS_SCHEMA_VERSION,
        generated_at: chrono::Utc::now()
            .format("%Y-%m-%dT%H:%M:%S%.6fZ")
            .to_string(),
        num_papers: papers.len(),
        papers,
    })
}

/// Write the corpus as pretty-printed JSON, creating parent directories.
pub fn write_corpus(path: &Path, corpus: &Corpus) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }
    let json = serde_json::to_string_pretty(corpus)?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write corpus: {}", path.display()))?;
    Ok(())
}

/// Load the documents of a corpus file.
///
/// Accepts a bare JSON array of documents or an object with a `papers`
/// key. Any other top-level shape is an error.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus: {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in corpus: {}", path.display()))?;
    parse_corpus(value)
}

/// Decode the documents from an already-parsed corpus value.
pub fn parse_corpus(value: Value) -> Result<Vec<Document>> {
    let papers = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("papers") {
            Some(papers) => papers,
            None => bail!("Unsupported corpus format"),
        },
        _ => bail!("Unsupported corpus format"),
    };
    let docs: Vec<Document> =
        serde_json::from_value(papers).with_context(|| "Invalid document records in corpus")?;
    Ok(docs)
}

/// Run the `build-corpus` command: build, write, and print a summary.
pub fn run_build_corpus(opts: &BuildOptions, output: &Path) -> Result<()> {
    let corpus = build_corpus(opts)?;
    write_corpus(output, &corpus)?;

    let chunk_total: usize = corpus.papers.iter().map(|p| p.num_chunks).sum();
    println!("build-corpus");
    println!("  papers dir: {}", opts.papers_dir.display());
    println!("  papers: {}", corpus.num_papers);
    println!("  chunks: {}", chunk_total);
    println!("Wrote {} papers to {}", corpus.num_papers, output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_list() {
        let docs = parse_corpus(json!([{
            "paper_id": "p1",
            "title": "T",
            "source_path": "papers/p1/x_content_list.json",
            "chunks": [{"chunk_id": "p1-000000", "chunk_index": 0, "text": "hello", "type": "text"}]
        }]))
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].chunks[0].chunk_id, "p1-000000");
        assert_eq!(docs[0].pdf_path, None);
    }

    #[test]
    fn test_parse_papers_object() {
        let docs = parse_corpus(json!({"schema_version": 1, "papers": []})).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_parse_rejects_other_shapes() {
        for value in [json!({"documents": []}), json!("papers"), json!(42)] {
            let err = parse_corpus(value).unwrap_err();
            assert!(err.to_string().contains("Unsupported corpus format"));
        }
    }

    #[test]
    fn test_suffix_matcher_is_literal() {
        let m = suffix_matcher("_content_list.json").unwrap();
        assert!(m.is_match("paper_content_list.json"));
        assert!(!m.is_match("paper_content_list.json.bak"));
        assert!(!m.is_match("paper_content_listXjson"));
    }

    #[test]
    fn test_missing_root_is_error() {
        let err = find_content_lists(Path::new("/definitely/not/here"), "_content_list.json")
            .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
