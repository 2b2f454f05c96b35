//! Per-paper document builder.
//!
//! Reads one paper's content list, infers a title and a representative
//! PDF, and turns every content item that survives extraction into a
//! [`Chunk`] with a deterministic identifier.
//!
//! # Chunk identifiers
//!
//! `{paper_id}-{item_index:06}`, where `paper_id` is the name of the folder
//! holding the content list and `item_index` is the item's position in the
//! list. Filtered items still consume their index, so identifiers stay
//! stable when the minimum length changes.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::extract::{extract_text, normalize_whitespace};
use crate::models::{Chunk, ContentItem, ContentKind, Document};

/// Minimum extracted length for an item to serve as a fallback title.
const MIN_TITLE_CHARS: usize = 12;

/// Build the [`Document`] for one content-list file.
///
/// Returns `Ok(None)` when the file is not a JSON array or when no item
/// survives extraction and the `min_chars` threshold. I/O and JSON syntax
/// errors are returned as `Err` so the caller can log and skip.
pub fn build_document(
    content_path: &Path,
    papers_dir: &Path,
    min_chars: usize,
) -> Result<Option<Document>> {
    let raw = std::fs::read_to_string(content_path)
        .with_context(|| format!("Failed to read content list: {}", content_path.display()))?;
    let parsed: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid JSON in content list: {}", content_path.display()))?;

    let values = match parsed {
        Value::Array(values) => values,
        _ => return Ok(None),
    };
    let items: Vec<ContentItem> = values.iter().map(ContentItem::from_value).collect();

    let folder = content_path.parent().unwrap_or_else(|| Path::new(""));
    let paper_id = folder
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let chunks = build_chunks(&paper_id, &items, min_chars);
    if chunks.is_empty() {
        return Ok(None);
    }

    let title = infer_title(&items).unwrap_or_else(|| paper_label(&paper_id));
    let pdf_path = infer_pdf_path(folder)?.map(|pdf| relative_to_root(&pdf, papers_dir));
    let num_pages = chunks
        .iter()
        .filter_map(|c| c.page_idx)
        .max()
        .map(|max_page| max_page + 1);

    Ok(Some(Document {
        paper_id,
        title,
        source_path: relative_to_root(content_path, papers_dir),
        pdf_path,
        num_pages,
        num_chunks: chunks.len(),
        chunks,
    }))
}

/// Turn content items into chunks, dropping items with no usable text or
/// text shorter than `min_chars` characters.
pub fn build_chunks(paper_id: &str, items: &[ContentItem], min_chars: usize) -> Vec<Chunk> {
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let extracted = extract_text(item)?;
            if extracted.text.chars().count() < min_chars {
                return None;
            }
            Some(Chunk {
                chunk_id: chunk_id(paper_id, index),
                chunk_index: index,
                text: extracted.text,
                kind: extracted.kind,
                page_idx: item.page_idx,
                text_level: item.text_level,
            })
        })
        .collect()
}

pub fn chunk_id(paper_id: &str, index: usize) -> String {
    format!("{}-{:06}", paper_id, index)
}

/// Infer a title from the content items.
///
/// Prefers the first level-1 text heading, then the first item whose
/// extracted text is at least [`MIN_TITLE_CHARS`] long.
pub fn infer_title(items: &[ContentItem]) -> Option<String> {
    let heading = items
        .iter()
        .filter(|item| item.kind() == ContentKind::Text && item.text_level == Some(1))
        .map(|item| normalize_whitespace(item.text.as_deref().unwrap_or_default()))
        .find(|text| !text.is_empty());
    if heading.is_some() {
        return heading;
    }

    items
        .iter()
        .filter_map(extract_text)
        .map(|e| e.text)
        .find(|text| text.chars().count() >= MIN_TITLE_CHARS)
}

/// Human-readable label derived from a paper folder name.
///
/// Extraction tools name folders `<file stem>.pdf-<hash>`; the part before
/// `.pdf-` is kept and underscores become spaces.
pub fn paper_label(folder_name: &str) -> String {
    let base = match folder_name.split_once(".pdf-") {
        Some((base, _)) => base,
        None => folder_name,
    };
    base.replace('_', " ")
}

/// Pick the PDF that belongs to a paper folder.
///
/// Among regular `*.pdf` files directly in `folder`, the first (by name)
/// whose file name contains `origin` wins, otherwise the first overall.
pub fn infer_pdf_path(folder: &Path) -> Result<Option<PathBuf>> {
    let entries = match std::fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(_) => return Ok(None),
    };

    let mut pdfs = Vec::new();
    for entry in entries {
        let path = entry?.path();
        // Follows symlinks.
        if !path.is_file() {
            continue;
        }
        if path.extension().map(|ext| ext == "pdf").unwrap_or(false) {
            pdfs.push(path);
        }
    }
    pdfs.sort();

    let origin = pdfs.iter().position(|pdf| {
        pdf.file_name()
            .map(|n| n.to_string_lossy().contains("origin"))
            .unwrap_or(false)
    });
    Ok(match origin {
        Some(pos) => Some(pdfs.swap_remove(pos)),
        None => pdfs.into_iter().next(),
    })
}

/// Express `path` relative to the parent of the papers root when possible,
/// otherwise as given.
pub fn relative_to_root(path: &Path, papers_dir: &Path) -> String {
    papers_dir
        .parent()
        .and_then(|base| path.strip_prefix(base).ok())
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}
