//! Core data models used throughout the paper pipeline.
//!
//! These types represent the content items, chunks, documents, and
//! retrieval results that flow from the offline corpus builder through the
//! index and into the answer path.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Schema version written into every corpus file.
pub const CORPUS_SCHEMA_VERSION: u32 = 1;

/// Kind of a structured content item, parsed from its `type` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    List,
    Equation,
    Code,
    Image,
    /// Any tag outside the known set, kept verbatim.
    Other(String),
}

impl ContentKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "list" => Self::List,
            "equation" => Self::Equation,
            "code" => Self::Code,
            "image" => Self::Image,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::List => "list",
            Self::Equation => "equation",
            Self::Code => "code",
            Self::Image => "image",
            Self::Other(tag) => tag,
        }
    }
}

/// One structured unit from a paper's extraction output.
///
/// Extraction tools emit many more fields (bounding boxes, image paths);
/// only the ones that carry text or position are read. A field holding an
/// unexpected JSON type is treated as absent rather than failing the whole
/// paper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind_tag: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub list_items: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub code_caption: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub code_body: Option<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub image_caption: Vec<String>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub image_footnote: Vec<String>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub page_idx: Option<i64>,
    #[serde(default, deserialize_with = "lenient_int")]
    pub text_level: Option<i64>,
}

impl ContentItem {
    /// Parse one element of a content list. Elements that are not JSON
    /// objects become an empty item, which extracts to no text.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// The raw type tag, `"unknown"` when the item has none.
    pub fn tag(&self) -> &str {
        self.kind_tag.as_deref().unwrap_or("unknown")
    }

    pub fn kind(&self) -> ContentKind {
        ContentKind::from_tag(self.tag())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    }))
}

/// A retrievable unit of normalized text derived from one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub chunk_index: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub page_idx: Option<i64>,
    #[serde(default)]
    pub text_level: Option<i64>,
}

/// All chunks and metadata belonging to one paper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub paper_id: String,
    pub title: String,
    pub source_path: String,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub num_pages: Option<i64>,
    #[serde(default)]
    pub num_chunks: usize,
    pub chunks: Vec<Chunk>,
}

/// The persisted collection of documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corpus {
    pub schema_version: u32,
    pub generated_at: String,
    pub num_papers: usize,
    pub papers: Vec<Document>,
}

/// Metadata stored next to each chunk in the vector index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(default)]
    pub paper_id: Option<String>,
    #[serde(default)]
    pub paper_title: Option<String>,
    #[serde(default)]
    pub page_idx: Option<i64>,
    #[serde(default)]
    pub chunk_index: Option<usize>,
    #[serde(default)]
    pub chunk_type: Option<String>,
    #[serde(default)]
    pub source_path: Option<String>,
    #[serde(default)]
    pub pdf_path: Option<String>,
}

impl ChunkMetadata {
    pub fn for_chunk(doc: &Document, chunk: &Chunk) -> Self {
        Self {
            paper_id: Some(doc.paper_id.clone()),
            paper_title: Some(doc.title.clone()),
            page_idx: chunk.page_idx,
            chunk_index: Some(chunk.chunk_index),
            chunk_type: Some(chunk.kind.clone()),
            source_path: Some(doc.source_path.clone()),
            pdf_path: doc.pdf_path.clone(),
        }
    }
}

/// One record ready for upsert into the vector index.
#[derive(Debug, Clone)]
pub struct IndexRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: ChunkMetadata,
}

/// A single ranked hit from a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    pub id: String,
    pub document: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance; `None` when the backend did not report one.
    pub distance: Option<f64>,
}

/// Ranked output of a similarity query, best first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub hits: Vec<RetrievedChunk>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }
}

/// Packed prompt context plus the human-readable source listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextBundle {
    pub context: String,
    pub sources: String,
    /// Number of source blocks that fit the budget.
    pub included: usize,
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat-completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_item_ignores_extra_fields() {
        let item = ContentItem::from_value(&json!({
            "type": "text",
            "text": "Hello",
            "bbox": [1, 2, 3, 4],
            "page_idx": 3
        }));
        assert_eq!(item.kind(), ContentKind::Text);
        assert_eq!(item.text.as_deref(), Some("Hello"));
        assert_eq!(item.page_idx, Some(3));
    }

    #[test]
    fn test_content_item_wrong_types_are_absent() {
        let item = ContentItem::from_value(&json!({
            "type": "list",
            "list_items": ["a", 7, null, "b"],
            "page_idx": "two",
            "text_level": 1.5
        }));
        assert_eq!(item.list_items, vec!["a", "b"]);
        assert_eq!(item.page_idx, None);
        assert_eq!(item.text_level, None);
    }

    #[test]
    fn test_integral_floats_read_as_ints() {
        let item = ContentItem::from_value(&json!({
            "type": "text",
            "text": "Heading",
            "text_level": 1.0,
            "page_idx": 3.5
        }));
        assert_eq!(item.text_level, Some(1));
        assert_eq!(item.page_idx, None);
    }

    #[test]
    fn test_non_object_item_is_empty() {
        let item = ContentItem::from_value(&json!("stray string"));
        assert_eq!(item.tag(), "unknown");
        assert!(item.text.is_none());
    }

    #[test]
    fn test_unknown_tag_kept_verbatim() {
        let kind = ContentKind::from_tag("table");
        assert_eq!(kind, ContentKind::Other("table".to_string()));
        assert_eq!(kind.as_str(), "table");
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::new(Role::Assistant, "hi");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["role"], "assistant");
    }
}
