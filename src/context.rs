//! Budgeted prompt-context assembly.
//!
//! Packs a ranked [`RetrievalResult`] into a context string of numbered
//! source blocks plus a matching source listing. Packing walks hits in
//! rank order and stops at the first block that would push the total over
//! the character budget. The top-ranked block is always kept, so a query
//! with at least one hit never produces an empty context.

use crate::models::{ChunkMetadata, ContextBundle, RetrievalResult, RetrievedChunk};

/// Listing returned when the retrieval result is empty.
pub const NO_SOURCES: &str = "No sources retrieved.";

/// Assemble the context bundle for a retrieval result.
///
/// `max_chars` bounds the summed character length of the included blocks;
/// the joining blank lines are not counted.
pub fn build_context(result: &RetrievalResult, max_chars: usize) -> ContextBundle {
    let mut blocks: Vec<String> = Vec::new();
    let mut source_lines: Vec<String> = Vec::new();
    let mut total_chars = 0usize;

    for (rank, hit) in (1..).zip(result.hits.iter()) {
        let location = location_label(&hit.metadata);
        let block = format!("[Source {}] {}\n{}", rank, location, hit.document.trim());
        let block_chars = block.chars().count();

        if !blocks.is_empty() && total_chars + block_chars > max_chars {
            break;
        }

        total_chars += block_chars;
        blocks.push(block);
        source_lines.push(source_line(rank, &location, hit));
    }

    let sources = if source_lines.is_empty() {
        NO_SOURCES.to_string()
    } else {
        source_lines.join("\n")
    };

    ContextBundle {
        context: blocks.join("\n\n"),
        sources,
        included: blocks.len(),
    }
}

/// Human-readable location: paper title (or id), plus a 1-based page.
pub fn location_label(meta: &ChunkMetadata) -> String {
    let name = non_empty(&meta.paper_title)
        .or_else(|| non_empty(&meta.paper_id))
        .unwrap_or("Unknown");
    match meta.page_idx {
        Some(page) => format!("{}, page {}", name, page + 1),
        None => name.to_string(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn source_line(rank: usize, location: &str, hit: &RetrievedChunk) -> String {
    let score = match hit.distance {
        Some(d) => format!("{:.3}", d),
        None => "n/a".to_string(),
    };
    format!("{}. {} (chunk {}, score {})", rank, location, hit.id, score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, title: &str, page: Option<i64>, text: &str, distance: f64) -> RetrievedChunk {
        RetrievedChunk {
            id: id.to_string(),
            document: text.to_string(),
            metadata: ChunkMetadata {
                paper_id: Some("paper-x".to_string()),
                paper_title: Some(title.to_string()),
                page_idx: page,
                ..Default::default()
            },
            distance: Some(distance),
        }
    }

    #[test]
    fn test_empty_result() {
        let bundle = build_context(&RetrievalResult::default(), 1000);
        assert_eq!(bundle.context, "");
        assert_eq!(bundle.sources, NO_SOURCES);
        assert_eq!(bundle.included, 0);
    }

    #[test]
    fn test_block_format_and_source_line() {
        let result = RetrievalResult {
            hits: vec![hit("p-000003", "Paper X", Some(2), "  body text \n", 0.12345)],
        };
        let bundle = build_context(&result, 1000);
        assert_eq!(bundle.context, "[Source 1] Paper X, page 3\nbody text");
        assert_eq!(
            bundle.sources,
            "1. Paper X, page 3 (chunk p-000003, score 0.123)"
        );
    }

    #[test]
    fn test_blocks_joined_by_blank_line() {
        let result = RetrievalResult {
            hits: vec![
                hit("a", "A", None, "one", 0.1),
                hit("b", "B", None, "two", 0.2),
            ],
        };
        let bundle = build_context(&result, 1000);
        assert_eq!(bundle.context, "[Source 1] A\none\n\n[Source 2] B\ntwo");
        assert_eq!(bundle.sources, "1. A (chunk a, score 0.100)\n2. B (chunk b, score 0.200)");
    }

    #[test]
    fn test_first_block_kept_over_budget() {
        let long = "x".repeat(500);
        let result = RetrievalResult {
            hits: vec![hit("a", "A", None, &long, 0.1)],
        };
        let bundle = build_context(&result, 10);
        assert_eq!(bundle.included, 1);
        assert!(bundle.context.ends_with(&long));
    }

    #[test]
    fn test_budget_stops_at_first_overflow() {
        // Each block is "[Source N] P\n" (13 chars) + 10 chars of text = 23.
        let text = "0123456789";
        let result = RetrievalResult {
            hits: vec![
                hit("a", "P", None, text, 0.1),
                hit("b", "P", None, text, 0.2),
                hit("c", "P", None, &"y".repeat(100), 0.3),
                hit("d", "P", None, "z", 0.4),
            ],
        };
        let bundle = build_context(&result, 50);
        assert_eq!(bundle.included, 2);
        assert!(!bundle.sources.contains("chunk d"));
    }

    #[test]
    fn test_budget_is_inclusive() {
        let result = RetrievalResult {
            hits: vec![hit("a", "P", None, "0123456789", 0.1), hit("b", "P", None, "0123456789", 0.2)],
        };
        assert_eq!(build_context(&result, 46).included, 2);
        assert_eq!(build_context(&result, 45).included, 1);
    }

    #[test]
    fn test_location_fallbacks() {
        let mut meta = ChunkMetadata {
            paper_id: Some("pid".to_string()),
            paper_title: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(location_label(&meta), "pid");
        meta.paper_id = None;
        assert_eq!(location_label(&meta), "Unknown");
        meta.page_idx = Some(0);
        assert_eq!(location_label(&meta), "Unknown, page 1");
    }

    #[test]
    fn test_missing_distance_is_na() {
        let mut h = hit("a", "A", None, "t", 0.0);
        h.distance = None;
        let bundle = build_context(&RetrievalResult { hits: vec![h] }, 100);
        assert_eq!(bundle.sources, "1. A (chunk a, score n/a)");
    }

    #[test]
    fn test_rank_order_preserved() {
        let hits: Vec<RetrievedChunk> = (0..6)
            .map(|i| hit(&format!("c{}", i), "T", None, "text", 0.1 * i as f64))
            .collect();
        let bundle = build_context(&RetrievalResult { hits }, 10_000);
        let ranks: Vec<String> = bundle
            .sources
            .lines()
            .map(|l| l.split('.').next().unwrap().to_string())
            .collect();
        assert_eq!(ranks, vec!["1", "2", "3", "4", "5", "6"]);
        let ids: Vec<&str> = bundle
            .sources
            .lines()
            .map(|l| l.split("chunk ").nth(1).unwrap().split(',').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["c0", "c1", "c2", "c3", "c4", "c5"]);
    }
}
