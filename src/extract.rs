//! Text extraction for structured content items.
//!
//! Each content item of a paper's content list is turned into normalized
//! plain text according to its type tag. Extraction is a pure function:
//! the document builder decides what to keep.

use crate::models::{ContentItem, ContentKind};

/// Normalized text extracted from a content item, with its original tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub text: String,
    pub kind: String,
}

/// Extract normalized text from one content item.
///
/// Returns `None` when the item carries no usable text after
/// normalization.
pub fn extract_text(item: &ContentItem) -> Option<ExtractedText> {
    let raw = match item.kind() {
        ContentKind::Text | ContentKind::Equation => item.text.clone().unwrap_or_default(),
        ContentKind::List => render_list(&item.list_items),
        ContentKind::Code => render_code(&item.code_caption, item.code_body.as_deref()),
        ContentKind::Image => render_image(&item.image_caption, &item.image_footnote),
        ContentKind::Other(_) => item.text.clone().unwrap_or_default(),
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return None;
    }
    Some(ExtractedText {
        text,
        kind: item.tag().to_string(),
    })
}

/// Collapse horizontal whitespace, trim every line, and drop blank lines.
pub fn normalize_whitespace(text: &str) -> String {
    text.split(is_line_break)
        .map(collapse_horizontal)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn collapse_horizontal(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut in_run = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            if !in_run {
                out.push(' ');
                in_run = true;
            }
        } else {
            out.push(c);
            in_run = false;
        }
    }
    out.trim().to_string()
}

fn render_list(entries: &[String]) -> String {
    let mut lines = Vec::new();
    for entry in entries {
        // One bullet per entry, even if the extractor split it over lines.
        let entry = entry
            .split(is_line_break)
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if entry.is_empty() {
            continue;
        }
        if entry.starts_with('-') || entry.starts_with('*') {
            lines.push(entry);
        } else {
            lines.push(format!("- {}", entry));
        }
    }
    lines.join("\n")
}

fn render_code(captions: &[String], body: Option<&str>) -> String {
    let mut parts = Vec::new();
    let captions: Vec<&str> = captions
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !captions.is_empty() {
        parts.push(captions.join(" "));
    }
    if let Some(body) = body {
        if !body.trim().is_empty() {
            parts.push(body.to_string());
        }
    }
    parts.join("\n")
}

fn render_image(captions: &[String], footnotes: &[String]) -> String {
    captions
        .iter()
        .chain(footnotes.iter())
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> ContentItem {
        ContentItem::from_value(&value)
    }

    #[test]
    fn test_text_item_normalized() {
        let out = extract_text(&item(json!({
            "type": "text",
            "text": "  We   propose\t\ta new\n\n   architecture.  "
        })))
        .unwrap();
        assert_eq!(out.text, "We propose a new\narchitecture.");
        assert_eq!(out.kind, "text");
    }

    #[test]
    fn test_whitespace_only_text_is_none() {
        assert!(extract_text(&item(json!({"type": "text", "text": " \n\t \r\n"}))).is_none());
    }

    #[test]
    fn test_list_bullets() {
        let out = extract_text(&item(json!({
            "type": "list",
            "list_items": ["first", "  ", "- already", "* starred", "  spaced   out  "]
        })))
        .unwrap();
        assert_eq!(out.text, "- first\n- already\n* starred\n- spaced out");
    }

    #[test]
    fn test_list_multiline_entry_stays_one_bullet() {
        let out = extract_text(&item(json!({
            "type": "list",
            "list_items": ["line one\nline two"]
        })))
        .unwrap();
        assert_eq!(out.text, "- line one line two");
    }

    #[test]
    fn test_list_lines_start_with_dash() {
        let entries = vec!["alpha", "beta gamma", "  delta\tepsilon ", "x"];
        let out = extract_text(&item(json!({"type": "list", "list_items": entries}))).unwrap();
        for line in out.text.lines() {
            assert!(line.starts_with('-'), "line without dash: {:?}", line);
        }
    }

    #[test]
    fn test_empty_list_is_none() {
        assert!(extract_text(&item(json!({"type": "list", "list_items": ["", "   "]}))).is_none());
        assert!(extract_text(&item(json!({"type": "list"}))).is_none());
    }

    #[test]
    fn test_equation_verbatim() {
        let out = extract_text(&item(json!({
            "type": "equation",
            "text": "$$ E = mc^2 $$"
        })))
        .unwrap();
        assert_eq!(out.text, "$$ E = mc^2 $$");
        assert_eq!(out.kind, "equation");
    }

    #[test]
    fn test_code_caption_and_body() {
        let out = extract_text(&item(json!({
            "type": "code",
            "code_caption": ["Algorithm 1", "", " Training loop "],
            "code_body": "for x in data:\n    step(x)"
        })))
        .unwrap();
        assert_eq!(
            out.text,
            "Algorithm 1 Training loop\nfor x in data:\nstep(x)"
        );
    }

    #[test]
    fn test_code_blank_body_only_caption() {
        let out = extract_text(&item(json!({
            "type": "code",
            "code_caption": ["Listing 2"],
            "code_body": "   \n  "
        })))
        .unwrap();
        assert_eq!(out.text, "Listing 2");
    }

    #[test]
    fn test_image_captions_and_footnotes() {
        let out = extract_text(&item(json!({
            "type": "image",
            "img_path": "images/fig1.jpg",
            "image_caption": ["Figure 1: Model overview", ""],
            "image_footnote": ["  Best viewed in color. "]
        })))
        .unwrap();
        assert_eq!(
            out.text,
            "Figure 1: Model overview\nBest viewed in color."
        );
    }

    #[test]
    fn test_image_without_captions_is_none() {
        assert!(extract_text(&item(json!({"type": "image", "img_path": "a.jpg"}))).is_none());
    }

    #[test]
    fn test_unknown_type_uses_text_field() {
        let out = extract_text(&item(json!({"type": "table", "text": "a  b"}))).unwrap();
        assert_eq!(out.text, "a b");
        assert_eq!(out.kind, "table");
        assert!(extract_text(&item(json!({"type": "table", "table_body": "<tr>"}))).is_none());
    }

    #[test]
    fn test_missing_type_is_unknown() {
        let out = extract_text(&item(json!({"text": "orphan text"}))).unwrap();
        assert_eq!(out.kind, "unknown");
    }

    #[test]
    fn test_normalized_output_has_no_blank_lines_or_double_spaces() {
        let samples = [
            "a  b\n\n\nc",
            "\t\tindent\r\n  \r\nend  ",
            "x \t y\u{2028}\u{2028}z",
        ];
        for sample in samples {
            let out = normalize_whitespace(sample);
            assert!(!out.contains("  "), "double space in {:?}", out);
            for line in out.split('\n') {
                assert!(!line.trim().is_empty(), "blank line in {:?}", out);
            }
        }
    }
}
