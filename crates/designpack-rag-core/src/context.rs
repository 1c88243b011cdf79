//! Rendering of search hits into prompt context.
//!
//! Local hits carry their full text, so each becomes a heading plus an
//! excerpt. Remote hits only carry light metadata, so each becomes a one
//! line bullet. Both renderers return an empty string for no hits.

use serde_json::Value;

use crate::chunk::truncate_chars;
use crate::models::{LocalHit, ScoredPoint};

/// Default excerpt length for local hits, in characters.
pub const SNIPPET_CHARS: usize = 800;

/// First line of remote context.
pub const REMOTE_HEADER: &str = "Top hits from Qdrant:";

/// Render local hits as `### {file} (score=…)` headings with excerpts,
/// separated by blank lines.
pub fn render_local(hits: &[LocalHit], snippet_chars: usize) -> String {
    hits.iter()
        .map(|hit| {
            let name = hit
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| hit.path.display().to_string());
            let snippet = truncate_chars(&hit.text, snippet_chars).trim();
            format!("### {} (score={:.3})\n{}", name, hit.score, snippet)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render remote hits as `- [score] uri#chunk_index` bullets under
/// [`REMOTE_HEADER`].
pub fn render_remote(hits: &[ScoredPoint]) -> String {
    if hits.is_empty() {
        return String::new();
    }
    let bullets: Vec<String> = hits
        .iter()
        .map(|hit| {
            let uri = hit
                .payload
                .get("uri")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let index = match hit.payload.get("chunk_index") {
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::String(s)) => s.clone(),
                _ => "?".to_string(),
            };
            format!("- [{:.3}] {}#{}", hit.score, uri, index)
        })
        .collect();
    format!("{}\n{}", REMOTE_HEADER, bullets.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_render_local_empty() {
        assert_eq!(render_local(&[], SNIPPET_CHARS), "");
    }

    #[test]
    fn test_render_remote_empty() {
        assert_eq!(render_remote(&[]), "");
    }

    #[test]
    fn test_render_local_heading_and_snippet() {
        let hits = vec![
            LocalHit {
                path: PathBuf::from("/kb/inbound/asn.md"),
                text: "  ASN receiving flow  ".to_string(),
                score: 0.5,
            },
            LocalHit {
                path: PathBuf::from("/kb/outbound.txt"),
                text: "w".repeat(1200),
                score: 0.12345,
            },
        ];
        let out = render_local(&hits, SNIPPET_CHARS);
        let parts: Vec<&str> = out.split("\n\n").collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "### asn.md (score=0.500)\nASN receiving flow");
        assert!(parts[1].starts_with("### outbound.txt (score=0.123)\n"));
        assert_eq!(parts[1].lines().nth(1).unwrap().len(), SNIPPET_CHARS);
    }

    #[test]
    fn test_render_remote_bullets() {
        let hits = vec![
            ScoredPoint {
                id: json!(1),
                score: 0.91234,
                payload: json!({"uri": "https://x/y", "chunk_index": 2}),
            },
            ScoredPoint {
                id: Value::Null,
                score: 0.5,
                payload: Value::Null,
            },
        ];
        assert_eq!(
            render_remote(&hits),
            "Top hits from Qdrant:\n- [0.912] https://x/y#2\n- [0.500] #?"
        );
    }
}
