// Loading documents from a local file.
//
// Two formats are accepted: plain text with one document per line, and
// JSON Lines where each object carries the document text in a named field
// (the decision summaries use "ementa_text"). Records whose field is missing,
// null or not a string are skipped, as are blank lines.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

/// Field holding the decision summary in the court-decision exports.
pub const DEFAULT_TEXT_FIELD: &str = "ementa_text";

/// Load documents from `path`.
///
/// Files ending in `.jsonl`/`.ndjson` are read as JSON Lines using
/// `field` (or `DEFAULT_TEXT_FIELD`); anything else is one document per line
/// unless `field` is given.
pub fn load_documents(path: &Path, field: Option<&str>) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus file {}", path.display()))?;

    let is_jsonl = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl") | Some("ndjson")
    );

    let documents = if is_jsonl || field.is_some() {
        parse_jsonl(&content, field.unwrap_or(DEFAULT_TEXT_FIELD))?
    } else {
        parse_lines(&content)
    };

    debug!(
        path = %path.display(),
        documents = documents.len(),
        "Loaded corpus"
    );

    Ok(documents)
}

/// One document per non-blank line.
pub fn parse_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect()
}

/// One JSON object per non-blank line, text taken from `field`.
pub fn parse_jsonl(content: &str, field: &str) -> Result<Vec<String>> {
    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON on line {}", line_no + 1))?;
        match record.get(field).and_then(Value::as_str) {
            Some(text) => documents.push(text.to_string()),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped = skipped, field = field, "Skipped records without text");
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines_skips_blank() {
        let docs = parse_lines("primeira ementa\n\n  \nsegunda ementa\r\n");
        assert_eq!(docs, vec!["primeira ementa", "segunda ementa"]);
    }

    #[test]
    fn test_parse_jsonl_field() {
        let content = r#"{"ementa_text": "Dano moral."}
{"ementa_text": null}
{"other": "x"}

{"ementa_text": "Tributo."}"#;
        let docs = parse_jsonl(content, "ementa_text").unwrap();
        assert_eq!(docs, vec!["Dano moral.", "Tributo."]);
    }

    #[test]
    fn test_parse_jsonl_invalid_line() {
        let err = parse_jsonl("{not json}", "ementa_text").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("jurtopics-missing-corpus.txt");
        assert!(load_documents(&path, None).is_err());
    }
}
