//! Utilities (dataset preview, text truncation).

use std::fs;
use std::path::Path;

use anyhow::{bail, Result};

/// Read the header and the first `max_lines - 1` rows of a tabular file as raw text.
/// Non-UTF-8 bytes are replaced; long lines are cut.
pub fn read_dataset_preview(path: &Path, max_lines: usize) -> Result<String> {
    // Check if file exists
    if !path.exists() {
        bail!("Dataset file '{}' does not exist", path.display());
    }
    if !path.is_file() {
        bail!("'{}' is not a file", path.display());
    }

    let bytes = fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file '{}': {}", path.display(), e))?;
    let text = String::from_utf8_lossy(&bytes);
    let preview: Vec<String> = text
        .lines()
        .take(max_lines)
        .map(|line| truncate_chars(line.trim_end_matches('\r'), 500))
        .collect();
    if preview.is_empty() {
        bail!("Dataset file '{}' is empty", path.display());
    }
    Ok(preview.join("\n"))
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `…`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let end = text.char_indices().nth(max_chars).map_or(text.len(), |(i, _)| i);
    if end >= text.len() {
        text.to_string()
    } else {
        format!("{}…", &text[..end])
    }
}
