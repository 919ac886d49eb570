//! Passage chunking
//!
//! The knowledge file is split wherever a line starts with the configured
//! heading delimiter. Each passage is trimmed, empty passages are dropped, and
//! document order is kept, since it becomes the retrieval index order.
//! There is no size cap: an oversized passage is passed through as-is.

use crate::error::{Error, Result};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Splits corpus text on a line-start heading delimiter
#[derive(Debug, Clone)]
pub struct Chunker {
    delimiter: String,
    pattern: Regex,
}

impl Chunker {
    /// Create a chunker for the given delimiter (e.g. `"# "`)
    pub fn new(delimiter: &str) -> Result<Self> {
        if delimiter.is_empty() {
            return Err(Error::Config("chunk delimiter must not be empty".to_string()));
        }

        let pattern = Regex::new(&format!("(?m)^{}", regex::escape(delimiter)))
            .map_err(|e| Error::Config(format!("invalid chunk delimiter: {}", e)))?;

        Ok(Self {
            delimiter: delimiter.to_string(),
            pattern,
        })
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Split content into ordered, trimmed, non-empty passages
    pub fn split(&self, content: &str) -> Vec<String> {
        self.pattern
            .split(content)
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Shorten text for log lines without splitting a grapheme
pub fn preview(text: &str, max_graphemes: usize) -> String {
    let mut graphemes = text.graphemes(true);
    let head: String = graphemes.by_ref().take(max_graphemes).collect();
    if graphemes.next().is_some() {
        format!("{}...", head.trim_end())
    } else {
        head
    }
}
