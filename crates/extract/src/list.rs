//! List extraction from free-form model output.
//!
//! Text that starts with a number followed by `.`, whitespace or end of
//! input is treated as a numbered list; anything else is split into one item
//! per non-blank line.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Top-level shape check: digits, then a dot, whitespace, or end of input.
static NUMBERED_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.|\s|$)").expect("valid shape regex"));

/// Item marker at the start of a line: digits plus `.`, `)`, `/`, blanks, or end of line.
static ITEM_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\d{1,9})(?:[.)/][ \t]*|[ \t]+|$)").expect("valid marker regex")
});

/// One extracted list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ListItem {
    Plain { text: String },
    /// `index` is the number written in the source, not the position
    Numbered { index: u32, text: String },
}

impl ListItem {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Numbered { text, .. } => text,
        }
    }

    pub fn index(&self) -> Option<u32> {
        match self {
            Self::Plain { .. } => None,
            Self::Numbered { index, .. } => Some(*index),
        }
    }

    pub fn is_numbered(&self) -> bool {
        matches!(self, Self::Numbered { .. })
    }
}

/// Stateless list extractor.
pub struct ListExtractor;

impl ListExtractor {
    /// Extract items, auto-detecting numbered versus line-delimited input.
    pub fn extract(text: &str) -> Vec<ListItem> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let normalized = normalize_newlines(trimmed);
        let items = if NUMBERED_SHAPE.is_match(&normalized) {
            extract_numbered_items(&normalized)
        } else {
            normalized
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(|line| ListItem::Plain {
                    text: line.to_string(),
                })
                .collect()
        };

        tracing::debug!(count = items.len(), "Extracted list items");
        items
    }

    /// Extract only numbered items; empty when the text is not a numbered list.
    pub fn extract_numbered(text: &str) -> Vec<ListItem> {
        Self::extract(text)
            .into_iter()
            .filter(ListItem::is_numbered)
            .collect()
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

fn extract_numbered_items(text: &str) -> Vec<ListItem> {
    let markers: Vec<(usize, usize, u32)> = ITEM_MARKER
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let index = caps.get(1)?.as_str().parse().ok()?;
            Some((whole.start(), whole.end(), index))
        })
        .collect();

    markers
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start, index))| {
            let body_end = markers
                .get(i + 1)
                .map(|&(next_start, _, _)| next_start)
                .unwrap_or(text.len());
            ListItem::Numbered {
                index,
                text: text[body_start..body_end].trim().to_string(),
            }
        })
        .collect()
}
