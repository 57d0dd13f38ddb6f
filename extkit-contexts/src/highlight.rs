//! Finding text in the page and registering it as a named highlight.

use crate::host::{HighlightRegistry, PageDocument};
use std::ops::Range;
use std::sync::Arc;
use tracing::debug;

/// Opaque handle to a text node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// One text node and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNode {
    pub id: NodeId,
    pub text: String,
}

impl TextNode {
    pub fn new(id: usize, text: impl Into<String>) -> Self {
        Self {
            id: NodeId(id),
            text: text.into(),
        }
    }
}

/// A byte range inside one text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRange {
    pub node: NodeId,
    pub start: usize,
    pub end: usize,
}

/// What a toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightOutcome {
    /// Highlighted this many ranges.
    Applied(usize),
    /// An existing highlight was removed.
    Cleared,
    /// The text does not occur on the page.
    NotFound,
    /// Matches exist but the engine cannot highlight them.
    Unsupported(usize),
}

impl HighlightOutcome {
    pub fn matches(&self) -> usize {
        match self {
            HighlightOutcome::Applied(n) | HighlightOutcome::Unsupported(n) => *n,
            HighlightOutcome::Cleared | HighlightOutcome::NotFound => 0,
        }
    }
}

/// Finds the first occurrence of `needle` in each node.
///
/// A node contributes at most one range: an exact match if there is one,
/// otherwise a case-insensitive match.
pub fn find_ranges(nodes: &[TextNode], needle: &str) -> Vec<TextRange> {
    if needle.is_empty() {
        return Vec::new();
    }
    nodes
        .iter()
        .filter_map(|node| {
            let found = match node.text.find(needle) {
                Some(start) => Some(start..start + needle.len()),
                None => find_ignore_case(&node.text, needle),
            };
            found.map(|range| TextRange {
                node: node.id,
                start: range.start,
                end: range.end,
            })
        })
        .collect()
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    let needle: Vec<char> = needle.chars().collect();
    haystack.char_indices().find_map(|(start, _)| {
        let mut end = start;
        let mut chars = haystack[start..].chars();
        for expected in &needle {
            let c = chars.next()?;
            if !c.to_lowercase().eq(expected.to_lowercase()) {
                return None;
            }
            end += c.len_utf8();
        }
        Some(start..end)
    })
}

/// Applies and clears the extension's single named highlight.
#[derive(Clone)]
pub struct Highlighter {
    registry: Arc<dyn HighlightRegistry>,
    name: String,
}

impl Highlighter {
    pub fn new(registry: Arc<dyn HighlightRegistry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.registry.is_supported() && self.registry.has(&self.name)
    }

    /// Clears the highlight if one is showing, otherwise highlights `text`.
    pub fn toggle(&self, page: &dyn PageDocument, text: &str) -> HighlightOutcome {
        if self.is_active() {
            self.clear();
            return HighlightOutcome::Cleared;
        }
        self.apply(page, text)
    }

    /// Highlights every node containing `text`, replacing any current
    /// highlight.
    pub fn apply(&self, page: &dyn PageDocument, text: &str) -> HighlightOutcome {
        let ranges = find_ranges(&page.text_nodes(), text);
        let count = ranges.len();
        if count == 0 {
            return HighlightOutcome::NotFound;
        }
        if !self.registry.is_supported() {
            debug!("Highlight API unavailable, {} matches not shown", count);
            return HighlightOutcome::Unsupported(count);
        }
        self.registry.set(&self.name, ranges);
        HighlightOutcome::Applied(count)
    }

    pub fn clear(&self) -> bool {
        self.registry.is_supported() && self.registry.delete(&self.name)
    }
}
