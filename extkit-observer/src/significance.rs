use crate::mutation::{AddedNode, MutationKind, MutationRecord};

/// Container tags whose insertion may count as significant.
pub const DEFAULT_SIGNIFICANT_TAGS: [&str; 8] = [
    "div", "section", "article", "main", "aside", "nav", "header", "footer",
];

/// Decides whether a batch of changes warrants re-adapting the page.
///
/// A batch is significant iff some child-list record added an element that
/// is both a container tag and has strictly more than `threshold` children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignificanceFilter {
    threshold: usize,
    tags: Vec<String>,
}

impl SignificanceFilter {
    pub fn new(threshold: usize, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            threshold,
            tags: tags.into_iter().map(|t| t.into().to_lowercase()).collect(),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether `tag_name` (any case) is a container tag.
    pub fn is_significant_tag(&self, tag_name: &str) -> bool {
        let lower = tag_name.to_lowercase();
        self.tags.iter().any(|t| *t == lower)
    }

    /// Whether a single added node qualifies.
    pub fn is_significant_node(&self, node: &AddedNode) -> bool {
        match node {
            AddedNode::Element {
                tag_name,
                child_count,
            } => self.is_significant_tag(tag_name) && *child_count > self.threshold,
            AddedNode::Text | AddedNode::Comment => false,
        }
    }

    /// Whether any record in `batch` added a qualifying node.
    pub fn is_significant(&self, batch: &[MutationRecord]) -> bool {
        batch.iter().any(|record| {
            record.kind == MutationKind::ChildList
                && record
                    .added_nodes
                    .iter()
                    .any(|node| self.is_significant_node(node))
        })
    }
}

impl Default for SignificanceFilter {
    fn default() -> Self {
        Self::new(5, DEFAULT_SIGNIFICANT_TAGS)
    }
}
