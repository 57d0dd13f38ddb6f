//! Snapshots of the change records a native observer delivers.

/// Kind of a change record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Children were added or removed.
    ChildList,
    /// An attribute changed.
    Attributes,
    /// Text content changed.
    CharacterData,
}

/// A node that was inserted into the observed subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddedNode {
    Element {
        /// Tag name as the host reports it (often upper case).
        tag_name: String,
        /// Number of immediate element children.
        child_count: usize,
    },
    Text,
    Comment,
}

impl AddedNode {
    pub fn element(tag_name: impl Into<String>, child_count: usize) -> Self {
        AddedNode::Element {
            tag_name: tag_name.into(),
            child_count,
        }
    }
}

/// One change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub added_nodes: Vec<AddedNode>,
    pub removed_nodes: usize,
}

impl MutationRecord {
    /// Nodes were added under some parent.
    pub fn child_list(added_nodes: Vec<AddedNode>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            added_nodes,
            removed_nodes: 0,
        }
    }

    /// Nodes were removed from some parent.
    pub fn removal(removed_nodes: usize) -> Self {
        Self {
            kind: MutationKind::ChildList,
            added_nodes: Vec::new(),
            removed_nodes,
        }
    }

    pub fn attributes() -> Self {
        Self {
            kind: MutationKind::Attributes,
            added_nodes: Vec::new(),
            removed_nodes: 0,
        }
    }
}

/// Records delivered together in one notification.
pub type MutationBatch = Vec<MutationRecord>;
