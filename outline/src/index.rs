//! Identifier lookup over a document tree.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::tree::{DocumentTree, NodeRef, SectionNode};

/// Read-only `node_id` → section lookup.
///
/// The index owns a shared snapshot of the tree it was built from, so it can
/// never drift from that tree. Building a new tree means building a new index.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    tree: Arc<DocumentTree>,
    by_id: HashMap<String, NodeRef>,
}

impl NodeIndex {
    /// Flatten `tree` in pre-order. Sections without an identifier are not
    /// addressable and are left out.
    pub fn new(tree: Arc<DocumentTree>) -> Self {
        let by_id: HashMap<String, NodeRef> = tree
            .iter()
            .filter(|(_, node)| !node.node_id.is_empty())
            .map(|(node_ref, node)| (node.node_id.clone(), node_ref))
            .collect();

        debug!(
            "Indexed {} of {} sections of `{}`",
            by_id.len(),
            tree.node_count(),
            tree.doc_name()
        );
        Self { tree, by_id }
    }

    /// The tree snapshot behind this index.
    pub fn tree(&self) -> &Arc<DocumentTree> {
        &self.tree
    }

    pub fn get(&self, node_id: &str) -> Option<&SectionNode> {
        self.by_id.get(node_id).map(|&r| self.tree.node(r))
    }

    pub fn contains(&self, node_id: &str) -> bool {
        self.by_id.contains_key(node_id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Indexed identifiers in document order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tree
            .iter()
            .map(|(_, node)| node.node_id.as_str())
            .filter(|id| !id.is_empty())
    }
}

impl From<DocumentTree> for NodeIndex {
    fn from(tree: DocumentTree) -> Self {
        Self::new(Arc::new(tree))
    }
}

/// Build the index for `tree`.
pub fn index(tree: Arc<DocumentTree>) -> NodeIndex {
    NodeIndex::new(tree)
}
