//! Nested record form of a document tree.
//!
//! This is the canonical persisted shape and also the schema handed to the
//! reasoning collaborator. Leaves carry no `children` key at all.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One section in nested form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SectionRecord {
    /// Short human-readable label.
    pub title: String,

    /// Zero-padded pre-order identifier ("0001", "0002", ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_id: String,

    /// 1-3 sentence description of this section's own content.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub summary: String,

    /// Literal text owned by this section, excluding its children's text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    /// Best-effort 1-based starting line in the source.
    #[serde(default)]
    pub line_num: usize,

    /// Subsections in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SectionRecord>,
}

impl SectionRecord {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_line(mut self, line_num: usize) -> Self {
        self.line_num = line_num;
        self
    }

    pub fn with_children(mut self, children: Vec<SectionRecord>) -> Self {
        self.children = children;
        self
    }

    /// Own text followed by every descendant's text, in document order.
    pub fn subtree_text(&self) -> String {
        let mut out = self.text.clone();
        for child in &self.children {
            out.push_str(&child.subtree_text());
        }
        out
    }

    /// Merge every descendant's text into this node and drop the children.
    pub fn absorb_children(&mut self) {
        let children = std::mem::take(&mut self.children);
        for child in &children {
            self.text.push_str(&child.subtree_text());
        }
    }
}

/// A whole tree in nested form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TreeRecord {
    /// Source document name (derived from the file name).
    pub doc_name: String,

    /// 2-4 sentence description of the whole document.
    #[serde(default)]
    pub doc_description: String,

    /// Top-level sections.
    pub structure: Vec<SectionRecord>,
}

/// Rough token estimate used for thresholds.
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / 4
}

/// Number of sections in `nodes`, recursively.
pub fn count_nodes(nodes: &[SectionRecord]) -> usize {
    nodes.iter().map(|n| 1 + count_nodes(&n.children)).sum()
}

/// Collapse sections nested deeper than `max_depth` into their deepest
/// allowed ancestor. Text is moved, never dropped. Returns the number of
/// sections that were folded away.
pub fn fold_beyond_depth(nodes: &mut [SectionRecord], max_depth: usize) -> usize {
    fold_at(nodes, 1, max_depth.max(1))
}

fn fold_at(nodes: &mut [SectionRecord], depth: usize, max_depth: usize) -> usize {
    let mut folded = 0;
    for node in nodes {
        if depth >= max_depth {
            folded += count_nodes(&node.children);
            node.absorb_children();
        } else {
            folded += fold_at(&mut node.children, depth + 1, max_depth);
        }
    }
    folded
}

/// Collapse any subtree whose total estimated size is below `min_tokens`
/// into a single leaf. Returns the number of sections folded away.
pub fn thin(nodes: &mut [SectionRecord], min_tokens: usize) -> usize {
    let mut folded = 0;
    for node in nodes {
        if node.children.is_empty() {
            continue;
        }
        if estimate_tokens(&node.subtree_text()) < min_tokens {
            folded += count_nodes(&node.children);
            node.absorb_children();
        } else {
            folded += thin(&mut node.children, min_tokens);
        }
    }
    folded
}

/// Minimum identifier width.
pub const ID_WIDTH: usize = 4;

/// Number sections `0001`, `0002`, ... in pre-order.
///
/// All identifiers in one tree share a width wide enough for the largest
/// number, so lexicographic order stays pre-order past `9999`.
pub fn assign_ids(nodes: &mut [SectionRecord]) {
    let width = count_nodes(nodes).to_string().len().max(ID_WIDTH);
    let mut next = 1;
    assign_from(nodes, width, &mut next);
}

fn assign_from(nodes: &mut [SectionRecord], width: usize, next: &mut usize) {
    for node in nodes {
        node.node_id = format!("{:0width$}", *next);
        *next += 1;
        assign_from(&mut node.children, width, next);
    }
}

/// Visit every section in pre-order.
pub fn for_each_mut(nodes: &mut [SectionRecord], f: &mut impl FnMut(&mut SectionRecord)) {
    for node in nodes {
        f(node);
        for_each_mut(&mut node.children, f);
    }
}

/// Identifiers in pre-order.
pub fn collect_ids(nodes: &[SectionRecord]) -> Vec<String> {
    let mut ids = Vec::new();
    collect_ids_into(nodes, &mut ids);
    ids
}

fn collect_ids_into(nodes: &[SectionRecord], ids: &mut Vec<String>) {
    for node in nodes {
        ids.push(node.node_id.clone());
        collect_ids_into(&node.children, ids);
    }
}
