//! Arena-backed document tree.
//!
//! Sections live by value in a flat vector in pre-order; children are held
//! as [`NodeRef`] indices into that vector. The tree is built once and then
//! only read. Serialization goes through the nested [`TreeRecord`] form.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TreeError};
use crate::record::{SectionRecord, TreeRecord};

/// Maximum nesting depth of a tree, counting top-level sections as depth 1.
pub const MAX_DEPTH: usize = 4;

/// Index of a section inside its [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(usize);

impl NodeRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One section of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNode {
    pub title: String,
    pub node_id: String,
    pub summary: String,
    /// Literal text owned by this section only.
    pub text: String,
    pub line_num: usize,
    /// 1 for top-level sections.
    pub depth: usize,
    children: Vec<NodeRef>,
}

impl SectionNode {
    /// Child references in document order.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// The hierarchical outline of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TreeRecord", into = "TreeRecord")]
pub struct DocumentTree {
    doc_name: String,
    doc_description: String,
    nodes: Vec<SectionNode>,
    structure: Vec<NodeRef>,
}

impl DocumentTree {
    /// Build and validate a tree from its nested form.
    pub fn from_record(record: TreeRecord) -> Result<Self> {
        let mut tree = Self {
            doc_name: record.doc_name,
            doc_description: record.doc_description,
            nodes: Vec::new(),
            structure: Vec::new(),
        };
        tree.structure = tree.push_all(record.structure, 1);
        tree.validate()?;
        Ok(tree)
    }

    fn push_all(&mut self, records: Vec<SectionRecord>, depth: usize) -> Vec<NodeRef> {
        let mut refs = Vec::with_capacity(records.len());
        for record in records {
            let node_ref = NodeRef(self.nodes.len());
            self.nodes.push(SectionNode {
                title: record.title,
                node_id: record.node_id,
                summary: record.summary,
                text: record.text,
                line_num: record.line_num,
                depth,
                children: Vec::new(),
            });
            let children = self.push_all(record.children, depth + 1);
            self.nodes[node_ref.0].children = children;
            refs.push(node_ref);
        }
        refs
    }

    /// Check the structural invariants: non-empty titles, depth bound, and
    /// identifiers that are unique and ascend in pre-order (or are absent
    /// throughout).
    pub fn validate(&self) -> Result<()> {
        if let Some(node) = self.nodes.iter().find(|n| n.title.trim().is_empty()) {
            return Err(TreeError::InvalidTree(format!(
                "section at line {} has an empty title",
                node.line_num
            )));
        }
        if let Some(node) = self.nodes.iter().find(|n| n.depth > MAX_DEPTH) {
            return Err(TreeError::InvalidTree(format!(
                "section `{}` is nested {} levels deep (max {MAX_DEPTH})",
                node.title, node.depth
            )));
        }

        let with_ids = self.nodes.iter().filter(|n| !n.node_id.is_empty()).count();
        if with_ids == 0 {
            return Ok(());
        }
        if with_ids != self.nodes.len() {
            return Err(TreeError::InvalidTree(
                "some sections have identifiers and some do not".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.node_id.as_str()) {
                return Err(TreeError::InvalidTree(format!(
                    "duplicate node id `{}`",
                    node.node_id
                )));
            }
        }
        for pair in self.nodes.windows(2) {
            if pair[0].node_id >= pair[1].node_id {
                return Err(TreeError::InvalidTree(format!(
                    "node id `{}` follows `{}` out of document order",
                    pair[1].node_id, pair[0].node_id
                )));
            }
        }
        Ok(())
    }

    pub fn doc_name(&self) -> &str {
        &self.doc_name
    }

    pub fn doc_description(&self) -> &str {
        &self.doc_description
    }

    /// Top-level sections in document order.
    pub fn structure(&self) -> &[NodeRef] {
        &self.structure
    }

    pub fn node(&self, node_ref: NodeRef) -> &SectionNode {
        &self.nodes[node_ref.0]
    }

    pub fn get(&self, node_ref: NodeRef) -> Option<&SectionNode> {
        self.nodes.get(node_ref.0)
    }

    /// Every section with its reference, in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeRef, &SectionNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeRef(i), n))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Every section's own text in pre-order. For a tree built with node text
    /// this reconstructs the source document.
    pub fn concatenated_text(&self) -> String {
        self.nodes.iter().map(|n| n.text.as_str()).collect()
    }

    /// Nested form of the whole tree.
    pub fn to_record(&self) -> TreeRecord {
        TreeRecord {
            doc_name: self.doc_name.clone(),
            doc_description: self.doc_description.clone(),
            structure: self.records(&self.structure, true),
        }
    }

    /// Nested form with every section's text removed: titles, ids, summaries
    /// and line numbers only.
    pub fn metadata_view(&self) -> TreeRecord {
        TreeRecord {
            doc_name: self.doc_name.clone(),
            doc_description: self.doc_description.clone(),
            structure: self.records(&self.structure, false),
        }
    }

    fn records(&self, refs: &[NodeRef], with_text: bool) -> Vec<SectionRecord> {
        refs.iter()
            .map(|&r| {
                let node = self.node(r);
                SectionRecord {
                    title: node.title.clone(),
                    node_id: node.node_id.clone(),
                    summary: node.summary.clone(),
                    text: if with_text {
                        node.text.clone()
                    } else {
                        String::new()
                    },
                    line_num: node.line_num,
                    children: self.records(&node.children, with_text),
                }
            })
            .collect()
    }

    /// Indented table of contents, one section per line.
    pub fn to_outline(&self) -> String {
        let mut out = String::new();
        for (_, node) in self.iter() {
            let indent = "  ".repeat(node.depth - 1);
            if node.node_id.is_empty() {
                out.push_str(&format!("{indent}{} (line {})\n", node.title, node.line_num));
            } else {
                out.push_str(&format!(
                    "{indent}[{}] {} (line {})\n",
                    node.node_id, node.title, node.line_num
                ));
            }
        }
        out
    }

    /// Serialize to pretty JSON in the canonical nested form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate the canonical nested form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl TryFrom<TreeRecord> for DocumentTree {
    type Error = TreeError;

    fn try_from(record: TreeRecord) -> Result<Self> {
        Self::from_record(record)
    }
}

impl From<DocumentTree> for TreeRecord {
    fn from(tree: DocumentTree) -> Self {
        tree.to_record()
    }
}
