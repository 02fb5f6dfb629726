//! Tree construction.
//!
//! Two interchangeable strategies produce the same [`DocumentTree`] contract:
//!
//! - [`StructuralTreeBuilder`]: deterministic, driven by ATX heading markers
//! - [`ReasoningTreeBuilder`]: asks a reasoning provider to outline the text
//!
//! Both run the result through the same finishing pass (depth folding,
//! optional thinning, summaries, identifiers), so options mean the same thing
//! whichever strategy the caller picks. There is no fallback between them.

mod reasoning;
mod structural;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use docindex_reasoning::ReasoningProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use reasoning::ReasoningTreeBuilder;
pub use structural::StructuralTreeBuilder;

use crate::error::{Result, TreeError};
use crate::record::{self, TreeRecord};
use crate::summary::Summarizer;
use crate::tree::{DocumentTree, MAX_DEPTH};

/// Which construction strategy to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStrategy {
    /// Header-driven and deterministic.
    #[default]
    Structural,
    /// Semantic, delegated to a reasoning provider.
    Reasoning,
}

impl fmt::Display for BuildStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStrategy::Structural => write!(f, "structural"),
            BuildStrategy::Reasoning => write!(f, "reasoning"),
        }
    }
}

impl FromStr for BuildStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "structural" | "header" | "headers" => Ok(BuildStrategy::Structural),
            "reasoning" | "llm" | "semantic" => Ok(BuildStrategy::Reasoning),
            other => Err(format!(
                "unknown strategy `{other}` (expected `structural` or `reasoning`)"
            )),
        }
    }
}

/// Options shared by both strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Give every section a summary.
    pub add_node_summary: bool,

    /// Generate a description of the whole document.
    pub add_doc_description: bool,

    /// Keep each section's literal text in the tree.
    pub add_node_text: bool,

    /// Number sections `0001`, `0002`, ... in pre-order.
    pub add_node_id: bool,

    /// Collapse subtrees smaller than this many estimated tokens into a
    /// single leaf. `None` keeps every section.
    pub min_token_threshold: Option<usize>,

    /// Sections with less own text than this many estimated tokens use the
    /// text itself as the summary instead of asking the provider.
    pub summary_token_threshold: usize,

    /// Nesting cap, at most [`MAX_DEPTH`].
    pub max_depth: usize,

    /// Model override for reasoning calls made while building.
    pub model: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            add_node_summary: true,
            add_doc_description: true,
            add_node_text: true,
            add_node_id: true,
            min_token_threshold: None,
            summary_token_threshold: 200,
            max_depth: MAX_DEPTH,
            model: None,
        }
    }
}

impl BuildOptions {
    /// Options that make no reasoning calls: no summaries, no description.
    pub fn outline_only() -> Self {
        Self {
            add_node_summary: false,
            add_doc_description: false,
            ..Self::default()
        }
    }

    pub fn with_min_token_threshold(mut self, threshold: usize) -> Self {
        self.min_token_threshold = Some(threshold);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A tree construction strategy.
#[async_trait]
pub trait TreeBuilder: Send + Sync {
    fn strategy(&self) -> BuildStrategy;

    /// Build the tree for `text`. `doc_name` is used verbatim.
    async fn build(&self, doc_name: &str, text: &str, options: &BuildOptions)
    -> Result<DocumentTree>;
}

/// Build a tree with the given strategy.
///
/// The reasoning strategy requires a provider. The structural strategy uses
/// one for summaries when given, and falls back to extracted summaries
/// otherwise.
pub async fn build_tree(
    doc_name: &str,
    text: &str,
    strategy: BuildStrategy,
    options: &BuildOptions,
    provider: Option<Arc<dyn ReasoningProvider>>,
) -> Result<DocumentTree> {
    let builder: Box<dyn TreeBuilder> = match strategy {
        BuildStrategy::Structural => {
            let builder = StructuralTreeBuilder::new();
            Box::new(match provider {
                Some(provider) => builder.with_provider(provider),
                None => builder,
            })
        }
        BuildStrategy::Reasoning => {
            let provider = provider.ok_or(TreeError::ProviderRequired { strategy })?;
            Box::new(ReasoningTreeBuilder::new(provider))
        }
    };
    builder.build(doc_name, text, options).await
}

/// The finishing pass both strategies share.
pub(crate) async fn finish(
    mut record: TreeRecord,
    options: &BuildOptions,
    summarizer: &Summarizer<'_>,
) -> Result<DocumentTree> {
    let max_depth = options.max_depth.clamp(1, MAX_DEPTH);
    let folded = record::fold_beyond_depth(&mut record.structure, max_depth);
    if folded > 0 {
        debug!("Folded {folded} sections nested deeper than {max_depth} levels");
    }

    if let Some(min_tokens) = options.min_token_threshold {
        let thinned = record::thin(&mut record.structure, min_tokens);
        debug!("Thinned {thinned} sections below {min_tokens} tokens");
    }

    if options.add_node_summary {
        summarizer.summarize_sections(&mut record.structure).await?;
    } else {
        record::for_each_mut(&mut record.structure, &mut |n| n.summary.clear());
    }

    if options.add_node_id {
        record::assign_ids(&mut record.structure);
    } else {
        record::for_each_mut(&mut record.structure, &mut |n| n.node_id.clear());
    }

    if !options.add_doc_description {
        record.doc_description.clear();
    } else if record.doc_description.trim().is_empty() {
        record.doc_description = summarizer.describe_document(&record).await?;
    }

    if !options.add_node_text {
        record::for_each_mut(&mut record.structure, &mut |n| n.text.clear());
    }

    let tree = DocumentTree::from_record(record)?;
    info!(
        "Built tree for `{}` with {} sections ({} top-level, depth {})",
        tree.doc_name(),
        tree.node_count(),
        tree.structure().len(),
        tree.max_depth()
    );
    Ok(tree)
}
