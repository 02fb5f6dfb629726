//! Subcommand implementations.
//!
//! Each command takes its inputs explicitly, including the reasoning
//! provider, and returns the text to print on stdout.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use docindex_outline::{
    BuildOptions, BuildStrategy, DocumentTree, HeadingNormalizer, NodeIndex, NormalizerConfig,
    TreeStore, build_tree, doc_name_from_path, extract_text, read_tree, write_tree,
};
use docindex_reasoning::ReasoningProvider;
use docindex_retrieval::{QueryOutcome, RetrievalConfig, RetrievalEngine};
use tracing::{info, warn};

/// Extract `input` and promote emphasized title lines to headings.
///
/// The normalized text goes to `output` when given, otherwise it is returned
/// for stdout.
pub fn normalize(input: &Path, output: Option<&Path>, config: NormalizerConfig) -> Result<String> {
    let text = extract_text(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let normalized = HeadingNormalizer::new(config).normalize(&text);

    let summary = format!(
        "Promoted {} of {} headings",
        normalized.promoted, normalized.total_headings
    );
    match output {
        Some(path) => {
            std::fs::write(path, &normalized.text)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(format!("{summary}; wrote {}\n", path.display()))
        }
        None => {
            info!("{summary}");
            Ok(normalized.text)
        }
    }
}

/// Arguments of `docindex build`, after flags are merged over the config.
pub struct BuildRequest<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub strategy: BuildStrategy,
    pub normalize: bool,
    pub options: BuildOptions,
    pub normalizer: NormalizerConfig,
}

/// Build a tree for `input` and save it.
///
/// Without an explicit output the tree is saved next to the input as
/// `<stem>_tree.json`.
pub async fn build(
    request: BuildRequest<'_>,
    provider: Option<Arc<dyn ReasoningProvider>>,
) -> Result<(DocumentTree, PathBuf)> {
    let input = request.input;
    let mut text =
        extract_text(input).with_context(|| format!("Failed to read {}", input.display()))?;
    if request.normalize {
        text = HeadingNormalizer::new(request.normalizer).normalize(&text).text;
    }

    let doc_name = doc_name_from_path(input);
    if provider.is_none() && request.strategy == BuildStrategy::Structural {
        warn!("No reasoning provider configured; summaries will be extracted from section text");
    }

    let tree = build_tree(&doc_name, &text, request.strategy, &request.options, provider)
        .await
        .with_context(|| format!("Failed to build a tree for {}", input.display()))?;

    let path = match request.output {
        Some(path) => {
            write_tree(path, &tree)?;
            path.to_path_buf()
        }
        None => {
            let dir = input.parent().unwrap_or_else(|| Path::new("."));
            TreeStore::new(dir).save(&tree)?
        }
    };
    Ok((tree, path))
}

/// Outline and statistics of a saved tree.
pub fn inspect(path: &Path) -> Result<String> {
    let tree = read_tree(path).with_context(|| format!("Failed to load tree {}", path.display()))?;
    Ok(render_inspection(&tree))
}

fn render_inspection(tree: &DocumentTree) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Document: {}", tree.doc_name());
    if !tree.doc_description().is_empty() {
        let _ = writeln!(out, "Description: {}", tree.doc_description());
    }
    let _ = writeln!(
        out,
        "Nodes: {} ({} leaves, {} top-level, max depth {})",
        tree.node_count(),
        tree.leaf_count(),
        tree.structure().len(),
        tree.max_depth()
    );
    let text_chars: usize = tree.iter().map(|(_, node)| node.text.len()).sum();
    let summarized = tree.iter().filter(|(_, node)| !node.summary.is_empty()).count();
    let _ = writeln!(out, "Text: {text_chars} chars; {summarized} nodes summarized");
    out.push('\n');
    out.push_str(&tree.to_outline());
    out
}

/// Answer `question` from a saved tree.
pub async fn query(
    tree_path: &Path,
    question: &str,
    config: RetrievalConfig,
    provider: Arc<dyn ReasoningProvider>,
) -> Result<QueryOutcome> {
    let tree =
        read_tree(tree_path).with_context(|| format!("Failed to load tree {}", tree_path.display()))?;
    let engine = RetrievalEngine::new(Arc::new(NodeIndex::new(Arc::new(tree))), provider, config);

    match engine.query(question).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            if let Some(selection) = &err.selection {
                warn!("Selected before failure: {:?}", selection.node_list);
            }
            Err(err).context("Query failed")
        }
    }
}

pub fn render_outcome(outcome: &QueryOutcome, show_thinking: bool) -> String {
    let mut out = String::new();
    if show_thinking && !outcome.selection.thinking.is_empty() {
        let _ = writeln!(out, "Thinking: {}\n", outcome.selection.thinking.trim());
    }
    let _ = writeln!(out, "{}", outcome.answer);
    out.push('\n');
    if outcome.resolved.is_empty() {
        let _ = writeln!(out, "Sources: none");
    } else {
        let _ = writeln!(out, "Sources: {}", outcome.resolved.join(", "));
    }
    if !outcome.unresolved.is_empty() {
        let _ = writeln!(out, "Unknown ids: {}", outcome.unresolved.join(", "));
    }
    out
}
