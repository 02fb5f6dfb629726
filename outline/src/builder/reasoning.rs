//! Reasoning-driven tree construction.

use std::sync::Arc;

use async_trait::async_trait;
use docindex_reasoning::{CompletionRequest, OutputSchema, ReasoningProvider};
use tracing::{debug, info, warn};

use super::{BuildOptions, BuildStrategy, TreeBuilder, finish};
use crate::error::{Result, TreeError};
use crate::record::{SectionRecord, TreeRecord, collect_ids, count_nodes, for_each_mut};
use crate::summary::Summarizer;
use crate::tree::DocumentTree;

const SCHEMA_NAME: &str = "document_tree";

const TREE_INSTRUCTIONS: &str = "You turn a document into a hierarchical outline of sections.

Rules:
1. Identify sections from explicit headings and from shifts in topic, even when the document has no headings at all.
2. Give every section a four-digit zero-padded node_id in depth-first order starting at \"0001\"; a parent comes before its children.
3. Nest sections at most 4 levels deep.
4. Give every section a summary of 1-3 sentences that describes what the section contains without interpreting it.
5. Every piece of the document belongs to exactly one section. A section's text is copied verbatim from the document and excludes text that belongs to its subsections, so a parent keeps only its introductory text.
6. Set line_num to your best estimate of the 1-based line where the section starts.
7. Write a doc_description of 2-4 sentences about the purpose of the whole document.

Leave out children for sections without subsections.";

/// Builds trees by asking a reasoning provider for a schema-constrained
/// outline, then validating and normalizing what comes back.
pub struct ReasoningTreeBuilder {
    provider: Arc<dyn ReasoningProvider>,
}

impl ReasoningTreeBuilder {
    pub fn new(provider: Arc<dyn ReasoningProvider>) -> Self {
        Self { provider }
    }

    async fn request_outline(
        &self,
        doc_name: &str,
        text: &str,
        options: &BuildOptions,
    ) -> Result<TreeRecord> {
        let strategy = self.strategy();
        let schema = OutputSchema::for_type::<TreeRecord>(SCHEMA_NAME)
            .map_err(|e| TreeError::from_reasoning(strategy, e))?;

        let request =
            CompletionRequest::user(format!("Document name: {doc_name}\n\nDocument:\n{text}"))
                .with_system(TREE_INSTRUCTIONS)
                .with_model_opt(options.model.as_deref());

        debug!(
            "Requesting outline for `{doc_name}` ({} chars) from {}",
            text.len(),
            self.provider.name()
        );
        let value = self
            .provider
            .complete_structured(request, &schema)
            .await
            .map_err(|e| TreeError::from_reasoning(strategy, e))?;

        schema
            .decode(value)
            .map_err(|e| TreeError::from_reasoning(strategy, e))
    }
}

/// Reject outlines the finishing pass cannot repair.
fn check_shape(record: &TreeRecord) -> Result<()> {
    if record.structure.is_empty() {
        return Err(TreeError::SchemaViolation {
            strategy: BuildStrategy::Reasoning,
            reason: "outline has no sections".to_string(),
        });
    }
    let mut untitled = 0;
    visit(&record.structure, &mut |n| {
        if n.title.trim().is_empty() {
            untitled += 1;
        }
    });
    if untitled > 0 {
        return Err(TreeError::SchemaViolation {
            strategy: BuildStrategy::Reasoning,
            reason: format!("{untitled} sections have an empty title"),
        });
    }
    Ok(())
}

fn visit(nodes: &[SectionRecord], f: &mut impl FnMut(&SectionRecord)) {
    for node in nodes {
        f(node);
        visit(&node.children, f);
    }
}

/// Anchor section line numbers to where their text occurs in `source` and
/// return how many sections have text that does not occur there at all.
///
/// Sections are matched in pre-order, each searching after the previous
/// match, so repeated passages anchor to successive occurrences. Text that
/// only occurs earlier is anchored there without moving the cursor.
fn anchor_to_source(nodes: &mut [SectionRecord], source: &str) -> usize {
    let mut unmatched = 0;
    let mut cursor = 0;
    for_each_mut(nodes, &mut |node| {
        let needle = node.text.trim();
        if needle.is_empty() {
            return;
        }
        let offset = match source[cursor..].find(needle) {
            Some(found) => {
                let offset = cursor + found;
                cursor = offset + needle.len();
                offset
            }
            None => match source.find(needle) {
                Some(offset) => offset,
                None => {
                    unmatched += 1;
                    return;
                }
            },
        };
        node.line_num = source[..offset].matches('\n').count() + 1;
    });
    unmatched
}

#[async_trait]
impl TreeBuilder for ReasoningTreeBuilder {
    fn strategy(&self) -> BuildStrategy {
        BuildStrategy::Reasoning
    }

    async fn build(
        &self,
        doc_name: &str,
        text: &str,
        options: &BuildOptions,
    ) -> Result<DocumentTree> {
        let mut record = self.request_outline(doc_name, text, options).await?;
        check_shape(&record)?;

        if record.doc_name != doc_name {
            debug!("Replacing proposed doc_name `{}`", record.doc_name);
        }
        record.doc_name = doc_name.to_string();

        let proposed = count_nodes(&record.structure);
        info!("Reasoning outline for `{doc_name}` proposes {proposed} sections");

        let unmatched = anchor_to_source(&mut record.structure, text);
        if unmatched > 0 {
            warn!("{unmatched} of {proposed} sections have text not found verbatim in `{doc_name}`");
        }

        let proposed_ids = collect_ids(&record.structure);
        let summarizer = Summarizer::new(Some(self.provider.as_ref()), self.strategy(), options);
        let tree = finish(record, options, &summarizer).await?;

        let final_ids: Vec<&str> = tree.iter().map(|(_, n)| n.node_id.as_str()).collect();
        if options.add_node_id && final_ids != proposed_ids {
            info!("Renumbered section identifiers in pre-order for `{doc_name}`");
        }
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docindex_reasoning::ScriptedProvider;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_anchor_to_source_sets_lines_and_counts_misses() {
        let source = "first\nsecond para\nthird\n";
        let mut nodes = vec![
            SectionRecord::new("Second").with_text("second para\n").with_line(9),
            SectionRecord::new("Invented").with_text("never written"),
        ];

        let unmatched = anchor_to_source(&mut nodes, source);

        assert_eq!(unmatched, 1);
        assert_eq!(nodes[0].line_num, 2);
    }

    #[test]
    fn test_anchor_to_source_follows_repeated_passages_in_order() {
        let source = "# A\nSee the annex.\n# B\nSee the annex.\n# C\nSee the annex.\n";
        let mut nodes = vec![
            SectionRecord::new("A").with_text("See the annex.\n"),
            SectionRecord::new("B").with_text("See the annex.\n"),
            SectionRecord::new("C").with_text("See the annex.\n"),
            SectionRecord::new("Back to A").with_text("# A\n"),
        ];

        let unmatched = anchor_to_source(&mut nodes, source);

        assert_eq!(unmatched, 0);
        let lines: Vec<usize> = nodes.iter().map(|n| n.line_num).collect();
        assert_eq!(lines, vec![2, 4, 6, 1]);
    }

    #[test]
    fn test_check_shape_rejects_empty_outline() {
        let err = check_shape(&TreeRecord::default()).unwrap_err();
        assert!(matches!(err, TreeError::SchemaViolation { .. }));
    }

    #[tokio::test]
    async fn test_outline_request_carries_schema_and_rules() {
        let reply = serde_json::json!({
            "doc_name": "x",
            "doc_description": "d",
            "structure": [{"title": "Only", "node_id": "0001", "summary": "s", "text": "t", "line_num": 1}]
        });
        let provider = Arc::new(ScriptedProvider::new().with_reply(reply.to_string()));
        let builder = ReasoningTreeBuilder::new(provider.clone());

        builder
            .build("report", "t", &BuildOptions::default())
            .await
            .unwrap();

        let request = &provider.requests()[0];
        assert!(request.messages[0].content.contains("at most 4 levels"));
        assert!(request.messages[1].content.starts_with("Document name: report"));
        assert!(request.messages[2].content.contains("\"structure\""));
    }
}
