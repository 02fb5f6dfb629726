//! The three-phase query engine.
//!
//! 1. **Selection**: the provider sees the outline (titles, ids, summaries)
//!    and names the sections that look relevant.
//! 2. **Resolution**: those ids are looked up in the [`NodeIndex`]; unknown
//!    ids are skipped.
//! 3. **Synthesis**: the provider answers from the resolved sections only.
//!
//! Phases run strictly in order. The engine never mutates the tree, so one
//! engine can serve any number of concurrent queries.

use std::collections::HashSet;
use std::sync::Arc;

use docindex_outline::NodeIndex;
use docindex_reasoning::{CompletionRequest, ReasoningProvider};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::RetrievalConfig;
use crate::error::{QueryError, Result, RetrievalError};
use crate::prompt::{ANSWER_INSTRUCTIONS, answer_prompt, context_block, selection_prompt};
use crate::selection::Selection;

/// A section pulled into the answer context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSection {
    pub node_id: String,
    pub title: String,
    pub content: String,
    /// The section had no text, so its summary stands in.
    pub from_summary: bool,
}

/// Outcome of Phase 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Sections in `node_list` order.
    pub sections: Vec<ResolvedSection>,
    /// Identifiers that are not in the index.
    pub unresolved: Vec<String>,
    /// Repeated identifiers that were skipped.
    pub duplicates: usize,
}

impl Resolution {
    /// The answer context: each section under its title, blank-line separated.
    pub fn context(&self) -> String {
        self.sections
            .iter()
            .map(|s| context_block(&s.title, &s.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn node_ids(&self) -> Vec<String> {
        self.sections.iter().map(|s| s.node_id.clone()).collect()
    }
}

/// A successful query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub answer: String,
    /// The full Phase-1 result.
    pub selection: Selection,
    /// Identifiers whose content reached the answer, in context order.
    pub resolved: Vec<String>,
    /// Identifiers from the selection that do not exist.
    pub unresolved: Vec<String>,
}

/// Answers questions over one document tree.
pub struct RetrievalEngine {
    /// Index over the tree snapshot being queried.
    index: Arc<NodeIndex>,

    /// Reasoning provider for selection and synthesis.
    provider: Arc<dyn ReasoningProvider>,

    /// Configuration.
    config: RetrievalConfig,
}

impl RetrievalEngine {
    pub fn new(
        index: Arc<NodeIndex>,
        provider: Arc<dyn ReasoningProvider>,
        config: RetrievalConfig,
    ) -> Self {
        info!(
            "Retrieval engine ready for `{}` ({} addressable sections, provider {})",
            index.tree().doc_name(),
            index.len(),
            provider.name()
        );
        Self {
            index,
            provider,
            config,
        }
    }

    pub fn index(&self) -> &Arc<NodeIndex> {
        &self.index
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Phase 1: choose sections from the text-free outline.
    pub async fn select(&self, question: &str) -> std::result::Result<Selection, RetrievalError> {
        let outline = serde_json::to_string_pretty(&self.index.tree().metadata_view())?;
        let request = CompletionRequest::user(selection_prompt(question, &outline))
            .with_model_opt(self.config.model.as_deref())
            .with_temperature_opt(self.config.selection_temperature);

        let reply = self.provider.complete(request).await?;
        let selection = Selection::parse(&reply.content)?;

        info!("Selected {} sections: {:?}", selection.node_list.len(), selection.node_list);
        debug!(
            "Selection rationale: {}",
            truncate(&selection.thinking, self.config.thinking_log_chars)
        );
        Ok(selection)
    }

    /// Phase 2: look up selected sections. Unknown and repeated ids are
    /// skipped; this phase cannot fail.
    pub fn resolve(&self, selection: &Selection) -> Resolution {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        for node_id in &selection.node_list {
            let node_id = node_id.trim();
            if !seen.insert(node_id) {
                resolution.duplicates += 1;
                continue;
            }
            let Some(node) = self.index.get(node_id) else {
                resolution.unresolved.push(node_id.to_string());
                continue;
            };

            let from_summary = node.text.trim().is_empty();
            let content = if from_summary {
                node.summary.trim()
            } else {
                node.text.trim()
            };
            resolution.sections.push(ResolvedSection {
                node_id: node_id.to_string(),
                title: node.title.clone(),
                content: content.to_string(),
                from_summary,
            });
        }

        if !resolution.unresolved.is_empty() {
            warn!(
                "Skipped {} unknown node ids: {:?}",
                resolution.unresolved.len(),
                resolution.unresolved
            );
        }
        debug!(
            "Resolved {} sections ({} chars of context)",
            resolution.sections.len(),
            resolution.context().len()
        );
        resolution
    }

    /// Phase 3: answer strictly from `context`.
    pub async fn answer(
        &self,
        question: &str,
        context: &str,
    ) -> std::result::Result<String, RetrievalError> {
        let request = CompletionRequest::user(answer_prompt(question, context))
            .with_system(ANSWER_INSTRUCTIONS)
            .with_model_opt(self.config.model.as_deref())
            .with_temperature(self.config.answer_temperature);

        let reply = self.provider.complete(request).await?;
        Ok(reply.content.trim().to_string())
    }

    /// Run all three phases for `question`.
    pub async fn query(&self, question: &str) -> Result<QueryOutcome> {
        debug!("Processing query: {question}");

        let selection = self
            .select(question)
            .await
            .map_err(QueryError::selection_failed)?;

        let resolution = self.resolve(&selection);

        let answer = match self.answer(question, &resolution.context()).await {
            Ok(answer) => answer,
            Err(e) => return Err(QueryError::synthesis_failed(selection, e)),
        };

        info!(
            "Answered from {} sections ({} unresolved)",
            resolution.sections.len(),
            resolution.unresolved.len()
        );
        Ok(QueryOutcome {
            answer,
            resolved: resolution.node_ids(),
            unresolved: resolution.unresolved,
            selection,
        })
    }
}

/// Answer `question` over `index` in one call.
pub async fn query(
    index: Arc<NodeIndex>,
    provider: Arc<dyn ReasoningProvider>,
    config: RetrievalConfig,
    question: &str,
) -> Result<QueryOutcome> {
    RetrievalEngine::new(index, provider, config)
        .query(question)
        .await
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }

    #[test]
    fn test_context_joins_sections_with_blank_lines() {
        let resolution = Resolution {
            sections: vec![
                ResolvedSection {
                    node_id: "0002".to_string(),
                    title: "Payment".to_string(),
                    content: "Net 30.".to_string(),
                    from_summary: false,
                },
                ResolvedSection {
                    node_id: "0001".to_string(),
                    title: "Scope".to_string(),
                    content: "Covers the bridge.".to_string(),
                    from_summary: true,
                },
            ],
            unresolved: Vec::new(),
            duplicates: 0,
        };

        assert_eq!(
            resolution.context(),
            "### Payment\nNet 30.\n\n### Scope\nCovers the bridge."
        );
        assert_eq!(resolution.node_ids(), vec!["0002", "0001"]);
    }
}
