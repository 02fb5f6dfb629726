//! Section summaries and document descriptions.

use docindex_reasoning::{CompletionRequest, ReasoningProvider};
use tracing::{debug, warn};

use crate::builder::{BuildOptions, BuildStrategy};
use crate::error::{Result, TreeError};
use crate::markdown::{heading, is_fence};
use crate::record::{SectionRecord, TreeRecord, estimate_tokens, for_each_mut};

const MAX_HEURISTIC_CHARS: usize = 300;

const SECTION_SUMMARY_INSTRUCTIONS: &str = "You describe one section of a longer document. \
Write 1-3 sentences stating what the section covers. Describe the content only; do not \
interpret, evaluate, or add facts. Return the description and nothing else.";

const DOC_DESCRIPTION_INSTRUCTIONS: &str = "You are given the outline of a document as JSON: \
section titles, identifiers and summaries. Write 2-4 sentences describing the purpose and \
scope of the whole document. Return the description and nothing else.";

/// Writes summaries with a reasoning provider when one is configured and
/// falls back to extracted text otherwise.
pub struct Summarizer<'a> {
    provider: Option<&'a dyn ReasoningProvider>,
    strategy: BuildStrategy,
    token_threshold: usize,
    model: Option<&'a str>,
}

impl<'a> Summarizer<'a> {
    pub fn new(
        provider: Option<&'a dyn ReasoningProvider>,
        strategy: BuildStrategy,
        options: &'a BuildOptions,
    ) -> Self {
        Self {
            provider,
            strategy,
            token_threshold: options.summary_token_threshold,
            model: options.model.as_deref(),
        }
    }

    /// Fill in every missing section summary, in pre-order.
    pub async fn summarize_sections(&self, nodes: &mut [SectionRecord]) -> Result<()> {
        let mut pending = Vec::new();
        collect_pending(nodes, &mut pending);
        if pending.is_empty() {
            return Ok(());
        }
        if self.provider.is_none() {
            warn!(
                "No reasoning provider configured; extracting summaries for {} sections",
                pending.len()
            );
        }

        for (text, summary) in pending {
            *summary = self.summarize_section(text).await?;
        }
        Ok(())
    }

    /// Summary for one section's own text.
    pub async fn summarize_section(&self, text: &str) -> Result<String> {
        let body = text.trim();
        if body.is_empty() {
            return Ok(String::new());
        }
        if estimate_tokens(body) < self.token_threshold {
            return Ok(body.to_string());
        }
        let Some(provider) = self.provider else {
            return Ok(heuristic_summary(body));
        };

        debug!("Summarizing section of {} chars", body.len());
        let request = CompletionRequest::user(format!("Section text:\n{body}"))
            .with_system(SECTION_SUMMARY_INSTRUCTIONS)
            .with_model_opt(self.model)
            .with_temperature(0.0);
        let response = provider
            .complete(request)
            .await
            .map_err(|e| TreeError::from_reasoning(self.strategy, e))?;
        Ok(response.content.trim().to_string())
    }

    /// Description of the whole document, written from its outline.
    pub async fn describe_document(&self, record: &TreeRecord) -> Result<String> {
        let Some(provider) = self.provider else {
            warn!("No reasoning provider configured; using an outline-based description");
            return Ok(heuristic_description(record));
        };

        let mut outline = record.clone();
        for_each_mut(&mut outline.structure, &mut |n| n.text.clear());
        let outline_json = serde_json::to_string_pretty(&outline)?;

        let request = CompletionRequest::user(format!("Document outline:\n{outline_json}"))
            .with_system(DOC_DESCRIPTION_INSTRUCTIONS)
            .with_model_opt(self.model)
            .with_temperature(0.0);
        let response = provider
            .complete(request)
            .await
            .map_err(|e| TreeError::from_reasoning(self.strategy, e))?;
        Ok(response.content.trim().to_string())
    }
}

fn collect_pending<'r>(nodes: &'r mut [SectionRecord], out: &mut Vec<(&'r str, &'r mut String)>) {
    for node in nodes {
        let SectionRecord {
            text,
            summary,
            children,
            ..
        } = node;
        if summary.trim().is_empty() {
            out.push((text.as_str(), summary));
        }
        collect_pending(children, out);
    }
}

/// First prose lines of `text`, skipping headings and code fences.
pub fn heuristic_summary(text: &str) -> String {
    let mut summary_lines = Vec::new();
    let mut in_fence = false;
    let mut length = 0;

    for line in text.lines() {
        if is_fence(line) {
            in_fence = !in_fence;
            continue;
        }
        let trimmed = line.trim();
        if in_fence || trimmed.is_empty() || heading(trimmed).is_some() {
            continue;
        }
        summary_lines.push(trimmed);
        length += trimmed.len() + 1;
        if length > 200 {
            break;
        }
    }

    let summary = summary_lines.join(" ");
    if summary.is_empty() {
        return "No summary available".to_string();
    }
    if summary.chars().count() > MAX_HEURISTIC_CHARS {
        let truncated: String = summary.chars().take(MAX_HEURISTIC_CHARS - 3).collect();
        format!("{truncated}...")
    } else {
        summary
    }
}

fn heuristic_description(record: &TreeRecord) -> String {
    let titles: Vec<&str> = record
        .structure
        .iter()
        .map(|n| n.title.as_str())
        .take(6)
        .collect();
    let count = crate::record::count_nodes(&record.structure);
    format!(
        "{} is organized into {count} sections. Top-level sections: {}.",
        record.doc_name,
        titles.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use docindex_reasoning::ScriptedProvider;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heuristic_summary_skips_headings_and_code() {
        let text = "## Setup\n\n```sh\nmake\n```\nInstall the tool.\nThen configure it.\n";
        assert_eq!(
            heuristic_summary(text),
            "Install the tool. Then configure it."
        );
        assert_eq!(heuristic_summary("# Only a title\n"), "No summary available");
    }

    #[test]
    fn test_heuristic_summary_truncates() {
        let text = "x".repeat(400);
        let summary = heuristic_summary(&text);
        assert_eq!(summary.chars().count(), MAX_HEURISTIC_CHARS);
        assert!(summary.ends_with("..."));
    }

    #[tokio::test]
    async fn test_short_sections_use_own_text() {
        let options = BuildOptions::default();
        let provider = ScriptedProvider::new();
        let summarizer = Summarizer::new(Some(&provider), BuildStrategy::Structural, &options);

        let summary = summarizer
            .summarize_section("## Scope\nWe build a bridge.\n")
            .await
            .unwrap();

        assert_eq!(summary, "## Scope\nWe build a bridge.");
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn test_long_sections_ask_provider_at_zero_temperature() {
        let options = BuildOptions {
            summary_token_threshold: 5,
            ..BuildOptions::default()
        };
        let provider = ScriptedProvider::new().with_reply("  Covers the bridge design.  ");
        let summarizer = Summarizer::new(Some(&provider), BuildStrategy::Structural, &options);

        let summary = summarizer
            .summarize_section("The bridge spans the river with three arches.")
            .await
            .unwrap();

        assert_eq!(summary, "Covers the bridge design.");
        let request = &provider.requests()[0];
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.messages[1].content.contains("three arches"));
    }

    #[tokio::test]
    async fn test_existing_summaries_are_kept() {
        let options = BuildOptions::default();
        let summarizer = Summarizer::new(None, BuildStrategy::Reasoning, &options);
        let mut nodes = vec![
            SectionRecord {
                summary: "Given.".to_string(),
                ..SectionRecord::new("A").with_text("alpha")
            },
            SectionRecord::new("B").with_text("beta"),
        ];

        summarizer.summarize_sections(&mut nodes).await.unwrap();

        assert_eq!(nodes[0].summary, "Given.");
        assert_eq!(nodes[1].summary, "beta");
    }

    #[tokio::test]
    async fn test_description_without_provider_lists_sections() {
        let options = BuildOptions::default();
        let summarizer = Summarizer::new(None, BuildStrategy::Structural, &options);
        let record = TreeRecord {
            doc_name: "manual".to_string(),
            doc_description: String::new(),
            structure: vec![
                SectionRecord::new("Install").with_children(vec![SectionRecord::new("Linux")]),
                SectionRecord::new("Usage"),
            ],
        };

        let description = summarizer.describe_document(&record).await.unwrap();
        assert_eq!(
            description,
            "manual is organized into 3 sections. Top-level sections: Install, Usage."
        );
    }
}
