//! Header-driven tree construction.

use std::iter::Peekable;
use std::sync::Arc;

use async_trait::async_trait;
use docindex_reasoning::ReasoningProvider;
use tracing::debug;

use super::{BuildOptions, BuildStrategy, TreeBuilder, finish};
use crate::error::{Result, TreeError};
use crate::markdown::{heading, is_fence};
use crate::record::{SectionRecord, TreeRecord};
use crate::summary::Summarizer;
use crate::tree::DocumentTree;

/// Title given to text that precedes the first heading.
pub const PREAMBLE_TITLE: &str = "Preamble";

/// Builds trees from ATX heading markers (`#` .. `######`).
///
/// A heading at level *L* opens a section that becomes a child of the nearest
/// preceding section with a level below *L*. Every line belongs to exactly one
/// section: the heading line and the body up to the next heading. Headings
/// inside fenced code blocks are ignored.
#[derive(Default)]
pub struct StructuralTreeBuilder {
    provider: Option<Arc<dyn ReasoningProvider>>,
}

struct RawSection {
    level: usize,
    record: SectionRecord,
}

impl StructuralTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `provider` for summaries and the document description.
    pub fn with_provider(mut self, provider: Arc<dyn ReasoningProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Split `text` into nested sections without summaries or identifiers.
    pub fn parse(&self, doc_name: &str, text: &str) -> Result<TreeRecord> {
        let mut preamble = String::new();
        let mut sections: Vec<RawSection> = Vec::new();
        let mut in_fence = false;

        for (index, line) in text.split_inclusive('\n').enumerate() {
            if is_fence(line) {
                in_fence = !in_fence;
            }
            let parsed = if in_fence { None } else { heading(line) };
            if let Some((level, title)) = parsed {
                sections.push(RawSection {
                    level,
                    record: SectionRecord::new(title)
                        .with_text(line)
                        .with_line(index + 1),
                });
            } else if let Some(current) = sections.last_mut() {
                current.record.text.push_str(line);
            } else {
                preamble.push_str(line);
            }
        }

        if sections.is_empty() {
            return Err(TreeError::NoStructureDetected {
                strategy: BuildStrategy::Structural,
            });
        }

        if !preamble.is_empty() {
            if preamble.trim().is_empty() {
                sections[0].record.text.insert_str(0, &preamble);
            } else {
                let level = sections.iter().map(|s| s.level).min().unwrap_or(1);
                sections.insert(
                    0,
                    RawSection {
                        level,
                        record: SectionRecord::new(PREAMBLE_TITLE)
                            .with_text(preamble)
                            .with_line(1),
                    },
                );
            }
        }

        debug!("Found {} sections in `{doc_name}`", sections.len());
        let mut sections = sections.into_iter().peekable();
        Ok(TreeRecord {
            doc_name: doc_name.to_string(),
            doc_description: String::new(),
            structure: nest(&mut sections, 0),
        })
    }
}

/// Consume every section deeper than `parent_level` as a child list.
fn nest<I>(sections: &mut Peekable<I>, parent_level: usize) -> Vec<SectionRecord>
where
    I: Iterator<Item = RawSection>,
{
    let mut out = Vec::new();
    while let Some(section) = sections.next_if(|s| s.level > parent_level) {
        let children = nest(sections, section.level);
        out.push(section.record.with_children(children));
    }
    out
}

#[async_trait]
impl TreeBuilder for StructuralTreeBuilder {
    fn strategy(&self) -> BuildStrategy {
        BuildStrategy::Structural
    }

    async fn build(
        &self,
        doc_name: &str,
        text: &str,
        options: &BuildOptions,
    ) -> Result<DocumentTree> {
        let record = self.parse(doc_name, text)?;
        let summarizer = Summarizer::new(self.provider.as_deref(), self.strategy(), options);
        finish(record, options, &summarizer).await
    }
}
