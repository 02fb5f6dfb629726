//! Heading normalization.
//!
//! Documents converted from word processors often mark section titles with
//! bold text instead of heading styles. The normalizer promotes lines that are
//! emphasized end-to-end and look like titles into ATX headings, so the
//! structural builder has something to work with.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::markdown::{heading, is_fence, split_ending};

/// Bold marker that must wrap a whole line. `__` is not accepted: it
/// collides with identifiers such as `__init__`.
const EMPHASIS_MARKER: &str = "**";

/// Tunables for heading detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Leading words that mark a section title ("Step 3 ...", "Fase 2 ...").
    /// Matched case-insensitively and followed by whitespace.
    pub keywords: Vec<String>,

    /// Emphasized lines shorter than this (in characters) that do not read
    /// as prose are promoted even when no other detector matches.
    pub default_max_len: usize,

    /// Length bounds for all-caps titles.
    pub caps_min_len: usize,
    pub caps_max_len: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            keywords: [
                "Step", "Stap", "Section", "Sectie", "Part", "Deel", "Phase", "Fase", "Module",
                "Extra",
            ]
            .iter()
            .map(|k| (*k).to_string())
            .collect(),
            default_max_len: 80,
            caps_min_len: 5,
            caps_max_len: 50,
        }
    }
}

/// Output of a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub text: String,
    /// Emphasized lines rewritten as headings.
    pub promoted: usize,
    /// Heading lines in the output, promoted or already present.
    pub total_headings: usize,
}

/// Promotes emphasis-only title lines to headings.
#[derive(Debug, Clone)]
pub struct HeadingNormalizer {
    config: NormalizerConfig,
    numbered: Option<Regex>,
    lettered: Option<Regex>,
    keyword: Option<Regex>,
    prose: Option<Regex>,
}

impl HeadingNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        let keyword = if config.keywords.is_empty() {
            None
        } else {
            let alternatives: Vec<String> =
                config.keywords.iter().map(|k| regex_lite::escape(k)).collect();
            Regex::new(&format!(r"(?i)^(?:{})\s", alternatives.join("|"))).ok()
        };

        Self {
            numbered: Regex::new(r"^\d{1,3}(?:[.)]|\s*[-–—])\s*(.*)$").ok(),
            lettered: Regex::new(r"^[A-Za-z][.)]\s*(.*)$").ok(),
            keyword,
            prose: Regex::new(r"[.!;]\s+[a-z]").ok(),
            config,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Rewrite every candidate line and report the heading counts.
    pub fn normalize(&self, text: &str) -> Normalized {
        let mut out = String::with_capacity(text.len());
        let mut promoted = 0;
        let mut total_headings = 0;
        let mut in_fence = false;

        for line in text.split_inclusive('\n') {
            let (content, ending) = split_ending(line);
            if is_fence(content) {
                in_fence = !in_fence;
            }
            if in_fence {
                out.push_str(line);
                continue;
            }

            match self.promote(content) {
                Some(rewritten) => {
                    debug!("Promoted `{}` to `{rewritten}`", content.trim());
                    out.push_str(&rewritten);
                    out.push_str(ending);
                    promoted += 1;
                    total_headings += 1;
                }
                None => {
                    if heading(content).is_some() {
                        total_headings += 1;
                    }
                    out.push_str(line);
                }
            }
        }

        info!("Normalized headings: {promoted} promoted, {total_headings} total");
        Normalized {
            text: out,
            promoted,
            total_headings,
        }
    }

    /// The heading line for `line`, if it is a title candidate.
    fn promote(&self, line: &str) -> Option<String> {
        let inner = emphasized_inner(line)?;
        let (level, title) = self.classify(inner)?;
        Some(format!("{} {title}", "#".repeat(level)))
    }

    /// Detectors in priority order; the first match wins.
    fn classify<'a>(&self, inner: &'a str) -> Option<(usize, &'a str)> {
        if let Some(title) = strip_enumerator(self.numbered.as_ref(), inner) {
            return Some((2, title));
        }
        if let Some(title) = strip_enumerator(self.lettered.as_ref(), inner) {
            return Some((3, title));
        }
        if self.keyword.as_ref().is_some_and(|re| re.is_match(inner)) {
            return Some((2, inner));
        }
        if self.is_caps_title(inner) {
            return Some((2, inner));
        }
        if inner.chars().count() < self.config.default_max_len && !self.reads_as_prose(inner) {
            return Some((2, inner));
        }
        None
    }

    fn is_caps_title(&self, inner: &str) -> bool {
        let len = inner.chars().count();
        (self.config.caps_min_len..=self.config.caps_max_len).contains(&len)
            && inner.chars().any(char::is_alphabetic)
            && inner.chars().all(|c| {
                (c.is_alphabetic() && c.is_uppercase())
                    || c.is_whitespace()
                    || c == '&'
                    || c == '-'
            })
    }

    /// A sentence break followed by a lowercase word, or a multi-word phrase
    /// closed by a full stop, marks body text rather than a title.
    fn reads_as_prose(&self, inner: &str) -> bool {
        if self.prose.as_ref().is_some_and(|re| re.is_match(inner)) {
            return true;
        }
        inner.contains(char::is_whitespace) && (inner.ends_with('.') || inner.ends_with('!'))
    }
}

impl Default for HeadingNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

/// Inner text of a line wrapped end-to-end in a single bold marker.
fn emphasized_inner(line: &str) -> Option<&str> {
    let inner = line
        .trim()
        .strip_prefix(EMPHASIS_MARKER)?
        .strip_suffix(EMPHASIS_MARKER)?
        .trim();
    if inner.is_empty() || inner.contains(EMPHASIS_MARKER) {
        None
    } else {
        Some(inner)
    }
}

/// Title text after a matched enumerator, or the whole inner text when
/// nothing follows the enumerator.
fn strip_enumerator<'a>(pattern: Option<&Regex>, inner: &'a str) -> Option<&'a str> {
    let caps = pattern?.captures(inner)?;
    let title = caps
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(inner);
    Some(title)
}

/// Normalize `text` with the default configuration.
pub fn normalize_headings(text: &str) -> String {
    HeadingNormalizer::default().normalize(text).text
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn line(input: &str) -> String {
        normalize_headings(input)
    }

    #[test]
    fn test_numbered_titles_become_sections() {
        assert_eq!(line("**1) Scope of Work**"), "## Scope of Work");
        assert_eq!(line("**2. Payment Terms**"), "## Payment Terms");
        assert_eq!(line("**3 - Termination**"), "## Termination");
        assert_eq!(line("**4 – Notices**"), "## Notices");
        assert_eq!(line("**12.Payment**"), "## Payment");
        assert_eq!(line("**5)Warranty**"), "## Warranty");
        assert_eq!(line("**7.**"), "## 7.");
    }

    #[test]
    fn test_lettered_titles_become_subsections() {
        assert_eq!(line("**A) Definitions**"), "### Definitions");
        assert_eq!(line("**b. Exceptions**"), "### Exceptions");
        assert_eq!(line("**A.Definitions**"), "### Definitions");
        assert_eq!(line("**b)Exclusions**"), "### Exclusions");
    }

    #[test]
    fn test_keyword_titles() {
        assert_eq!(line("**Stap 3 Installatie**"), "## Stap 3 Installatie");
        assert_eq!(
            line("**phase two: rollout and the. next thing**"),
            "## phase two: rollout and the. next thing"
        );
    }

    #[test]
    fn test_all_caps_titles() {
        assert_eq!(line("**TERMS & CONDITIONS**"), "## TERMS & CONDITIONS");
    }

    #[test]
    fn test_short_plain_titles_default_to_sections() {
        assert_eq!(line("**Background**"), "## Background");
        assert_eq!(line("**What is covered?**"), "## What is covered?");
    }

    #[test]
    fn test_prose_stays_emphasized() {
        let prose = "**Just some bold emphasis, nothing special.**";
        assert_eq!(line(prose), prose);

        let mid = "**Read this first. then continue**";
        assert_eq!(line(mid), mid);

        let long = format!("**{}**", "word ".repeat(20).trim());
        assert_eq!(line(&long), long);
    }

    #[test]
    fn test_non_candidates_pass_through() {
        let text = "Intro with **bold** inside.\n\n**half bold** tail\n  \n# Existing\n__init__\n__Background__\n";
        assert_eq!(normalize_headings(text), text);
    }

    #[test]
    fn test_fenced_code_is_left_alone() {
        let text = "```\n**1) Not a heading**\n```\n**1) Heading**\n";
        assert_eq!(
            normalize_headings(text),
            "```\n**1) Not a heading**\n```\n## Heading\n"
        );
    }

    #[test]
    fn test_counts_and_line_endings() {
        let text = "# Title\r\n**1) Scope**\r\nBody\r\n**A) Detail**\r\n";
        let result = HeadingNormalizer::default().normalize(text);

        assert_eq!(result.text, "# Title\r\n## Scope\r\nBody\r\n### Detail\r\n");
        assert_eq!(result.promoted, 2);
        assert_eq!(result.total_headings, 3);
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "**1) Scope of Work**\ntext\n**A) Definitions**\n",
            "**OVERVIEW**\n\n**Just some bold emphasis, nothing special.**\n",
            "plain\n\n\n**Step 1 Prepare**\n```\n**x**\n```\n",
        ];
        for input in inputs {
            let once = normalize_headings(input);
            assert_eq!(normalize_headings(&once), once);
        }
    }

    #[test]
    fn test_custom_keywords_replace_defaults() {
        let normalizer = HeadingNormalizer::new(NormalizerConfig {
            keywords: vec!["Kapitel".to_string()],
            default_max_len: 0,
            ..NormalizerConfig::default()
        });

        let result = normalizer.normalize("**Kapitel 4 Ergebnisse**\n**Step 1 prepare**\n");
        assert_eq!(result.text, "## Kapitel 4 Ergebnisse\n**Step 1 prepare**\n");
        assert_eq!(result.promoted, 1);
    }
}
