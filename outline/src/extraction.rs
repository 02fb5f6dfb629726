//! Plain-text extraction from document files.
//!
//! Markdown and text files are read as UTF-8. Word documents (`.docx`) are
//! unpacked and their paragraphs rendered one per line, with `Title` and
//! `Heading N` paragraph styles mapped to ATX headings so the structural
//! builder can see them.

use std::io::{Cursor, Read};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::{debug, info};

use crate::error::{Result, TreeError};

/// Maximum decompressed size read from `word/document.xml`.
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// File formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Markdown,
    PlainText,
    Docx,
}

impl SourceFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "md" | "markdown" => Ok(SourceFormat::Markdown),
            "txt" | "text" => Ok(SourceFormat::PlainText),
            "docx" => Ok(SourceFormat::Docx),
            _ => Err(TreeError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Read `path` and return its text.
pub fn extract_text(path: &Path) -> Result<String> {
    let format = SourceFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    let text = extract_bytes(&bytes, format)?;
    info!(
        "Extracted {} chars from {} ({format:?})",
        text.len(),
        path.display()
    );
    Ok(text)
}

/// Decode `bytes` in the given format.
pub fn extract_bytes(bytes: &[u8], format: SourceFormat) -> Result<String> {
    match format {
        SourceFormat::Markdown | SourceFormat::PlainText => String::from_utf8(bytes.to_vec())
            .map_err(|e| TreeError::ExtractionFailure(format!("not valid UTF-8: {e}"))),
        SourceFormat::Docx => extract_docx(bytes),
    }
}

/// Name a document after its file stem.
pub fn doc_name_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| TreeError::ExtractionFailure(format!("not a DOCX archive: {e}")))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| TreeError::ExtractionFailure(format!("word/document.xml: {e}")))?;

    let mut xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut xml)
        .map_err(|e| TreeError::ExtractionFailure(e.to_string()))?;
    if xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(TreeError::ExtractionFailure(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    render_paragraphs(&xml)
}

/// Render WordprocessingML paragraphs as lines of Markdown.
fn render_paragraphs(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut paragraph = String::new();
    let mut level: Option<usize> = None;
    let mut in_text = false;
    let mut paragraphs = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    paragraph.clear();
                    level = None;
                }
                b"t" => in_text = true,
                b"pStyle" => level = heading_level(&e),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"pStyle" => level = heading_level(&e),
                b"tab" => paragraph.push('\t'),
                b"br" => paragraph.push(' '),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| TreeError::ExtractionFailure(e.to_string()))?;
                paragraph.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    paragraphs += 1;
                    match level {
                        Some(n) if !paragraph.trim().is_empty() => {
                            out.push_str(&"#".repeat(n));
                            out.push(' ');
                            out.push_str(paragraph.trim());
                        }
                        _ => out.push_str(&paragraph),
                    }
                    out.push('\n');
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(TreeError::ExtractionFailure(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    debug!("Rendered {paragraphs} DOCX paragraphs");
    Ok(out)
}

/// Heading level for a `w:pStyle` element: `Title` is 1, `Heading N` is N.
fn heading_level(style: &BytesStart<'_>) -> Option<usize> {
    let value = style
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"val")?
        .unescape_value()
        .ok()?
        .to_ascii_lowercase()
        .replace(' ', "");

    if value == "title" {
        return Some(1);
    }
    let level: usize = value.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
