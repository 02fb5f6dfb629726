//! Line-level Markdown helpers shared by the normalizer and the builders.

/// Split a line into its content and its line ending (`"\n"`, `"\r\n"` or `""`).
pub(crate) fn split_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

/// Parse an ATX heading (`# Title` .. `###### Title`). Returns the level and
/// the title with any closing `#` run removed.
pub(crate) fn heading(line: &str) -> Option<(usize, &str)> {
    let (content, _) = split_ending(line);
    let level = content.chars().take_while(|&c| c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &content[level..];
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let title = rest.trim().trim_end_matches('#').trim_end();
    if title.is_empty() {
        None
    } else {
        Some((level, title))
    }
}

/// True for a line that opens or closes a fenced code block.
pub(crate) fn is_fence(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}
