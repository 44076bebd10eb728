//! Markdown structure helpers: front matter, paragraphs, headings and anchors.
//!
//! Everything here works on the normalized text of a single document, i.e.
//! the raw text with its front matter removed. Fenced code blocks are
//! treated as opaque: they never break a paragraph and never yield headings.

use crate::models::{Heading, TocEntry};
use once_cell::sync::Lazy;
use regex::Regex;

const FRONT_MATTER_DELIMITER: &str = "---";
const FENCE_MARKER: &str = "```";

static HEADING_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<hashes>#{1,6})\s+(?P<title>.+?)\s*$").unwrap());
static SLUG_STRIP_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s-]").unwrap());
static SLUG_SPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static SLUG_HYPHEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// Removes a leading `---` delimited block. Unterminated blocks are left alone.
pub fn strip_front_matter(text: &str) -> &str {
    let mut lines = text.split_inclusive('\n');
    let opens = lines
        .next()
        .is_some_and(|first| trim_line_ending(first) == FRONT_MATTER_DELIMITER);
    if !opens {
        return text;
    }

    let mut offset = text.find('\n').map_or(text.len(), |index| index + 1);
    for line in lines {
        offset += line.len();
        if trim_line_ending(line) == FRONT_MATTER_DELIMITER {
            return &text[offset..];
        }
    }

    text
}

pub fn is_fence_line(line: &str) -> bool {
    line.trim().starts_with(FENCE_MARKER)
}

/// Splits on blank lines outside of fenced code. Paragraphs are trimmed and
/// never empty; fence bodies stay inside a single paragraph.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for line in text.lines() {
        if is_fence_line(line) {
            in_fence = !in_fence;
            buffer.push(line);
            continue;
        }

        if !in_fence && line.trim().is_empty() {
            flush_paragraph(&mut buffer, &mut paragraphs);
        } else {
            buffer.push(line);
        }
    }
    flush_paragraph(&mut buffer, &mut paragraphs);

    paragraphs
}

fn flush_paragraph(buffer: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    if buffer.is_empty() {
        return;
    }
    let paragraph = buffer.join("\n").trim().to_string();
    buffer.clear();
    if !paragraph.is_empty() {
        paragraphs.push(paragraph);
    }
}

/// ATX headings outside fenced code, with the character offset of their line.
pub fn parse_headings(text: &str) -> Vec<Heading> {
    let mut headings = Vec::new();
    let mut in_fence = false;
    let mut position = 0usize;

    for raw_line in text.split_inclusive('\n') {
        let line = trim_line_ending(raw_line);
        let line_start = position;
        position += raw_line.chars().count();

        if is_fence_line(line) {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }

        if let Some(captures) = HEADING_PATTERN.captures(line) {
            let title = captures["title"].trim();
            if title.is_empty() {
                continue;
            }
            headings.push(Heading {
                level: captures["hashes"].len() as u8,
                title: title.to_string(),
                position: line_start,
            });
        }
    }

    headings
}

/// Lowercased, punctuation-free, hyphen-joined anchor for a heading title.
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let stripped = SLUG_STRIP_PATTERN.replace_all(&lowered, "");
    let hyphenated = SLUG_SPACE_PATTERN.replace_all(&stripped, "-");
    let collapsed = SLUG_HYPHEN_PATTERN.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

pub fn toc_entries(path: &str, headings: &[Heading]) -> Vec<TocEntry> {
    headings
        .iter()
        .map(|heading| TocEntry {
            path: path.to_string(),
            level: heading.level,
            title: heading.title.clone(),
            anchor: slugify(&heading.title),
        })
        .collect()
}

fn trim_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}
