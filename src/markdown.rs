//! Splits a Markdown changelog into version sections.
//!
//! A section starts at every document-level `##` heading and runs until the
//! next one. Content before the first such heading is preamble and dropped.
//! Bodies are sliced straight out of the source, so they keep the author's
//! formatting byte for byte.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

/// One version section of a changelog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Plain text of the heading, trimmed
    pub heading: String,
    /// Markdown between this heading and the next one
    pub body: String,
}

/// Parser extensions used for both segmentation and rendering.
pub(crate) fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Split `content` into sections, in document order.
pub fn segment(content: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut depth = 0usize;
    // Heading text being collected for the section that is opening.
    let mut heading: Option<String> = None;
    // Heading text and body start offset of the open section.
    let mut open: Option<(String, usize)> = None;

    for (event, range) in Parser::new_ext(content, parser_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading {
                level: HeadingLevel::H2,
                ..
            }) if depth == 0 => {
                if let Some((title, start)) = open.take() {
                    sections.push(Section::new(title, slice(content, start, range.start)));
                }
                heading = Some(String::new());
                depth += 1;
            }
            Event::End(TagEnd::Heading(HeadingLevel::H2)) if depth == 1 && heading.is_some() => {
                depth -= 1;
                let title = heading.take().unwrap_or_default();
                open = Some((title.trim().to_string(), range.end));
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) => {
                if let Some(heading) = heading.as_mut() {
                    heading.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak => {
                if let Some(heading) = heading.as_mut() {
                    heading.push(' ');
                }
            }
            _ => {}
        }
    }

    if let Some((title, start)) = open {
        sections.push(Section::new(title, slice(content, start, content.len())));
    }

    sections
}

impl Section {
    fn new(heading: String, raw_body: &str) -> Self {
        Self {
            heading,
            body: clean_body(raw_body),
        }
    }
}

fn slice(content: &str, start: usize, end: usize) -> &str {
    content.get(start..end).unwrap_or_default()
}

/// Drop blank lines at the start, trailing whitespace at the end.
fn clean_body(raw: &str) -> String {
    let Some(first) = raw.find(|c: char| !c.is_whitespace()) else {
        return String::new();
    };
    let line_start = raw[..first].rfind('\n').map_or(0, |n| n + 1);
    let body = raw[line_start..].trim_end();
    format!("{body}\n")
}
