//! Text-level editing of XML documents.
//!
//! `roxmltree` trees are read-only, so changes are expressed as splices
//! over the source text, keyed by the byte ranges of the parsed nodes, and
//! applied back to front.

use std::ops::Range;

use roxmltree::{Document, Node};

use crate::errors::{CerLinkError, Result};

/// Replacement of one byte range of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub replacement: String,
}

impl Splice {
    pub fn replace(range: Range<usize>, replacement: impl Into<String>) -> Self {
        Self {
            range,
            replacement: replacement.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::replace(at..at, text)
    }
}

pub fn parse<'input>(text: &'input str, label: &str) -> Result<Document<'input>> {
    Document::parse(text).map_err(|e| CerLinkError::Xml {
        message: e.to_string(),
        path: label.to_string(),
    })
}

/// Applies non-overlapping splices to `text`. Insertions at the same point
/// keep their given order.
pub fn apply_splices(text: &str, mut splices: Vec<Splice>) -> String {
    splices.sort_by_key(|s| s.range.start);
    let mut output = String::with_capacity(text.len());
    let mut cursor = 0;
    for splice in splices {
        if splice.range.start < cursor {
            tracing::warn!(start = splice.range.start, "skipping overlapping splice");
            continue;
        }
        output.push_str(&text[cursor..splice.range.start]);
        output.push_str(&splice.replacement);
        cursor = splice.range.end;
    }
    output.push_str(&text[cursor..]);
    output
}

/// Splice appending `content` as the last children of `element`. A
/// self-closing element is rewritten with an explicit end tag.
pub fn append_child(text: &str, element: Node, content: &str) -> Splice {
    let range = element.range();
    let source = &text[range.clone()];

    if source.ends_with("/>") {
        let open = source[..source.len() - 2].trim_end();
        let name = raw_tag_name(source);
        return Splice::replace(range, format!("{open}>{content}</{name}>"));
    }

    match source.rfind("</") {
        Some(close) => Splice::insert(range.start + close, content),
        None => Splice::insert(range.end, content),
    }
}

/// Source text of a node's children, i.e. everything between its start and
/// end tags.
pub fn inner_xml<'t>(text: &'t str, element: Node) -> &'t str {
    let (Some(first), Some(last)) = (element.first_child(), element.last_child()) else {
        return "";
    };
    let start = first.range().start;
    let end = last.range().end;
    &text[start..end]
}

/// Qualified tag name as written in the source, prefix included.
fn raw_tag_name(source: &str) -> &str {
    let name = source.trim_start_matches('<');
    let end = name
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(name.len());
    &name[..end]
}

/// Escapes text for element content.
pub fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escapes text for a double-quoted attribute value.
pub fn escape_attribute(text: &str) -> String {
    escape_text(text).replace('"', "&quot;")
}
