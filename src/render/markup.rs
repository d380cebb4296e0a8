//! Intermediate markup tree produced by rendering and its serializers.

use crate::document::{escape_attribute, escape_text};
use crate::types::Dialect;

/// CSS class of the wrapper around per-dialect alternatives.
pub const LANGUAGE_SPECIFIC_CLASS: &str = "languageSpecificText";

/// One text per dialect, in [`Dialect::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DialectText {
    texts: [String; 5],
}

impl DialectText {
    pub fn new(cs: &str, vb: &str, cpp: &str, nu: &str, fs: &str) -> Self {
        Self {
            texts: [cs, vb, cpp, nu, fs].map(str::to_string),
        }
    }

    pub fn uniform(text: &str) -> Self {
        Self::new(text, text, text, text, text)
    }

    pub fn get(&self, dialect: Dialect) -> &str {
        &self.texts[dialect_index(dialect)]
    }

    pub fn set(&mut self, dialect: Dialect, text: impl Into<String>) {
        self.texts[dialect_index(dialect)] = text.into();
    }

    pub fn is_uniform(&self) -> bool {
        self.texts.iter().all(|t| *t == self.texts[0])
    }
}

fn dialect_index(dialect: Dialect) -> usize {
    match dialect {
        Dialect::CSharp => 0,
        Dialect::VisualBasic => 1,
        Dialect::Cpp => 2,
        Dialect::Neutral => 3,
        Dialect::FSharp => 4,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Markup {
    Text(String),
    /// Pre-serialized XML, emitted verbatim.
    Raw(String),
    Dialects(DialectText),
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<Markup>,
    },
}

impl Markup {
    pub fn element(name: &str, attributes: &[(&str, &str)], children: Vec<Markup>) -> Self {
        Markup::Element {
            name: name.to_string(),
            attributes: attributes
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            children,
        }
    }

    pub fn span(class: &str, children: Vec<Markup>) -> Self {
        Markup::element("span", &[("class", class)], children)
    }
}

/// Accumulates markup, merging adjacent text runs.
#[derive(Debug, Clone, Default)]
pub struct MarkupWriter {
    nodes: Vec<Markup>,
}

impl MarkupWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Markup::Text(last)) = self.nodes.last_mut() {
            last.push_str(text);
        } else {
            self.nodes.push(Markup::Text(text.to_string()));
        }
    }

    /// Writes per-dialect text, collapsing to plain text when every dialect
    /// agrees.
    pub fn dialects(&mut self, texts: DialectText) {
        if texts.is_uniform() {
            let text = texts.get(Dialect::CSharp).to_string();
            self.text(&text);
        } else {
            self.nodes.push(Markup::Dialects(texts));
        }
    }

    pub fn raw(&mut self, xml: &str) {
        if !xml.is_empty() {
            self.nodes.push(Markup::Raw(xml.to_string()));
        }
    }

    pub fn push(&mut self, node: Markup) {
        match node {
            Markup::Text(text) => self.text(&text),
            other => self.nodes.push(other),
        }
    }

    pub fn extend(&mut self, nodes: Vec<Markup>) {
        for node in nodes {
            self.push(node);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn finish(self) -> Vec<Markup> {
        self.nodes
    }
}

/// Serializes markup to XML. Per-dialect text becomes a
/// `languageSpecificText` span holding one span per non-empty dialect.
pub fn to_xml(nodes: &[Markup]) -> String {
    let mut out = String::new();
    write_xml(nodes, &mut out);
    out
}

fn write_xml(nodes: &[Markup], out: &mut String) {
    for node in nodes {
        match node {
            Markup::Text(text) => out.push_str(&escape_text(text)),
            Markup::Raw(xml) => out.push_str(xml),
            Markup::Dialects(texts) => {
                out.push_str("<span class=\"");
                out.push_str(LANGUAGE_SPECIFIC_CLASS);
                out.push_str("\">");
                for dialect in Dialect::ALL {
                    let text = texts.get(dialect);
                    if !text.is_empty() {
                        out.push_str(&format!(
                            "<span class=\"{}\">{}</span>",
                            dialect.as_str(),
                            escape_text(text)
                        ));
                    }
                }
                out.push_str("</span>");
            }
            Markup::Element {
                name,
                attributes,
                children,
            } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attributes {
                    out.push_str(&format!(" {}=\"{}\"", key, escape_attribute(value)));
                }
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    write_xml(children, out);
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
        }
    }
}

/// Plain text as one dialect would show it.
pub fn text_for(nodes: &[Markup], dialect: Dialect) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Markup::Text(text) | Markup::Raw(text) => out.push_str(text),
            Markup::Dialects(texts) => out.push_str(texts.get(dialect)),
            Markup::Element { children, .. } => out.push_str(&text_for(children, dialect)),
        }
    }
    out
}
