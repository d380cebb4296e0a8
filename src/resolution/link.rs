use std::ops::Range;

use roxmltree::Node;

use crate::document::inner_xml;
use crate::render::Markup;
use crate::types::{DisplayOptions, LinkCategory};

/// Tag name of unresolved link placeholders.
pub const REFERENCE_LINK_TAG: &str = "referenceLink";

/// One unresolved `referenceLink` element as authored.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceLink {
    pub target: String,
    /// `content`, `format`, `extension`, or a CER to display instead.
    pub display_target: Option<String>,
    pub options: DisplayOptions,
    pub prefer_overload: bool,
    /// `false` keeps the rendered text but never produces a link.
    pub render_as_link: bool,
    /// Authored inner XML, if any.
    pub content: Option<String>,
    /// Byte range of the element in its document.
    pub range: Range<usize>,
}

impl ReferenceLink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            display_target: None,
            options: DisplayOptions::default(),
            prefer_overload: false,
            render_as_link: true,
            content: None,
            range: 0..0,
        }
    }

    /// Reads a link from its element. `text` is the document source the
    /// node was parsed from.
    pub fn from_node(text: &str, node: Node) -> Self {
        let mut options = DisplayOptions::NONE;
        if bool_attribute(node, "show-container", false) {
            options = options | DisplayOptions::SHOW_CONTAINER;
        }
        if bool_attribute(node, "show-templates", true) {
            options = options | DisplayOptions::SHOW_TEMPLATES;
        }
        if bool_attribute(node, "show-parameters", true) {
            options = options | DisplayOptions::SHOW_PARAMETERS;
        }

        let content = inner_xml(text, node).trim();

        Self {
            target: node.attribute("target").unwrap_or_default().trim().to_string(),
            display_target: node
                .attribute("display-target")
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            options,
            prefer_overload: bool_attribute(node, "prefer-overload", false),
            render_as_link: bool_attribute(node, "renderAsLink", true),
            content: (!content.is_empty()).then(|| content.to_string()),
            range: node.range(),
        }
    }
}

fn bool_attribute(node: Node, name: &str, default: bool) -> bool {
    match node.attribute(name) {
        Some(value) if value.eq_ignore_ascii_case("true") => true,
        Some(value) if value.eq_ignore_ascii_case("false") => false,
        _ => default,
    }
}

/// Outcome of resolving one link.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLink {
    /// The id the link finally addresses, after redirects.
    pub target_id: String,
    pub category: LinkCategory,
    /// Whether the id was found in a target dictionary.
    pub resolved: bool,
    pub markup: Vec<Markup>,
}

/// Summary of resolving every link in one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    /// The document with each link replaced by its markup.
    pub text: String,
    pub total: usize,
    pub resolved_count: usize,
    /// Link targets that were not found in any dictionary.
    pub unresolved: Vec<String>,
}
