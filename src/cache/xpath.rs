//! A small location-path language over `roxmltree` documents.
//!
//! Supported: absolute (`/a/b`) and relative (`a/b`, `.`, `..`) paths,
//! the descendant step `//`, the `*` wildcard, a trailing attribute step
//! `@name`, predicates `[path]`, `[path='literal']` and `[not(...)]`, and
//! an optional `string(...)` wrapper.

use std::collections::HashSet;

use roxmltree::Node;

use crate::errors::{CerLinkError, Result};

/// A compiled location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPath {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
    attribute: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
    SelfNode,
    Parent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    name: Option<String>,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Exists(XmlPath),
    Equals(XmlPath, String),
    Not(Box<Predicate>),
}

impl XmlPath {
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let inner = trimmed
            .strip_prefix("string(")
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(trimmed)
            .trim();
        if inner.is_empty() {
            return Err(path_error(expression, "empty path"));
        }

        let (absolute, body) = match inner.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, inner),
        };

        let mut steps = Vec::new();
        let mut attribute = None;
        let mut descendant = absolute && body.starts_with('/');
        let body = if descendant { &body[1..] } else { body };

        let raw_steps = split_steps(body);
        let count = raw_steps.len();
        for (i, raw) in raw_steps.into_iter().enumerate() {
            if raw.is_empty() {
                if descendant || i + 1 == count {
                    return Err(path_error(expression, "empty step"));
                }
                descendant = true;
                continue;
            }

            if let Some(name) = raw.strip_prefix('@') {
                if i + 1 != count || name.is_empty() {
                    return Err(path_error(expression, "attribute step must come last"));
                }
                if descendant {
                    steps.push(Step {
                        axis: Axis::Descendant,
                        name: None,
                        predicates: Vec::new(),
                    });
                }
                attribute = Some(name.to_string());
                break;
            }

            let step = parse_step(raw, descendant, expression)?;
            steps.push(step);
            descendant = false;
        }

        Ok(Self {
            source: expression.to_string(),
            absolute,
            steps,
            attribute,
        })
    }

    /// The expression this path was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn selects_attribute(&self) -> bool {
        self.attribute.is_some()
    }

    /// Element (or document) nodes reached by the path, in document order
    /// per context node. A trailing attribute step keeps only the nodes
    /// carrying that attribute.
    pub fn select<'a, 'input>(&self, context: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        let start = if self.absolute {
            context.document().root()
        } else {
            context
        };

        let mut current = vec![start];
        for step in &self.steps {
            let mut seen = HashSet::new();
            let mut next = Vec::new();
            for node in &current {
                for candidate in step.candidates(*node) {
                    if step.matches(candidate) && seen.insert(candidate.id()) {
                        next.push(candidate);
                    }
                }
            }
            current = next;
        }

        match &self.attribute {
            Some(name) => current
                .into_iter()
                .filter(|n| n.attribute(name.as_str()).is_some())
                .collect(),
            None => current,
        }
    }

    /// String values of everything the path selects: attribute values for
    /// attribute paths, text content for element paths.
    pub fn select_strings(&self, context: Node) -> Vec<String> {
        let nodes = self.select(context);
        match &self.attribute {
            Some(name) => nodes
                .into_iter()
                .filter_map(|n| n.attribute(name.as_str()))
                .map(str::to_string)
                .collect(),
            None => nodes.into_iter().map(text_content).collect(),
        }
    }

    /// String value of the first selected item.
    pub fn evaluate_string(&self, context: Node) -> Option<String> {
        self.select_strings(context).into_iter().next()
    }
}

impl Step {
    fn candidates<'a, 'input>(&self, node: Node<'a, 'input>) -> Vec<Node<'a, 'input>> {
        match self.axis {
            Axis::Child => node.children().filter(|c| c.is_element()).collect(),
            Axis::Descendant => node.descendants().skip(1).filter(|c| c.is_element()).collect(),
            Axis::SelfNode => vec![node],
            Axis::Parent => node.parent().into_iter().collect(),
        }
    }

    fn matches(&self, node: Node) -> bool {
        let name_ok = match &self.name {
            Some(name) => node.is_element() && node.tag_name().name() == name,
            None => true,
        };
        name_ok && self.predicates.iter().all(|p| p.holds(node))
    }
}

impl Predicate {
    fn holds(&self, node: Node) -> bool {
        match self {
            Predicate::Exists(path) => !path.select(node).is_empty(),
            Predicate::Equals(path, literal) => {
                path.select_strings(node).iter().any(|v| v == literal)
            }
            Predicate::Not(inner) => !inner.holds(node),
        }
    }
}

fn parse_step(raw: &str, descendant: bool, expression: &str) -> Result<Step> {
    let (head, mut rest) = match raw.find('[') {
        Some(open) => (&raw[..open], &raw[open..]),
        None => (raw, ""),
    };

    let (axis, name) = match head {
        "." => (Axis::SelfNode, None),
        ".." => (Axis::Parent, None),
        "*" => (child_or_descendant(descendant), None),
        name if is_name(name) => (child_or_descendant(descendant), Some(name.to_string())),
        _ => return Err(path_error(expression, "invalid step")),
    };
    if descendant && matches!(axis, Axis::SelfNode | Axis::Parent) {
        return Err(path_error(expression, "invalid step after //"));
    }

    let mut predicates = Vec::new();
    while !rest.is_empty() {
        let close = matching_bracket(rest).ok_or_else(|| path_error(expression, "unterminated predicate"))?;
        predicates.push(parse_predicate(&rest[1..close], expression)?);
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(path_error(expression, "unexpected text after predicate"));
        }
    }

    Ok(Step {
        axis,
        name,
        predicates,
    })
}

fn child_or_descendant(descendant: bool) -> Axis {
    if descendant {
        Axis::Descendant
    } else {
        Axis::Child
    }
}

fn parse_predicate(text: &str, expression: &str) -> Result<Predicate> {
    let text = text.trim();
    if let Some(inner) = text.strip_prefix("not(").and_then(|s| s.strip_suffix(')')) {
        return Ok(Predicate::Not(Box::new(parse_predicate(inner, expression)?)));
    }

    match top_level_equals(text) {
        Some(eq) => {
            let path = XmlPath::parse(text[..eq].trim())?;
            let literal = text[eq + 1..].trim();
            let unquoted = literal
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
                .or_else(|| literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
                .ok_or_else(|| path_error(expression, "predicate literal must be quoted"))?;
            Ok(Predicate::Equals(path, unquoted.to_string()))
        }
        None => Ok(Predicate::Exists(XmlPath::parse(text)?)),
    }
}

/// Splits on `/` outside predicates and quotes. `a//b` yields an empty
/// step between `a` and `b`.
fn split_steps(body: &str) -> Vec<&str> {
    let mut steps = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in body.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth -= 1,
            (None, '/') if depth == 0 => {
                steps.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    steps.push(&body[start..]);
    steps
}

fn matching_bracket(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn top_level_equals(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth -= 1,
            (None, '=') if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
        && !s.starts_with('.')
}

/// Concatenated text of every text node under `node`.
pub fn text_content(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

fn path_error(expression: &str, message: &str) -> CerLinkError {
    CerLinkError::Config {
        message: format!("invalid path '{expression}': {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<reflection>
  <apis>
    <api id="T:N.A"><file name="a"/><topicdata notopic=""/></api>
    <api id="T:N.B"><file name="b"/></api>
  </apis>
</reflection>"#;

    #[test]
    fn absolute_and_predicates() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let path = XmlPath::parse("/*/apis/api[not(topicdata/@notopic)]").unwrap();
        let ids: Vec<_> = path
            .select(doc.root_element())
            .iter()
            .filter_map(|n| n.attribute("id"))
            .collect();
        assert_eq!(ids, vec!["T:N.B"]);
    }

    #[test]
    fn descendant_and_attribute() {
        let doc = roxmltree::Document::parse(DOC).unwrap();
        let path = XmlPath::parse("//api/@id").unwrap();
        assert_eq!(path.select_strings(doc.root_element()), vec!["T:N.A", "T:N.B"]);

        let key = XmlPath::parse("string(file/@name)").unwrap();
        let api = XmlPath::parse("//api[@id='T:N.B']").unwrap().select(doc.root_element())[0];
        assert_eq!(key.evaluate_string(api).as_deref(), Some("b"));
    }

    #[test]
    fn split_keeps_predicates_whole() {
        assert_eq!(split_steps("a[b/c]/d"), vec!["a[b/c]", "d"]);
        assert_eq!(split_steps("a//b"), vec!["a", "", "b"]);
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(XmlPath::parse("").is_err());
        assert!(XmlPath::parse("a/@b/c").is_err());
        assert!(XmlPath::parse("a[@b").is_err());
    }
}
