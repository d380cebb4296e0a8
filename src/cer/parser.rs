use super::reference::*;
use crate::errors::{CerLinkError, Result};

/// Label of a type-level placeholder parsed without a generic context.
pub const UNKNOWN_TYPE_PARAMETER: &str = "UTP";

/// Label of a method-level placeholder parsed without a generic context.
pub const UNKNOWN_METHOD_PARAMETER: &str = "UMP";

const MEMBER_PREFIXES: [&str; 5] = ["M:", "P:", "F:", "E:", "Overload:"];

/// A member CER split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberIdentifier {
    /// CER of the owning type, always `T:`-prefixed.
    pub type_cer: String,
    pub member_name: String,
    /// Raw text between the parentheses, if the identifier has any.
    pub arguments: Option<String>,
    /// Conversion-operator return type following `~`.
    pub return_type: Option<String>,
}

/// The entity whose generic parameters `` `N `` / ``` ``N ``` placeholders refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct GenericContext {
    owner: String,
    arity: usize,
}

/// Parses CER strings into [`Reference`] trees.
///
/// The parser carries the ambient generic context that positional
/// placeholders resolve against; it is replaced wholesale by
/// [`CerParser::set_generic_context`].
#[derive(Debug, Clone, Default)]
pub struct CerParser {
    type_context: Option<GenericContext>,
    method_context: Option<GenericContext>,
}

impl CerParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `cer` the ambient generic context.
    ///
    /// A type CER supplies type-level parameters. A member CER supplies the
    /// type-level parameters of its owning type plus its own method-level
    /// parameters. Anything else clears the context.
    pub fn set_generic_context(&mut self, cer: &str) {
        self.type_context = None;
        self.method_context = None;

        if cer.starts_with("T:") {
            self.type_context = type_context_of(cer);
        } else if MEMBER_PREFIXES.iter().any(|p| cer.starts_with(p)) {
            let parts = decompose_member_identifier(cer);
            self.type_context = type_context_of(&parts.type_cer);

            let arity = parts
                .member_name
                .rsplit_once("``")
                .and_then(|(_, n)| n.parse::<usize>().ok())
                .unwrap_or(0);
            if arity > 0 {
                self.method_context = Some(GenericContext {
                    owner: cer.to_string(),
                    arity,
                });
            }
        }
    }

    pub fn clear_generic_context(&mut self) {
        self.type_context = None;
        self.method_context = None;
    }

    /// Parses a full CER.
    ///
    /// Identifiers that match no production come back as
    /// [`Reference::Invalid`]; only an unterminated `{` is an error.
    pub fn parse_reference(&self, api: &str) -> Result<Reference> {
        check_brackets(api)?;

        let parsed = if let Some(rest) = api.strip_prefix("N:") {
            is_namespace_path(rest).then(|| {
                Reference::Namespace(NamespaceReference {
                    id: api.to_string(),
                })
            })
        } else if let Some(rest) = api.strip_prefix("T:") {
            self.parse_type_text(rest)?.map(Reference::Type)
        } else if MEMBER_PREFIXES.iter().any(|p| api.starts_with(p)) {
            self.parse_member(api)?.map(Reference::Member)
        } else {
            None
        };

        Ok(parsed.unwrap_or_else(|| {
            Reference::Invalid(InvalidReference {
                id: api.to_string(),
            })
        }))
    }

    /// Parses an unprefixed type expression, as found in argument lists.
    /// Returns `Ok(None)` when the text is not a type.
    pub fn parse_type_text(&self, text: &str) -> Result<Option<TypeReference>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        if let Some(inner) = text.strip_suffix('@') {
            return Ok(self.parse_type_text(inner)?.map(|t| {
                TypeReference::Reference(ReferenceTypeReference {
                    referred_type: Box::new(t),
                })
            }));
        }

        if let Some(inner) = text.strip_suffix('*') {
            return Ok(self.parse_type_text(inner)?.map(|t| {
                TypeReference::Pointer(PointerTypeReference {
                    pointed_type: Box::new(t),
                })
            }));
        }

        if text.ends_with(']') {
            let Some(open) = text.rfind('[') else {
                return Ok(None);
            };
            let bounds = &text[open + 1..text.len() - 1];
            if !bounds
                .chars()
                .all(|c| c == ',' || c == ':' || c.is_ascii_digit())
            {
                return Ok(None);
            }
            let rank = bounds.matches(',').count() + 1;
            return Ok(self.parse_type_text(&text[..open])?.map(|t| {
                TypeReference::Array(ArrayTypeReference {
                    element_type: Box::new(t),
                    rank,
                })
            }));
        }

        if let Some(index) = text.strip_prefix("``") {
            return Ok(index
                .parse::<usize>()
                .ok()
                .map(|i| placeholder(self.method_context.as_ref(), i, UNKNOWN_METHOD_PARAMETER)));
        }

        if let Some(index) = text.strip_prefix('`') {
            return Ok(index
                .parse::<usize>()
                .ok()
                .map(|i| placeholder(self.type_context.as_ref(), i, UNKNOWN_TYPE_PARAMETER)));
        }

        if text.contains('{') {
            check_brackets(text)?;
            return Ok(self
                .parse_specialized_type(text)?
                .map(TypeReference::Specialized));
        }

        Ok(is_simple_type_path(text)
            .then(|| TypeReference::Simple(SimpleTypeReference::new(format!("T:{text}")))))
    }

    /// Parses `N.Outer{A}.Inner{B}` into a specialization chain. Each link's
    /// template id is the path so far with every earlier argument list
    /// replaced by its arity marker.
    fn parse_specialized_type(&self, text: &str) -> Result<Option<SpecializedTypeReference>> {
        let mut specializations = Vec::new();
        let mut template_path = String::new();
        let mut position = 0;

        while position < text.len() {
            let rest = &text[position..];
            let Some(relative_open) = rest.find('{') else {
                // A non-generic type nested in a specialized one.
                template_path.push_str(rest);
                if !is_simple_type_path(&template_path) {
                    return Ok(None);
                }
                specializations.push(Specialization {
                    template: SimpleTypeReference::new(format!("T:{template_path}")),
                    arguments: Vec::new(),
                });
                break;
            };

            let open = position + relative_open;
            let segment = &text[position..open];
            let close = find_matching_end_bracket(text, open)?;
            let argument_texts = separate_types(&text[open + 1..close]);
            if segment.is_empty() || segment.contains('`') || argument_texts.is_empty() {
                return Ok(None);
            }

            template_path.push_str(segment);
            if !is_simple_type_path(&template_path) {
                return Ok(None);
            }
            template_path.push('`');
            template_path.push_str(&argument_texts.len().to_string());

            let mut arguments = Vec::with_capacity(argument_texts.len());
            for argument in &argument_texts {
                match self.parse_type_text(argument)? {
                    Some(t) => arguments.push(t),
                    None => return Ok(None),
                }
            }
            specializations.push(Specialization {
                template: SimpleTypeReference::new(format!("T:{template_path}")),
                arguments,
            });

            position = close + 1;
            if position < text.len() {
                if !text[position..].starts_with('.') || position + 1 == text.len() {
                    return Ok(None);
                }
                template_path.push('.');
                position += 1;
            }
        }

        Ok(Some(SpecializedTypeReference { specializations }))
    }

    fn parse_member(&self, api: &str) -> Result<Option<MemberReference>> {
        let Some((prefix, _)) = api.split_once(':') else {
            return Ok(None);
        };
        if !has_closed_argument_list(api) {
            return Ok(None);
        }
        let parts = decompose_member_identifier(api);
        if !is_member_name(&parts.member_name) {
            return Ok(None);
        }
        let type_text = &parts.type_cer[2..];
        if type_text.is_empty() {
            return Ok(None);
        }

        if type_text.contains('{') {
            let Some(specialized_type) = self.parse_specialized_type(type_text)? else {
                return Ok(None);
            };

            let arguments = parts.arguments.as_deref().filter(|a| !a.trim().is_empty());
            let Some(arguments) = arguments else {
                let Some(template) = specialized_type.template_type() else {
                    return Ok(None);
                };
                let member_id = format!("{}:{}.{}", prefix, &template.id[2..], parts.member_name);
                return Ok(Some(MemberReference::Specialized(SpecializedMemberReference {
                    template_member: SimpleMemberReference::new(member_id),
                    specialized_type,
                })));
            };

            let mut parameter_types = Vec::new();
            for argument in separate_types(arguments) {
                match self.parse_type_text(&argument)? {
                    Some(t) => parameter_types.push(t),
                    None => return Ok(None),
                }
            }
            return Ok(Some(MemberReference::SpecializedWithParameters(
                SpecializedMemberWithParametersReference {
                    prefix: prefix.to_string(),
                    specialized_type,
                    member_name: parts.member_name,
                    parameter_types,
                },
            )));
        }

        if !is_simple_type_path(type_text) {
            return Ok(None);
        }
        if let Some(arguments) = &parts.arguments {
            for argument in separate_types(arguments) {
                if self.parse_type_text(&argument)?.is_none() {
                    return Ok(None);
                }
            }
        }
        if let Some(return_type) = &parts.return_type {
            if self.parse_type_text(return_type)?.is_none() {
                return Ok(None);
            }
        }

        Ok(Some(MemberReference::Simple(SimpleMemberReference::new(api))))
    }
}

fn type_context_of(type_cer: &str) -> Option<GenericContext> {
    if type_cer.contains('{') {
        return None;
    }
    let arity = generic_arity(type_cer);
    (arity > 0).then(|| GenericContext {
        owner: type_cer.to_string(),
        arity,
    })
}

fn placeholder(context: Option<&GenericContext>, index: usize, unknown: &str) -> TypeReference {
    let template = match context {
        Some(ctx) if index < ctx.arity => {
            TemplateTypeReference::Indexed(IndexedTemplateTypeReference::new(&ctx.owner, index))
        }
        _ => TemplateTypeReference::Named(NamedTemplateTypeReference {
            name: unknown.to_string(),
        }),
    };
    TypeReference::Template(template)
}

/// Splits a member CER into owning type, name, argument list and
/// conversion return type.
///
/// The type/name boundary is the last top-level dot before the first `#`
/// (explicit interface implementations and constructors), or the last
/// top-level dot of the name part otherwise.
pub fn decompose_member_identifier(id: &str) -> MemberIdentifier {
    let body = id.split_once(':').map_or(id, |(_, b)| b);

    let (head, arguments, return_type) = match body.find('(') {
        Some(open) => match body.rfind(')').filter(|&close| close > open) {
            Some(close) => (
                &body[..open],
                Some(body[open + 1..close].to_string()),
                body[close + 1..].strip_prefix('~').map(str::to_string),
            ),
            None => (&body[..open], Some(body[open + 1..].to_string()), None),
        },
        None => match body.split_once('~') {
            Some((head, ret)) => (head, None, Some(ret.to_string())),
            None => (body, None, None),
        },
    };

    let limit = head.find('#').unwrap_or(head.len());
    let (type_path, member_name) = match last_top_level_dot(&head[..limit]) {
        Some(dot) => (&head[..dot], &head[dot + 1..]),
        None => ("", head),
    };

    MemberIdentifier {
        type_cer: format!("T:{type_path}"),
        member_name: member_name.to_string(),
        arguments,
        return_type,
    }
}

/// Splits a comma-separated type list, ignoring commas nested inside `{}`
/// or `[]`. Pieces are trimmed; an empty list yields no pieces.
pub fn separate_types(list: &str) -> Vec<String> {
    let mut types = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            ',' if depth == 0 => {
                types.push(list[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = list[start..].trim();
    if !(types.is_empty() && last.is_empty()) {
        types.push(last.to_string());
    }
    types
}

/// Returns the byte index of the bracket closing the one at `position`.
pub fn find_matching_end_bracket(text: &str, position: usize) -> Result<usize> {
    let bytes = text.as_bytes();
    let (open, close) = match bytes.get(position) {
        Some(b'{') => (b'{', b'}'),
        Some(b'[') => (b'[', b']'),
        Some(b'(') => (b'(', b')'),
        _ => {
            return Err(CerLinkError::UnterminatedBracket {
                text: text.to_string(),
                position,
            })
        }
    };

    let mut depth = 0usize;
    for (i, &b) in bytes.iter().enumerate().skip(position) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Ok(i);
            }
        }
    }

    Err(CerLinkError::UnterminatedBracket {
        text: text.to_string(),
        position,
    })
}

/// Total generic arity of a type id: the sum of every `` `N `` marker
/// along its nested path.
pub fn generic_arity(type_id: &str) -> usize {
    let body = type_id.split_once(':').map_or(type_id, |(_, b)| b);
    body.split('.')
        .filter_map(|segment| segment.split_once('`'))
        .filter_map(|(_, n)| n.parse::<usize>().ok())
        .sum()
}

fn check_brackets(text: &str) -> Result<()> {
    let mut open = Vec::new();
    for (i, c) in text.char_indices() {
        match c {
            '{' => open.push(i),
            '}' => {
                open.pop();
            }
            _ => {}
        }
    }
    match open.first() {
        Some(&position) => Err(CerLinkError::UnterminatedBracket {
            text: text.to_string(),
            position,
        }),
        None => Ok(()),
    }
}

fn last_top_level_dot(text: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut last = None;
    for (i, c) in text.char_indices() {
        match c {
            '{' | '[' => depth += 1,
            '}' | ']' => depth -= 1,
            '.' if depth == 0 => last = Some(i),
            _ => {}
        }
    }
    last
}

fn is_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_namespace_path(s: &str) -> bool {
    s.is_empty() || s.split('.').all(is_name)
}

fn is_type_segment(s: &str) -> bool {
    match s.split_once('`') {
        Some((name, arity)) => {
            is_name(name) && !arity.is_empty() && arity.chars().all(|c| c.is_ascii_digit())
        }
        None => is_name(s),
    }
}

fn is_simple_type_path(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(is_type_segment)
}

/// Every `(` in a member id is closed, and no `)` comes first.
fn has_closed_argument_list(id: &str) -> bool {
    let mut depth = 0i32;
    for c in id.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Member names allow `#` (constructors, explicit implementations), arity
/// markers, and brace groups naming generic interfaces. At least one name
/// character is required.
fn is_member_name(s: &str) -> bool {
    if s.starts_with('`') || !s.chars().any(|c| c.is_alphanumeric() || c == '_') {
        return false;
    }
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            '(' | ')' => return false,
            _ if depth > 0 => {}
            c if c.is_alphanumeric() || c == '_' || c == '#' || c == '`' => {}
            _ => return false,
        }
    }
    depth == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_names() {
        assert!(is_member_name("ToString"));
        assert!(is_member_name("#ctor"));
        assert!(is_member_name("Select``2"));
        assert!(is_member_name(
            "System#Collections#Generic#IEnumerable{System#Int32}#GetEnumerator"
        ));
        assert!(!is_member_name(""));
        assert!(!is_member_name("Bad Name"));
        assert!(!is_member_name("Open{"));
        assert!(!is_member_name("Close}"));
        assert!(!is_member_name("#"));
        assert!(!is_member_name("##"));
    }

    #[test]
    fn closed_argument_lists() {
        assert!(has_closed_argument_list("M:N.T.Run"));
        assert!(has_closed_argument_list("M:N.T.Run(System.Int32)"));
        assert!(!has_closed_argument_list("M:N.T.Run("));
        assert!(!has_closed_argument_list("M:N.T.Run)("));
    }

    #[test]
    fn bracket_check_reports_first_unclosed() {
        assert!(check_brackets("T:N.G{A,B}").is_ok());
        match check_brackets("T:N.G{A.H{B}") {
            Err(CerLinkError::UnterminatedBracket { position, .. }) => assert_eq!(position, 5),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn type_paths() {
        assert!(is_simple_type_path("System.String"));
        assert!(is_simple_type_path("N.Outer`1.Inner`2"));
        assert!(!is_simple_type_path("N..T"));
        assert!(!is_simple_type_path("N.T`"));
        assert!(is_namespace_path(""));
    }

    #[test]
    fn last_dot_skips_nested_arguments() {
        assert_eq!(last_top_level_dot("N.G{System.Int32}"), Some(1));
        assert_eq!(last_top_level_dot("NoDots"), None);
    }
}
