//! Display names reconstructed from CER text when no target is indexed.

use crate::cer::MemberIdentifier;
use crate::targets::DEFAULT_NAMESPACE_NAME;

/// Label written for an argument type that could not be parsed.
pub const UNKNOWN_ARGUMENT_TYPE: &str = "UAT";

/// Label written for a template position with no known name.
pub const UNKNOWN_TEMPLATE_TYPE: &str = "UTT";

/// Removes a trailing arity marker (`` `N `` or ``` ``N ```).
pub fn strip_arity(name: &str) -> &str {
    match name.find('`') {
        Some(tick) => &name[..tick],
        None => name,
    }
}

/// Arity declared on the last segment of a type or member name.
pub fn own_arity(name: &str) -> usize {
    name.rsplit_once('`')
        .and_then(|(_, n)| n.parse().ok())
        .unwrap_or(0)
}

/// Placeholder names for `count` generic parameters: `T` alone, or
/// `T1`..`Tn`.
pub fn generated_template_names(count: usize) -> Vec<String> {
    match count {
        0 => Vec::new(),
        1 => vec!["T".to_string()],
        n => (1..=n).map(|i| format!("T{i}")).collect(),
    }
}

/// Display name of a namespace id.
pub fn namespace_name(id: &str) -> &str {
    let name = id.strip_prefix("N:").unwrap_or(id);
    if name.is_empty() {
        DEFAULT_NAMESPACE_NAME
    } else {
        name
    }
}

/// Path segments of a type id, arity markers removed.
pub fn type_segments(id: &str) -> Vec<&str> {
    let body = id.strip_prefix("T:").unwrap_or(id);
    if body.is_empty() {
        return Vec::new();
    }
    body.split('.').map(strip_arity).collect()
}

/// Display name of a member: constructors take their type's name and
/// explicit-implementation separators become dots.
pub fn member_name(parts: &MemberIdentifier) -> String {
    let type_name = type_segments(&parts.type_cer)
        .last()
        .map(|s| s.to_string())
        .unwrap_or_default();

    match parts.member_name.as_str() {
        "#ctor" | "#cctor" => type_name,
        name => {
            let name = match name.rfind("``") {
                Some(tick) if name[tick + 2..].chars().all(|c| c.is_ascii_digit()) => &name[..tick],
                _ => name,
            };
            name.replace('#', ".")
        }
    }
}
