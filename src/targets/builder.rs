//! Builds targets and references from reflection XML.
//!
//! Every function takes a `source` label (usually the file path) that is
//! attached to schema errors.

use roxmltree::{Document, Node};

use super::target::*;
use crate::cer::{
    decompose_member_identifier, ArrayTypeReference, ExtensionMethodReference,
    IndexedTemplateTypeReference, MemberReference, MethodTemplateTypeReference,
    NamedTemplateTypeReference, NamespaceReference, Parameter, PointerTypeReference, Reference,
    ReferenceTypeReference, SimpleMemberReference, SimpleTypeReference, Specialization,
    SpecializedMemberReference, SpecializedTypeReference, TemplateTypeReference, TypeReference,
    TypeTemplateTypeReference,
};
use crate::errors::{CerLinkError, Result};
use crate::types::LinkCategory;

/// Builds a target for every documented `api` element of a reflection file
/// (`/*/apis/api`), skipping those marked `topicdata/@notopic`.
pub fn build_targets(doc: &Document, source: &str) -> Result<Vec<Target>> {
    let root = doc.root_element();
    let mut targets = Vec::new();

    for apis in element_children(root, "apis") {
        for api in element_children(apis, "api") {
            if child(api, "topicdata").is_some_and(|t| t.has_attribute("notopic")) {
                continue;
            }
            if let Some(target) = create_target(api, source)? {
                targets.push(target);
            }
        }
    }

    Ok(targets)
}

/// Builds the target described by one `api` element. Groups other than
/// namespace, type and member yield `None`.
pub fn create_target(api: Node, source: &str) -> Result<Option<Target>> {
    let id = api.attribute("id").unwrap_or_default();
    if id.is_empty() {
        return Err(schema_error("api element has no id", source));
    }

    let container = child_attribute(api, &["containers", "library"], "assembly").unwrap_or_default();
    let file = child_attribute(api, &["file"], "name").unwrap_or_default();
    if file.is_empty() {
        return Err(schema_error(format!("target '{id}' has no file"), source));
    }

    let group = child_attribute(api, &["apidata"], "group").unwrap_or_default();
    let kind = match group {
        "namespace" => Some(TargetKind::Namespace(NamespaceTarget {
            name: child_attribute(api, &["apidata"], "name")
                .unwrap_or_default()
                .to_string(),
        })),
        "type" => Some(create_type_target(api, id, container, file, source)?),
        "member" => Some(TargetKind::Member(create_member_target(api, source)?)),
        _ => {
            tracing::debug!(id = %id, group = %group, "skipping api with unknown group");
            None
        }
    };

    Ok(kind.map(|kind| Target {
        id: id.to_string(),
        container: container.to_string(),
        file: file.to_string(),
        link_category: LinkCategory::None,
        kind,
    }))
}

fn create_type_target(
    api: Node,
    id: &str,
    container: &str,
    file: &str,
    source: &str,
) -> Result<TargetKind> {
    let type_target = TypeTarget {
        name: child_attribute(api, &["apidata"], "name")
            .unwrap_or_default()
            .to_string(),
        namespace: NamespaceReference {
            id: child_attribute(api, &["containers", "namespace"], "api")
                .unwrap_or_default()
                .to_string(),
        },
        containing_type: child_attribute(api, &["containers", "type"], "api")
            .map(SimpleTypeReference::new),
        templates: template_names(api),
    };

    if child_attribute(api, &["apidata"], "subgroup") != Some("enumeration") {
        return Ok(TargetKind::Type(type_target));
    }

    let mut elements = Vec::new();
    if let Some(list) = child(api, "elements") {
        for element in element_children(list, "element") {
            let member_id = element.attribute("api").unwrap_or_default();
            if member_id.is_empty() {
                return Err(schema_error(
                    format!("enumeration '{id}' has an element without an api"),
                    source,
                ));
            }
            elements.push(Target {
                id: member_id.to_string(),
                container: container.to_string(),
                file: file.to_string(),
                link_category: LinkCategory::None,
                kind: TargetKind::Member(MemberTarget {
                    name: enumerator_name(api, element, member_id),
                    containing_type: SimpleTypeReference::new(id),
                    overload_id: None,
                    detail: MemberDetail::Plain,
                }),
            });
        }
    }

    Ok(TargetKind::Enumeration(EnumerationTarget {
        type_target,
        elements,
    }))
}

/// Name of an enumerator: its own name data, else the name recorded on the
/// enumerator's own `api` element in the same file, else the tail of its id.
fn enumerator_name(type_api: Node, element: Node, member_id: &str) -> String {
    if let Some(name) = child_attribute(element, &["apidata"], "name")
        .or_else(|| element.attribute("name"))
        .filter(|n| !n.is_empty())
    {
        return name.to_string();
    }

    let sibling = type_api
        .parent()
        .into_iter()
        .flat_map(|apis| element_children(apis, "api"))
        .find(|a| a.attribute("id") == Some(member_id))
        .and_then(|a| child_attribute(a, &["apidata"], "name"))
        .filter(|n| !n.is_empty());
    if let Some(name) = sibling {
        return name.to_string();
    }

    decompose_member_identifier(member_id).member_name
}

fn create_member_target(api: Node, source: &str) -> Result<MemberTarget> {
    let name = child_attribute(api, &["apidata"], "name")
        .unwrap_or_default()
        .to_string();
    let containing_type = child_attribute(api, &["containers", "type"], "api")
        .map(SimpleTypeReference::new)
        .ok_or_else(|| {
            schema_error(
                format!(
                    "member '{}' has no containing type",
                    api.attribute("id").unwrap_or_default()
                ),
                source,
            )
        })?;
    let overload_id = child_attribute(api, &["overload"], "api")
        .or_else(|| child_attribute(api, &["memberdata"], "overload"))
        .filter(|o| !o.is_empty())
        .map(str::to_string);

    let subgroup = child_attribute(api, &["apidata"], "subgroup").unwrap_or_default();
    let detail = match subgroup {
        "constructor" => MemberDetail::Constructor(ConstructorTarget {
            parameters: create_parameters(api, source)?,
        }),
        "method" => {
            let templates = template_names(api);
            let template_arguments = match child(api, "templates") {
                Some(list) if list.children().any(|c| c.is_element() && !c.has_tag_name("template")) => {
                    Some(create_type_list(list, source)?)
                }
                _ => None,
            };
            create_procedure(
                api,
                &name,
                ProcedureKind::Method(MethodTarget {
                    parameters: create_parameters(api, source)?,
                    return_type: create_return_type(api, source)?,
                    templates,
                    template_arguments,
                }),
                source,
            )?
        }
        "property" => create_procedure(
            api,
            &name,
            ProcedureKind::Property(PropertyTarget {
                parameters: create_parameters(api, source)?,
                return_type: create_return_type(api, source)?,
            }),
            source,
        )?,
        "event" => create_procedure(api, &name, ProcedureKind::Event, source)?,
        _ => MemberDetail::Plain,
    };

    Ok(MemberTarget {
        name,
        containing_type,
        overload_id,
        detail,
    })
}

fn create_procedure(api: Node, name: &str, kind: ProcedureKind, source: &str) -> Result<MemberDetail> {
    let is_conversion_operator = child_attribute(api, &["apidata"], "subsubgroup")
        == Some("operator")
        && (name == "Explicit" || name == "Implicit");

    let is_private = child_attribute(api, &["memberdata"], "visibility") == Some("private");
    let is_virtual = child_attribute(api, &["proceduredata"], "virtual") == Some("true");
    let explicitly_implements = match child(api, "implements").and_then(|i| child(i, "member")) {
        Some(member) if is_private && is_virtual => Some(create_member_reference(member, source)?),
        _ => None,
    };

    Ok(MemberDetail::Procedure(ProcedureTarget {
        explicitly_implements,
        is_conversion_operator,
        kind,
    }))
}

/// Builds a reference from any reflection element that describes a type,
/// member or namespace.
pub fn create_reference(node: Node, source: &str) -> Result<Reference> {
    match node.tag_name().name() {
        "namespace" => Ok(Reference::Namespace(NamespaceReference {
            id: node.attribute("api").unwrap_or_default().to_string(),
        })),
        "member" => Ok(Reference::Member(create_member_reference(node, source)?)),
        _ => Ok(Reference::Type(create_type_reference(node, source)?)),
    }
}

/// Builds a member reference from a `member` element. A nested specialized
/// `type` element makes the reference specialized.
pub fn create_member_reference(node: Node, source: &str) -> Result<MemberReference> {
    let api = node.attribute("api").unwrap_or_default();
    if api.is_empty() {
        return Err(schema_error("member element has no api", source));
    }
    let template_member = SimpleMemberReference::new(api);

    if let Some(type_node) = child(node, "type") {
        if let TypeReference::Specialized(specialized_type) = create_type_reference(type_node, source)? {
            return Ok(MemberReference::Specialized(SpecializedMemberReference {
                template_member,
                specialized_type,
            }));
        }
    }

    Ok(MemberReference::Simple(template_member))
}

/// Builds a type reference from one of the type element shapes
/// (`type`, `arrayOf`, `referenceTo`, `pointerTo`, `template`).
pub fn create_type_reference(node: Node, source: &str) -> Result<TypeReference> {
    match node.tag_name().name() {
        "type" => {
            let api = node.attribute("api").unwrap_or_default();
            let specializations = create_specializations(node, source)?;
            if specializations.is_empty() {
                Ok(TypeReference::Simple(SimpleTypeReference::new(api)))
            } else {
                Ok(TypeReference::Specialized(SpecializedTypeReference {
                    specializations,
                }))
            }
        }
        "arrayOf" => {
            let rank = node
                .attribute("rank")
                .and_then(|r| r.parse::<usize>().ok())
                .unwrap_or(1)
                .max(1);
            Ok(TypeReference::Array(ArrayTypeReference {
                element_type: Box::new(create_inner_type(node, source)?),
                rank,
            }))
        }
        "referenceTo" => Ok(TypeReference::Reference(ReferenceTypeReference {
            referred_type: Box::new(create_inner_type(node, source)?),
        })),
        "pointerTo" => Ok(TypeReference::Pointer(PointerTypeReference {
            pointed_type: Box::new(create_inner_type(node, source)?),
        })),
        "template" => Ok(TypeReference::Template(create_template_reference(node))),
        other => Err(schema_error(
            format!("unexpected type element '{other}'"),
            source,
        )),
    }
}

/// Specialization chain of a `type` element, outermost first. A nested
/// `type` child describes the outer type.
fn create_specializations(node: Node, source: &str) -> Result<Vec<Specialization>> {
    let mut chain = match child(node, "type") {
        Some(outer) => create_specializations(outer, source)?,
        None => Vec::new(),
    };

    let template = SimpleTypeReference::new(node.attribute("api").unwrap_or_default());
    if let Some(specialization) = child(node, "specialization") {
        chain.push(Specialization {
            template,
            arguments: create_type_list(specialization, source)?,
        });
    } else if !chain.is_empty() {
        chain.push(Specialization {
            template,
            arguments: Vec::new(),
        });
    }

    Ok(chain)
}

fn create_template_reference(node: Node) -> TemplateTypeReference {
    let index = node.attribute("index").and_then(|i| i.parse::<usize>().ok());

    match (node.attribute("api"), index) {
        (Some(api), Some(position)) if !api.is_empty() => {
            TemplateTypeReference::Indexed(IndexedTemplateTypeReference::new(api, position))
        }
        (_, Some(position)) => {
            if let Some(owner) = child(node, "type").and_then(|t| t.attribute("api")) {
                TemplateTypeReference::TypeTemplate(TypeTemplateTypeReference {
                    template_type: SimpleTypeReference::new(owner),
                    position,
                })
            } else if let Some(owner) = child(node, "member").and_then(|m| m.attribute("api")) {
                TemplateTypeReference::MethodTemplate(MethodTemplateTypeReference {
                    template_method: SimpleMemberReference::new(owner),
                    position,
                })
            } else {
                named_template(node)
            }
        }
        _ => named_template(node),
    }
}

fn named_template(node: Node) -> TemplateTypeReference {
    TemplateTypeReference::Named(NamedTemplateTypeReference {
        name: node.attribute("name").unwrap_or_default().to_string(),
    })
}

/// Builds an extension-method reference from an `api`-shaped element.
pub fn create_extension_method_reference(node: Node, source: &str) -> Result<ExtensionMethodReference> {
    let name = child_attribute(node, &["apidata"], "name")
        .unwrap_or_default()
        .to_string();
    let parameters = create_parameters(node, source)?;
    let template_arguments = match child(node, "templates") {
        Some(list) => Some(create_type_list(list, source)?),
        None => None,
    };

    Ok(ExtensionMethodReference {
        name,
        parameters,
        template_arguments,
    })
}

fn create_parameters(api: Node, source: &str) -> Result<Vec<Parameter>> {
    let Some(list) = child(api, "parameters") else {
        return Ok(Vec::new());
    };

    element_children(list, "parameter")
        .map(|parameter| {
            let name = parameter.attribute("name").unwrap_or_default();
            Ok(Parameter::new(name, create_inner_type(parameter, source)?))
        })
        .collect()
}

fn create_return_type(api: Node, source: &str) -> Result<Option<TypeReference>> {
    match child(api, "returns").and_then(first_element) {
        Some(node) => Ok(Some(create_type_reference(node, source)?)),
        None => Ok(None),
    }
}

fn create_type_list(list: Node, source: &str) -> Result<Vec<TypeReference>> {
    list.children()
        .filter(|c| c.is_element())
        .map(|c| create_type_reference(c, source))
        .collect()
}

fn create_inner_type(node: Node, source: &str) -> Result<TypeReference> {
    match first_element(node) {
        Some(inner) => create_type_reference(inner, source),
        None => Err(schema_error(
            format!("'{}' element has no type", node.tag_name().name()),
            source,
        )),
    }
}

fn template_names(api: Node) -> Vec<String> {
    child(api, "templates")
        .map(|list| {
            element_children(list, "template")
                .map(|t| t.attribute("name").unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn schema_error(message: impl Into<String>, source: &str) -> CerLinkError {
    CerLinkError::Schema {
        message: message.into(),
        path: source.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Navigation helpers
// ---------------------------------------------------------------------------

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn element_children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children().filter(move |c| c.has_tag_name(name))
}

fn first_element<'a, 'input>(node: Node<'a, 'input>) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.is_element())
}

/// Attribute of the element reached by following `path` from `node`.
fn child_attribute<'a, 'input>(node: Node<'a, 'input>, path: &[&str], attribute: &str) -> Option<&'a str> {
    let mut current = node;
    for step in path {
        current = child(current, step)?;
    }
    current.attribute(attribute)
}
