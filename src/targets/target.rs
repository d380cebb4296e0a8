use crate::cer::{MemberReference, NamespaceReference, Parameter, SimpleTypeReference, TypeReference};
use crate::types::LinkCategory;

/// Display name used for a namespace target without a name.
pub const DEFAULT_NAMESPACE_NAME: &str = "(Default Namespace)";

/// Something a link can point to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Code entity id, e.g. `T:System.String`.
    pub id: String,
    /// Owning assembly or module, possibly empty.
    pub container: String,
    /// Output file name of the target's topic.
    pub file: String,
    /// Stamped by the dictionary the target is registered in.
    pub link_category: LinkCategory,
    pub kind: TargetKind,
}

/// What a target describes.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetKind {
    Namespace(NamespaceTarget),
    Type(TypeTarget),
    Enumeration(EnumerationTarget),
    Member(MemberTarget),
}

/// A namespace topic. The default namespace has an empty name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceTarget {
    pub name: String,
}

impl NamespaceTarget {
    /// Name to show, with a fixed label for the default namespace.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            DEFAULT_NAMESPACE_NAME
        } else {
            &self.name
        }
    }
}

/// A class, struct, interface, delegate or enumeration type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeTarget {
    /// Name from the reflection data, without arity marker.
    pub name: String,
    pub namespace: NamespaceReference,
    /// Outer type of a nested type.
    pub containing_type: Option<SimpleTypeReference>,
    /// Generic parameter names, in declaration order.
    pub templates: Vec<String>,
}

/// An enumeration type together with one member target per enumerator.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumerationTarget {
    pub type_target: TypeTarget,
    pub elements: Vec<Target>,
}

/// A member of a type.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberTarget {
    pub name: String,
    pub containing_type: SimpleTypeReference,
    /// Id of the overload group this member belongs to.
    pub overload_id: Option<String>,
    pub detail: MemberDetail,
}

/// Member shape beyond the name and owner.
#[derive(Debug, Clone, PartialEq)]
pub enum MemberDetail {
    /// Fields and enumerators.
    Plain,
    Constructor(ConstructorTarget),
    Procedure(ProcedureTarget),
}

/// An instance or static constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorTarget {
    pub parameters: Vec<Parameter>,
}

/// A method, property or event.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureTarget {
    /// The interface member this one explicitly implements.
    pub explicitly_implements: Option<MemberReference>,
    pub is_conversion_operator: bool,
    pub kind: ProcedureKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProcedureKind {
    Method(MethodTarget),
    Property(PropertyTarget),
    Event,
}

/// Signature of a method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodTarget {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeReference>,
    pub templates: Vec<String>,
    /// Set when the method is shown partially specialized, e.g. an
    /// extension method as seen from the extended type.
    pub template_arguments: Option<Vec<TypeReference>>,
}

/// Signature of a property; indexers have parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyTarget {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<TypeReference>,
}

impl Target {
    /// Type data of a type or enumeration target.
    pub fn as_type(&self) -> Option<&TypeTarget> {
        match &self.kind {
            TargetKind::Type(t) => Some(t),
            TargetKind::Enumeration(e) => Some(&e.type_target),
            _ => None,
        }
    }

    /// Member data of a member target.
    pub fn as_member(&self) -> Option<&MemberTarget> {
        match &self.kind {
            TargetKind::Member(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` for enumeration types.
    pub fn is_enumeration(&self) -> bool {
        matches!(self.kind, TargetKind::Enumeration(_))
    }

    /// Overload group id of a member target, if it has one.
    pub fn overload_id(&self) -> Option<&str> {
        self.as_member()
            .and_then(|m| m.overload_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    /// Returns `true` for `op_Implicit`/`op_Explicit` style operators.
    pub fn is_conversion_operator(&self) -> bool {
        matches!(
            self.as_member().map(|m| &m.detail),
            Some(MemberDetail::Procedure(ProcedureTarget {
                is_conversion_operator: true,
                ..
            }))
        )
    }
}
