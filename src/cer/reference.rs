use std::collections::HashMap;

/// A mention of a documentable entity, resolved or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Namespace(NamespaceReference),
    Type(TypeReference),
    Member(MemberReference),
    ExtensionMethod(ExtensionMethodReference),
    Invalid(InvalidReference),
}

impl Reference {
    /// Returns `true` for the terminal "could not parse" marker.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Reference::Invalid(_))
    }
}

/// A namespace, by `N:` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamespaceReference {
    pub id: String,
}

/// Terminal marker for an identifier that matched no grammar production.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidReference {
    pub id: String,
}

/// Any type expression that can appear in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeReference {
    Simple(SimpleTypeReference),
    Specialized(SpecializedTypeReference),
    Array(ArrayTypeReference),
    Reference(ReferenceTypeReference),
    Pointer(PointerTypeReference),
    Template(TemplateTypeReference),
}

/// A type named by its `T:` id, generic or not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleTypeReference {
    pub id: String,
}

impl SimpleTypeReference {
    /// Wraps a `T:` id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// One generic template paired with its concrete arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Specialization {
    pub template: SimpleTypeReference,
    pub arguments: Vec<TypeReference>,
}

impl Specialization {
    /// Number of generic parameters the template declares on its own
    /// (last) path segment.
    pub fn template_arity(&self) -> usize {
        let last = self.template.id.rsplit('.').next().unwrap_or_default();
        match last.rfind('`') {
            Some(tick) => last[tick + 1..].parse().unwrap_or(0),
            None => 0,
        }
    }
}

/// A chain of specializations, outermost type first. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecializedTypeReference {
    pub specializations: Vec<Specialization>,
}

impl SpecializedTypeReference {
    /// The generic template of the innermost specialization.
    pub fn template_type(&self) -> Option<&SimpleTypeReference> {
        self.specializations.last().map(|s| &s.template)
    }

    /// Maps every template parameter position along the chain to the
    /// concrete argument supplied for it.
    pub fn specialization_dictionary(&self) -> SpecializationDictionary {
        let mut dictionary = HashMap::new();
        for specialization in &self.specializations {
            for (position, argument) in specialization.arguments.iter().enumerate() {
                let key = IndexedTemplateTypeReference::new(&specialization.template.id, position);
                dictionary.insert(key, argument.clone());
            }
        }
        dictionary
    }
}

/// Substitutions applied while rendering members reached through a
/// specialized type.
pub type SpecializationDictionary = HashMap<IndexedTemplateTypeReference, TypeReference>;

/// An array of `rank` dimensions (`[]`, `[,]`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArrayTypeReference {
    pub element_type: Box<TypeReference>,
    pub rank: usize,
}

/// A by-ref (`@`) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceTypeReference {
    pub referred_type: Box<TypeReference>,
}

/// An unmanaged pointer (`*`) type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointerTypeReference {
    pub pointed_type: Box<TypeReference>,
}

/// A generic parameter, in whichever form the source named it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TemplateTypeReference {
    Indexed(IndexedTemplateTypeReference),
    Named(NamedTemplateTypeReference),
    TypeTemplate(TypeTemplateTypeReference),
    MethodTemplate(MethodTemplateTypeReference),
}

/// A generic parameter identified by its owner and position. Two of these
/// are equal when both owner id and position match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexedTemplateTypeReference {
    pub template_id: String,
    pub position: usize,
}

impl IndexedTemplateTypeReference {
    pub fn new(template_id: impl Into<String>, position: usize) -> Self {
        Self {
            template_id: template_id.into(),
            position,
        }
    }
}

/// A generic parameter known only by name, or by a placeholder label when
/// no context was available.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NamedTemplateTypeReference {
    pub name: String,
}

/// The `position`th generic parameter of a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeTemplateTypeReference {
    pub template_type: SimpleTypeReference,
    pub position: usize,
}

/// The `position`th generic parameter of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodTemplateTypeReference {
    pub template_method: SimpleMemberReference,
    pub position: usize,
}

/// A method, property, field, event or overload group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberReference {
    Simple(SimpleMemberReference),
    Specialized(SpecializedMemberReference),
    SpecializedWithParameters(SpecializedMemberWithParametersReference),
}

/// A member named by its full id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimpleMemberReference {
    pub id: String,
}

impl SimpleMemberReference {
    /// Wraps a member id.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// A member of a generic instantiation that maps onto a known template member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecializedMemberReference {
    pub template_member: SimpleMemberReference,
    pub specialized_type: SpecializedTypeReference,
}

/// A member of a generic instantiation whose template member cannot be
/// named by id, because each parameter type may come from either the
/// template or the instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecializedMemberWithParametersReference {
    pub prefix: String,
    pub specialized_type: SpecializedTypeReference,
    pub member_name: String,
    pub parameter_types: Vec<TypeReference>,
}

/// An extension method as reflection records it at a call site.
/// `template_arguments` is `None` when the method is not generic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtensionMethodReference {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub template_arguments: Option<Vec<TypeReference>>,
}

/// A named, typed parameter of a method, property or constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub parameter_type: TypeReference,
}

impl Parameter {
    pub fn new(name: impl Into<String>, parameter_type: TypeReference) -> Self {
        Self {
            name: name.into(),
            parameter_type,
        }
    }
}
