use super::fallback::{
    generated_template_names, member_name, namespace_name, own_arity, strip_arity, type_segments,
    UNKNOWN_ARGUMENT_TYPE, UNKNOWN_TEMPLATE_TYPE,
};
use super::markup::{DialectText, Markup, MarkupWriter};
use crate::cer::{
    decompose_member_identifier, generic_arity, separate_types, CerParser, ExtensionMethodReference,
    IndexedTemplateTypeReference, MemberReference, NamedTemplateTypeReference,
    NamespaceReference, Parameter, Reference, SimpleTypeReference, SpecializationDictionary,
    SpecializedMemberWithParametersReference, SpecializedTypeReference, TemplateTypeReference,
    TypeReference,
};
use crate::targets::{
    MemberDetail, MemberTarget, ProcedureKind, ProcedureTarget, Target, TargetKind,
    TargetTypeDictionary, TypeTarget,
};
use crate::types::DisplayOptions;

/// Renders targets and references as multi-dialect display text.
///
/// Targets are looked up in the dictionary stack when a reference names
/// one; anything not indexed falls back to a name reconstructed from its
/// id.
pub struct LinkTextResolver<'a> {
    targets: &'a TargetTypeDictionary,
}

impl<'a> LinkTextResolver<'a> {
    pub fn new(targets: &'a TargetTypeDictionary) -> Self {
        Self { targets }
    }

    pub fn render_target(&self, target: &Target, options: DisplayOptions) -> Vec<Markup> {
        let mut w = MarkupWriter::new();
        self.write_target(target, options, &mut w);
        w.finish()
    }

    pub fn render_reference(&self, reference: &Reference, options: DisplayOptions) -> Vec<Markup> {
        let mut w = MarkupWriter::new();
        self.write_reference(reference, options, &mut w);
        w.finish()
    }

    pub fn write_target(&self, target: &Target, options: DisplayOptions, w: &mut MarkupWriter) {
        match &target.kind {
            TargetKind::Namespace(ns) => w.text(ns.display_name()),
            TargetKind::Type(t) => self.write_type_target(t, options, true, w),
            TargetKind::Enumeration(e) => self.write_type_target(&e.type_target, options, true, w),
            TargetKind::Member(m) => self.write_member_target(m, options, w, None, None),
        }
    }

    pub fn write_reference(&self, reference: &Reference, options: DisplayOptions, w: &mut MarkupWriter) {
        match reference {
            Reference::Namespace(ns) => self.write_namespace(ns, w),
            Reference::Type(t) => self.write_type(t, options, w, None),
            Reference::Member(m) => self.write_member_reference(m, options, w, None),
            Reference::ExtensionMethod(e) => self.write_extension_method(e, options, w),
            Reference::Invalid(invalid) => w.text(&format!("[{}]", invalid.id)),
        }
    }

    // -----------------------------------------------------------------------
    // Namespaces and types
    // -----------------------------------------------------------------------

    fn write_namespace(&self, ns: &NamespaceReference, w: &mut MarkupWriter) {
        match self.targets.get(&ns.id).map(|t| &t.kind) {
            Some(TargetKind::Namespace(target)) => w.text(target.display_name()),
            _ => w.text(namespace_name(&ns.id)),
        }
    }

    fn write_type_target(
        &self,
        target: &TypeTarget,
        options: DisplayOptions,
        show_outer_type: bool,
        w: &mut MarkupWriter,
    ) {
        if options.contains(DisplayOptions::SHOW_CONTAINER) {
            let id = target.namespace.id.as_str();
            if !id.is_empty() && id != "N:" {
                self.write_namespace(&target.namespace, w);
                write_separator(w);
            }
        }

        if show_outer_type {
            if let Some(outer) = &target.containing_type {
                self.write_simple_type(outer, DisplayOptions::SHOW_TEMPLATES, w);
                write_separator(w);
            }
        }

        w.text(&target.name);

        if options.contains(DisplayOptions::SHOW_TEMPLATES) {
            write_template_parameters(&target.templates, w);
        }
    }

    /// Writes any type reference, substituting indexed template parameters
    /// found in `dictionary`.
    pub fn write_type(
        &self,
        reference: &TypeReference,
        options: DisplayOptions,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        match reference {
            TypeReference::Simple(simple) => self.write_simple_type(simple, options, w),
            TypeReference::Specialized(specialized) => {
                self.write_specialized_type(specialized, options, w, dictionary)
            }
            TypeReference::Array(array) => {
                w.dialects(DialectText::new("", "", "array<", "", ""));
                self.write_type(&array.element_type, options, w, dictionary);
                let commas = ",".repeat(array.rank.saturating_sub(1));
                let cpp = if array.rank > 1 {
                    format!(", {}>", array.rank)
                } else {
                    ">".to_string()
                };
                let brackets = format!("[{commas}]");
                w.dialects(DialectText::new(
                    &brackets,
                    &format!("({commas})"),
                    &cpp,
                    &brackets,
                    &brackets,
                ));
            }
            TypeReference::Reference(by_ref) => {
                self.write_type(&by_ref.referred_type, options, w, dictionary);
                w.dialects(DialectText::new("", "", "%", "", ""));
            }
            TypeReference::Pointer(pointer) => {
                self.write_type(&pointer.pointed_type, options, w, dictionary);
                w.text("*");
            }
            TypeReference::Template(template) => {
                self.write_template_type(template, options, w, dictionary)
            }
        }
    }

    fn write_simple_type(&self, simple: &SimpleTypeReference, options: DisplayOptions, w: &mut MarkupWriter) {
        if let Some(target) = self.targets.get(&simple.id).and_then(Target::as_type) {
            self.write_type_target(target, options, true, w);
            return;
        }

        let segments = type_segments(&simple.id);
        if options.contains(DisplayOptions::SHOW_CONTAINER) {
            for (i, segment) in segments.iter().enumerate() {
                if i > 0 {
                    write_separator(w);
                }
                w.text(segment);
            }
        } else if let Some(last) = segments.last() {
            w.text(last);
        }

        if options.contains(DisplayOptions::SHOW_TEMPLATES) {
            let arity = own_arity(&simple.id);
            write_template_parameters(&generated_template_names(arity), w);
        }
    }

    /// Name of a type without namespace or outer type.
    fn write_type_name(&self, simple: &SimpleTypeReference, w: &mut MarkupWriter) {
        match self.targets.get(&simple.id).and_then(Target::as_type) {
            Some(target) => w.text(&target.name),
            None => {
                if let Some(last) = type_segments(&simple.id).last() {
                    w.text(last);
                }
            }
        }
    }

    fn write_specialized_type(
        &self,
        specialized: &SpecializedTypeReference,
        options: DisplayOptions,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        for (i, specialization) in specialized.specializations.iter().enumerate() {
            if i == 0 {
                self.write_simple_type(
                    &specialization.template,
                    options.without(DisplayOptions::SHOW_TEMPLATES),
                    w,
                );
            } else {
                write_separator(w);
                self.write_type_name(&specialization.template, w);
            }
            if !specialization.arguments.is_empty() {
                self.write_template_arguments(&specialization.arguments, w, dictionary);
            }
        }
    }

    fn write_template_type(
        &self,
        template: &TemplateTypeReference,
        options: DisplayOptions,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        let (owner, position) = match template {
            TemplateTypeReference::Named(NamedTemplateTypeReference { name }) => {
                write_template_name(name, w);
                return;
            }
            TemplateTypeReference::Indexed(indexed) => (indexed.template_id.as_str(), indexed.position),
            TemplateTypeReference::TypeTemplate(t) => (t.template_type.id.as_str(), t.position),
            TemplateTypeReference::MethodTemplate(m) => (m.template_method.id.as_str(), m.position),
        };

        let key = IndexedTemplateTypeReference::new(owner, position);
        if let Some(argument) = dictionary.and_then(|d| d.get(&key)) {
            self.write_type(argument, options, w, None);
            return;
        }

        let name = self.template_name(owner, position);
        write_template_name(&name, w);
    }

    /// Name of the generic parameter at `position` of `owner`.
    fn template_name(&self, owner: &str, position: usize) -> String {
        let names = match self.targets.get(owner).map(|t| &t.kind) {
            Some(TargetKind::Type(t)) => t.templates.clone(),
            Some(TargetKind::Enumeration(e)) => e.type_target.templates.clone(),
            Some(TargetKind::Member(MemberTarget {
                detail:
                    MemberDetail::Procedure(ProcedureTarget {
                        kind: ProcedureKind::Method(method),
                        ..
                    }),
                ..
            })) => method.templates.clone(),
            Some(_) => Vec::new(),
            None if owner.starts_with("T:") => generated_template_names(generic_arity(owner)),
            None => generated_template_names(own_arity(&decompose_member_identifier(owner).member_name)),
        };

        names
            .get(position)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_TEMPLATE_TYPE.to_string())
    }

    fn write_template_arguments(
        &self,
        arguments: &[TypeReference],
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        w.dialects(template_open());
        for (i, argument) in arguments.iter().enumerate() {
            if i > 0 {
                w.text(", ");
            }
            self.write_type(argument, DisplayOptions::SHOW_TEMPLATES, w, dictionary);
        }
        w.dialects(template_close());
    }

    // -----------------------------------------------------------------------
    // Members
    // -----------------------------------------------------------------------

    fn write_member_target(
        &self,
        member: &MemberTarget,
        options: DisplayOptions,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
        specialized_container: Option<&SpecializedTypeReference>,
    ) {
        if let MemberDetail::Constructor(constructor) = &member.detail {
            match specialized_container {
                Some(specialized) => self.write_specialized_type(specialized, options, w, dictionary),
                None => self.write_simple_type(&member.containing_type, options, w),
            }
            if options.contains(DisplayOptions::SHOW_PARAMETERS) {
                self.write_parameters(&constructor.parameters, w, dictionary);
            }
            return;
        }

        if options.contains(DisplayOptions::SHOW_CONTAINER) {
            let container_options = options.without(DisplayOptions::SHOW_CONTAINER);
            match specialized_container {
                Some(specialized) => {
                    self.write_specialized_type(specialized, container_options, w, dictionary)
                }
                None => self.write_simple_type(&member.containing_type, container_options, w),
            }
            write_separator(w);
        }

        let MemberDetail::Procedure(procedure) = &member.detail else {
            w.text(&member.name);
            return;
        };

        self.write_procedure_name(member, procedure, options, w);

        match &procedure.kind {
            ProcedureKind::Method(method) => {
                if options.contains(DisplayOptions::SHOW_TEMPLATES) {
                    match &method.template_arguments {
                        Some(arguments) => self.write_template_arguments(arguments, w, dictionary),
                        None => write_template_parameters(&method.templates, w),
                    }
                }
                if options.contains(DisplayOptions::SHOW_PARAMETERS) {
                    if procedure.is_conversion_operator {
                        self.write_conversion_parameters(
                            &method.parameters,
                            method.return_type.as_ref(),
                            w,
                            dictionary,
                        );
                    } else {
                        self.write_parameters(&method.parameters, w, dictionary);
                    }
                }
            }
            ProcedureKind::Property(property) => {
                if options.contains(DisplayOptions::SHOW_PARAMETERS) && !property.parameters.is_empty() {
                    w.dialects(DialectText::new("[", "(", "[", "(", " "));
                    self.write_type_list(property.parameters.iter().map(|p| &p.parameter_type), w, dictionary);
                    w.dialects(DialectText::new("]", ")", "]", ")", ""));
                }
            }
            ProcedureKind::Event => {}
        }
    }

    fn write_procedure_name(
        &self,
        member: &MemberTarget,
        procedure: &ProcedureTarget,
        options: DisplayOptions,
        w: &mut MarkupWriter,
    ) {
        if let Some(implemented) = &procedure.explicitly_implements {
            let implemented_options = DisplayOptions::SHOW_CONTAINER
                | (options & DisplayOptions::SHOW_TEMPLATES);
            self.write_member_reference(implemented, implemented_options, w, None);
        } else if procedure.is_conversion_operator {
            let vb = match member.name.as_str() {
                "Explicit" => "Narrowing",
                "Implicit" => "Widening",
                other => other,
            };
            let name = member.name.as_str();
            w.dialects(DialectText::new(name, vb, name, name, name));
        } else {
            w.text(&member.name);
        }
    }

    fn write_member_reference(
        &self,
        reference: &MemberReference,
        options: DisplayOptions,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        match reference {
            MemberReference::Simple(simple) => match self.targets.get(&simple.id) {
                Some(Target {
                    kind: TargetKind::Member(member),
                    ..
                }) => self.write_member_target(member, options, w, dictionary, None),
                Some(other) => self.write_target(other, options, w),
                None => self.write_member_fallback(&simple.id, options, w, dictionary),
            },
            MemberReference::Specialized(specialized) => {
                let substitutions = specialized.specialized_type.specialization_dictionary();
                match self.targets.get(&specialized.template_member.id).and_then(Target::as_member) {
                    Some(member) => self.write_member_target(
                        member,
                        options,
                        w,
                        Some(&substitutions),
                        Some(&specialized.specialized_type),
                    ),
                    None => {
                        if options.contains(DisplayOptions::SHOW_CONTAINER) {
                            self.write_specialized_type(
                                &specialized.specialized_type,
                                options.without(DisplayOptions::SHOW_CONTAINER),
                                w,
                                None,
                            );
                            write_separator(w);
                        }
                        self.write_member_fallback(
                            &specialized.template_member.id,
                            options.without(DisplayOptions::SHOW_CONTAINER),
                            w,
                            Some(&substitutions),
                        );
                    }
                }
            }
            MemberReference::SpecializedWithParameters(specialized) => {
                self.write_specialized_member_with_parameters(specialized, options, w)
            }
        }
    }

    fn write_specialized_member_with_parameters(
        &self,
        reference: &SpecializedMemberWithParametersReference,
        options: DisplayOptions,
        w: &mut MarkupWriter,
    ) {
        let substitutions = reference.specialized_type.specialization_dictionary();
        let is_constructor = matches!(reference.member_name.as_str(), "#ctor" | "#cctor");

        if is_constructor || options.contains(DisplayOptions::SHOW_CONTAINER) {
            self.write_specialized_type(
                &reference.specialized_type,
                options.without(DisplayOptions::SHOW_CONTAINER),
                w,
                None,
            );
        }
        if !is_constructor {
            if options.contains(DisplayOptions::SHOW_CONTAINER) {
                write_separator(w);
            }
            let name = strip_arity(&reference.member_name).replace('#', ".");
            w.text(&name);
        }

        if options.contains(DisplayOptions::SHOW_PARAMETERS) {
            self.write_parameter_list(reference.parameter_types.iter(), w, Some(&substitutions));
        }
    }

    /// Best-effort rendering of a member id with no indexed target.
    fn write_member_fallback(
        &self,
        id: &str,
        options: DisplayOptions,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        let parts = decompose_member_identifier(id);
        let is_constructor = matches!(parts.member_name.as_str(), "#ctor" | "#cctor");

        if options.contains(DisplayOptions::SHOW_CONTAINER) && !is_constructor {
            let container = SimpleTypeReference::new(&parts.type_cer);
            self.write_simple_type(&container, options.without(DisplayOptions::SHOW_CONTAINER), w);
            write_separator(w);
        }

        w.text(&member_name(&parts));

        if options.contains(DisplayOptions::SHOW_TEMPLATES) {
            let arity = own_arity(&parts.member_name);
            write_template_parameters(&generated_template_names(arity), w);
        }

        if options.contains(DisplayOptions::SHOW_PARAMETERS) {
            if let Some(arguments) = &parts.arguments {
                let parser = CerParser::new();
                let types: Vec<TypeReference> = separate_types(arguments)
                    .iter()
                    .map(|a| {
                        parser.parse_type_text(a).ok().flatten().unwrap_or_else(|| {
                            TypeReference::Template(TemplateTypeReference::Named(
                                NamedTemplateTypeReference {
                                    name: UNKNOWN_ARGUMENT_TYPE.to_string(),
                                },
                            ))
                        })
                    })
                    .collect();
                self.write_parameter_list(types.iter(), w, dictionary);
            }
        }
    }

    fn write_extension_method(&self, method: &ExtensionMethodReference, options: DisplayOptions, w: &mut MarkupWriter) {
        w.text(&method.name);

        if options.contains(DisplayOptions::SHOW_TEMPLATES) {
            if let Some(arguments) = method.template_arguments.as_ref().filter(|a| !a.is_empty()) {
                self.write_template_arguments(arguments, w, None);
            }
        }

        // The first parameter is the extended instance.
        if options.contains(DisplayOptions::SHOW_PARAMETERS) {
            self.write_parameter_list(method.parameters.iter().skip(1).map(|p| &p.parameter_type), w, None);
        }
    }

    // -----------------------------------------------------------------------
    // Parameter lists
    // -----------------------------------------------------------------------

    fn write_parameters(
        &self,
        parameters: &[Parameter],
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        self.write_parameter_list(parameters.iter().map(|p| &p.parameter_type), w, dictionary);
    }

    /// `(A, B)`; an empty list is `()` everywhere except Visual Basic,
    /// which omits it.
    fn write_parameter_list<'t>(
        &self,
        types: impl Iterator<Item = &'t TypeReference>,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        let types: Vec<&TypeReference> = types.collect();
        if types.is_empty() {
            w.dialects(DialectText::new("()", "", "()", "()", "()"));
            return;
        }
        w.text("(");
        self.write_type_list(types.into_iter(), w, dictionary);
        w.text(")");
    }

    fn write_type_list<'t>(
        &self,
        types: impl Iterator<Item = &'t TypeReference>,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        for (i, t) in types.enumerate() {
            if i > 0 {
                w.text(", ");
            }
            self.write_type(t, DisplayOptions::SHOW_TEMPLATES, w, dictionary);
        }
    }

    fn write_conversion_parameters(
        &self,
        parameters: &[Parameter],
        return_type: Option<&TypeReference>,
        w: &mut MarkupWriter,
        dictionary: Option<&SpecializationDictionary>,
    ) {
        w.text("(");
        if let Some(first) = parameters.first() {
            self.write_type(&first.parameter_type, DisplayOptions::SHOW_TEMPLATES, w, dictionary);
        }
        w.text(" to ");
        if let Some(return_type) = return_type {
            self.write_type(return_type, DisplayOptions::SHOW_TEMPLATES, w, dictionary);
        }
        w.text(")");
    }
}

fn write_separator(w: &mut MarkupWriter) {
    w.dialects(DialectText::new(".", ".", "::", ".", "."));
}

fn template_open() -> DialectText {
    DialectText::new("<", "(Of ", "<", "(", "<")
}

fn template_close() -> DialectText {
    DialectText::new(">", ")", ">", ")", ">")
}

fn write_template_parameters(names: &[String], w: &mut MarkupWriter) {
    if names.is_empty() {
        return;
    }
    w.dialects(template_open());
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            w.text(", ");
        }
        write_template_name(name, w);
    }
    w.dialects(template_close());
}

/// Generic parameter names carry a `'` prefix in F#.
fn write_template_name(name: &str, w: &mut MarkupWriter) {
    w.dialects(DialectText::new("", "", "", "", "'"));
    w.text(name);
}
