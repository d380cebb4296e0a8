use cerlink::cer::*;
use cerlink::errors::CerLinkError;

fn parse(api: &str) -> Reference {
    CerParser::new().parse_reference(api).unwrap()
}

#[test]
fn test_decompose_method_identifier() {
    let parts = decompose_member_identifier("M:N.T.Method(System.Int32)");
    assert_eq!(parts.type_cer, "T:N.T");
    assert_eq!(parts.member_name, "Method");
    assert_eq!(parts.arguments.as_deref(), Some("System.Int32"));
    assert_eq!(parts.return_type, None);
}

#[test]
fn test_decompose_without_arguments() {
    let parts = decompose_member_identifier("P:N.T.Count");
    assert_eq!(parts.type_cer, "T:N.T");
    assert_eq!(parts.member_name, "Count");
    assert!(parts.arguments.is_none());
}

#[test]
fn test_decompose_conversion_operator() {
    let parts = decompose_member_identifier("M:N.T.op_Explicit(N.T)~System.Int32");
    assert_eq!(parts.member_name, "op_Explicit");
    assert_eq!(parts.arguments.as_deref(), Some("N.T"));
    assert_eq!(parts.return_type.as_deref(), Some("System.Int32"));
}

#[test]
fn test_decompose_explicit_implementation() {
    let parts = decompose_member_identifier(
        "M:N.T.System#Collections#Generic#IEnumerable{System#Int32}#GetEnumerator",
    );
    assert_eq!(parts.type_cer, "T:N.T");
    assert_eq!(
        parts.member_name,
        "System#Collections#Generic#IEnumerable{System#Int32}#GetEnumerator"
    );
}

#[test]
fn test_decompose_constructor_of_specialized_type() {
    let parts = decompose_member_identifier("M:N.G{System.Int32}.#ctor");
    assert_eq!(parts.type_cer, "T:N.G{System.Int32}");
    assert_eq!(parts.member_name, "#ctor");
}

#[test]
fn test_separate_types_respects_braces() {
    let types = separate_types(
        "System.Collections.Generic.Dictionary{System.String,System.Int32},System.String",
    );
    assert_eq!(
        types,
        vec![
            "System.Collections.Generic.Dictionary{System.String,System.Int32}".to_string(),
            "System.String".to_string(),
        ]
    );
}

#[test]
fn test_separate_types_respects_array_bounds() {
    let types = separate_types("System.Int32[0:,0:], System.String");
    assert_eq!(types.len(), 2);
    assert_eq!(types[0], "System.Int32[0:,0:]");
    assert_eq!(types[1], "System.String");
    assert!(separate_types("").is_empty());
}

#[test]
fn test_parse_namespace() {
    assert_eq!(
        parse("N:System.Collections"),
        Reference::Namespace(NamespaceReference {
            id: "N:System.Collections".to_string()
        })
    );
    assert!(matches!(parse("N:"), Reference::Namespace(_)));
}

#[test]
fn test_parse_simple_type() {
    assert_eq!(
        parse("T:System.String"),
        Reference::Type(TypeReference::Simple(SimpleTypeReference::new(
            "T:System.String"
        )))
    );
}

#[test]
fn test_parse_array_ranks() {
    let expected = |rank| {
        Reference::Type(TypeReference::Array(ArrayTypeReference {
            element_type: Box::new(TypeReference::Simple(SimpleTypeReference::new(
                "T:System.String",
            ))),
            rank,
        }))
    };
    assert_eq!(parse("T:System.String[]"), expected(1));
    assert_eq!(parse("T:System.String[,]"), expected(2));
    assert_eq!(parse("T:System.String[0:,0:]"), expected(2));
}

#[test]
fn test_parse_by_ref_and_pointer() {
    let Reference::Type(TypeReference::Reference(by_ref)) = parse("T:System.Int32@") else {
        panic!("expected a by-ref type");
    };
    assert_eq!(
        *by_ref.referred_type,
        TypeReference::Simple(SimpleTypeReference::new("T:System.Int32"))
    );

    assert!(matches!(
        parse("T:System.Byte*"),
        Reference::Type(TypeReference::Pointer(_))
    ));
}

#[test]
fn test_parse_specialization() {
    let Reference::Type(TypeReference::Specialized(specialized)) = parse("T:N.Generic{System.Int32}")
    else {
        panic!("expected a specialized type");
    };
    assert_eq!(specialized.specializations.len(), 1);

    let specialization = &specialized.specializations[0];
    assert_eq!(specialization.template.id, "T:N.Generic`1");
    assert_eq!(specialization.template_arity(), 1);
    assert_eq!(
        specialization.arguments,
        vec![TypeReference::Simple(SimpleTypeReference::new(
            "T:System.Int32"
        ))]
    );
    assert_eq!(
        specialized.template_type().map(|t| t.id.as_str()),
        Some("T:N.Generic`1")
    );
}

#[test]
fn test_parse_nested_specialization_chain() {
    let Reference::Type(TypeReference::Specialized(specialized)) =
        parse("T:N.Outer{System.Int32}.Inner{System.String,System.Byte}")
    else {
        panic!("expected a specialized type");
    };
    let templates: Vec<&str> = specialized
        .specializations
        .iter()
        .map(|s| s.template.id.as_str())
        .collect();
    assert_eq!(templates, vec!["T:N.Outer`1", "T:N.Outer`1.Inner`2"]);
    assert_eq!(specialized.specializations[1].arguments.len(), 2);
}

#[test]
fn test_specialization_dictionary_covers_whole_chain() {
    let Reference::Type(TypeReference::Specialized(specialized)) =
        parse("T:N.Outer{System.Int32}.Inner{System.String}")
    else {
        panic!("expected a specialized type");
    };
    let dictionary = specialized.specialization_dictionary();
    assert_eq!(dictionary.len(), 2);
    assert_eq!(
        dictionary.get(&IndexedTemplateTypeReference::new("T:N.Outer`1.Inner`1", 0)),
        Some(&TypeReference::Simple(SimpleTypeReference::new(
            "T:System.String"
        )))
    );
}

#[test]
fn test_parse_simple_member() {
    assert_eq!(
        parse("M:N.T.Method(System.Int32,System.String)"),
        Reference::Member(MemberReference::Simple(SimpleMemberReference::new(
            "M:N.T.Method(System.Int32,System.String)"
        )))
    );
    assert!(matches!(parse("P:N.T.Item"), Reference::Member(_)));
    assert!(matches!(parse("Overload:N.T.Method"), Reference::Member(_)));
}

#[test]
fn test_parse_member_of_specialized_type() {
    let Reference::Member(MemberReference::Specialized(member)) = parse("F:N.G{System.Int32}.Value")
    else {
        panic!("expected a specialized member");
    };
    assert_eq!(member.template_member.id, "F:N.G`1.Value");
}

#[test]
fn test_parse_specialized_member_with_parameters() {
    let Reference::Member(MemberReference::SpecializedWithParameters(member)) =
        parse("M:N.G{System.Int32}.Add(System.String)")
    else {
        panic!("expected a specialized member with parameters");
    };
    assert_eq!(member.prefix, "M");
    assert_eq!(member.member_name, "Add");
    assert_eq!(member.parameter_types.len(), 1);
}

#[test]
fn test_placeholders_without_context_are_unknown() {
    let parser = CerParser::new();
    let parsed = parser.parse_type_text("`0").unwrap();
    assert_eq!(
        parsed,
        Some(TypeReference::Template(TemplateTypeReference::Named(
            NamedTemplateTypeReference {
                name: UNKNOWN_TYPE_PARAMETER.to_string()
            }
        )))
    );

    let parsed = parser.parse_type_text("``0").unwrap();
    assert_eq!(
        parsed,
        Some(TypeReference::Template(TemplateTypeReference::Named(
            NamedTemplateTypeReference {
                name: UNKNOWN_METHOD_PARAMETER.to_string()
            }
        )))
    );
}

#[test]
fn test_placeholders_resolve_against_context() {
    let mut parser = CerParser::new();
    parser.set_generic_context("M:N.G`1.Convert``1(`0)");

    assert_eq!(
        parser.parse_type_text("`0").unwrap(),
        Some(TypeReference::Template(TemplateTypeReference::Indexed(
            IndexedTemplateTypeReference::new("T:N.G`1", 0)
        )))
    );
    assert_eq!(
        parser.parse_type_text("``0").unwrap(),
        Some(TypeReference::Template(TemplateTypeReference::Indexed(
            IndexedTemplateTypeReference::new("M:N.G`1.Convert``1(`0)", 0)
        )))
    );

    parser.clear_generic_context();
    assert!(matches!(
        parser.parse_type_text("`0").unwrap(),
        Some(TypeReference::Template(TemplateTypeReference::Named(_)))
    ));
}

#[test]
fn test_malformed_ids_are_invalid() {
    for api in ["", "X:N.T", "T:", "T:N..T", "M:N.T.Bad Name", "N:Bad-Name"] {
        let reference = parse(api);
        assert!(reference.is_invalid(), "{api} should be invalid");
    }
}

#[test]
fn test_malformed_members_are_invalid() {
    for api in ["M:N.T.M(", "M:N.T.M(System.Int32", "M:N.T.M)(", "M:N.T.#", "M:N.T.##"] {
        let reference = parse(api);
        assert!(reference.is_invalid(), "{api} should be invalid");
    }
    assert!(!parse("M:N.T.M()").is_invalid());
    assert!(!parse("M:N.T.#ctor").is_invalid());
}

#[test]
fn test_unterminated_bracket_is_an_error() {
    let err = CerParser::new().parse_reference("T:N.Generic{System.Int32").unwrap_err();
    assert!(matches!(err, CerLinkError::UnterminatedBracket { .. }));
}

#[test]
fn test_find_matching_end_bracket() {
    let text = "G{A{B},C}.x";
    assert_eq!(find_matching_end_bracket(text, 1).unwrap(), 8);
    assert_eq!(find_matching_end_bracket(text, 3).unwrap(), 5);
    assert!(find_matching_end_bracket("G{A", 1).is_err());
}

#[test]
fn test_generic_arity_sums_nested_markers() {
    assert_eq!(generic_arity("T:N.Outer`1.Inner`2"), 3);
    assert_eq!(generic_arity("T:System.String"), 0);
}
