use std::sync::Arc;

use cerlink::cer::{CerParser, Reference};
use cerlink::render::{text_for, to_xml, LinkTextResolver, Markup};
use cerlink::targets::builder::{build_targets, create_extension_method_reference, create_reference};
use cerlink::targets::{TargetDictionary, TargetTypeDictionary};
use cerlink::types::{Dialect, DisplayOptions, LinkCategory};

const REFLECTION: &str = include_str!("fixtures/reflection.xml");

fn dictionary() -> TargetTypeDictionary {
    let doc = roxmltree::Document::parse(REFLECTION).unwrap();
    let mut dictionary = TargetDictionary::new("fixture", LinkCategory::Local);
    for target in build_targets(&doc, "reflection.xml").unwrap() {
        dictionary.add(target);
    }
    let mut stack = TargetTypeDictionary::new();
    stack.add(Arc::new(dictionary));
    stack
}

fn all(options: &[DisplayOptions]) -> DisplayOptions {
    options
        .iter()
        .fold(DisplayOptions::NONE, |acc, o| acc | *o)
}

fn render_target(id: &str, options: DisplayOptions) -> Vec<Markup> {
    let targets = dictionary();
    let target = targets.get(id).unwrap().clone();
    LinkTextResolver::new(&targets).render_target(&target, options)
}

fn render_cer(api: &str, options: DisplayOptions) -> Vec<Markup> {
    let targets = dictionary();
    let reference = CerParser::new().parse_reference(api).unwrap();
    LinkTextResolver::new(&targets).render_reference(&reference, options)
}

fn render_xml(xml: &str, options: DisplayOptions) -> Vec<Markup> {
    let targets = dictionary();
    let doc = roxmltree::Document::parse(xml).unwrap();
    let reference = create_reference(doc.root_element(), "inline").unwrap();
    LinkTextResolver::new(&targets).render_reference(&reference, options)
}

fn cs(markup: &[Markup]) -> String {
    text_for(markup, Dialect::CSharp)
}

#[test]
fn test_type_target_names() {
    assert_eq!(cs(&render_target("T:Acme.Widget", DisplayOptions::default())), "Widget");
    assert_eq!(
        cs(&render_target("T:Acme.Widget", all(&[DisplayOptions::SHOW_CONTAINER]))),
        "Acme.Widget"
    );
    assert_eq!(
        to_xml(&render_target("T:Acme.Widget", DisplayOptions::default())),
        "Widget"
    );
}

#[test]
fn test_generic_type_target_in_every_dialect() {
    let markup = render_target("T:Acme.Generic`1", DisplayOptions::default());
    assert_eq!(text_for(&markup, Dialect::CSharp), "Generic<TItem>");
    assert_eq!(text_for(&markup, Dialect::VisualBasic), "Generic(Of TItem)");
    assert_eq!(text_for(&markup, Dialect::Cpp), "Generic<TItem>");
    assert_eq!(text_for(&markup, Dialect::FSharp), "Generic<'TItem>");

    let plain = render_target("T:Acme.Generic`1", DisplayOptions::NONE);
    assert_eq!(cs(&plain), "Generic");
}

#[test]
fn test_constructor_uses_type_name() {
    let markup = render_target("M:Acme.Widget.#ctor(System.String)", DisplayOptions::default());
    assert_eq!(cs(&markup), "Widget(String)");
}

#[test]
fn test_method_parameters_follow_options() {
    let id = "M:Acme.Widget.Resize(System.Int32)";
    assert_eq!(cs(&render_target(id, DisplayOptions::default())), "Resize(Int32)");
    assert_eq!(
        cs(&render_target(id, DisplayOptions::SHOW_TEMPLATES)),
        "Resize"
    );
    assert_eq!(
        cs(&render_target(id, all(&[DisplayOptions::SHOW_CONTAINER, DisplayOptions::SHOW_PARAMETERS]))),
        "Widget.Resize(Int32)"
    );

    let cpp = render_target(id, all(&[DisplayOptions::SHOW_CONTAINER]));
    assert_eq!(text_for(&cpp, Dialect::Cpp), "Widget::Resize");
}

#[test]
fn test_conversion_operator_names() {
    let markup = render_target(
        "M:Acme.Widget.op_Explicit(Acme.Widget)~System.String",
        DisplayOptions::default(),
    );
    assert_eq!(text_for(&markup, Dialect::CSharp), "Explicit(Widget to String)");
    assert_eq!(text_for(&markup, Dialect::VisualBasic), "Narrowing(Widget to String)");
}

#[test]
fn test_property_indexer_brackets() {
    let markup = render_target("P:Acme.Widget.Item(System.Int32)", DisplayOptions::default());
    assert_eq!(text_for(&markup, Dialect::CSharp), "Item[Int32]");
    assert_eq!(text_for(&markup, Dialect::VisualBasic), "Item(Int32)");
    assert_eq!(text_for(&markup, Dialect::FSharp), "Item Int32");
}

#[test]
fn test_explicit_implementation_shows_interface_member() {
    let markup = render_target("M:Acme.Widget.System#IDisposable#Dispose", DisplayOptions::default());
    assert_eq!(text_for(&markup, Dialect::CSharp), "IDisposable.Dispose()");
    assert_eq!(text_for(&markup, Dialect::VisualBasic), "IDisposable.Dispose");
}

#[test]
fn test_generic_substitution_through_specialized_member() {
    let xml = r#"<member api="M:Acme.Generic`1.Method(`0)">
                   <type api="T:Acme.Generic`1">
                     <specialization><type api="T:System.String"/></specialization>
                   </type>
                 </member>"#;

    let markup = render_xml(xml, DisplayOptions::default());
    assert_eq!(cs(&markup), "Method(String)");

    let markup = render_xml(xml, DisplayOptions::default() | DisplayOptions::SHOW_CONTAINER);
    assert_eq!(text_for(&markup, Dialect::CSharp), "Generic<String>.Method(String)");
    assert_eq!(
        text_for(&markup, Dialect::VisualBasic),
        "Generic(Of String).Method(String)"
    );
}

#[test]
fn test_unspecialized_template_keeps_its_name() {
    let markup = render_target("M:Acme.Generic`1.Method(`0)", DisplayOptions::default());
    assert_eq!(cs(&markup), "Method(TItem)");
}

#[test]
fn test_array_ranks_per_dialect() {
    let single = render_cer("T:System.Int32[]", DisplayOptions::default());
    assert_eq!(text_for(&single, Dialect::CSharp), "Int32[]");
    assert_eq!(text_for(&single, Dialect::VisualBasic), "Int32()");
    assert_eq!(text_for(&single, Dialect::Cpp), "array<Int32>");

    let double = render_cer("T:System.Int32[,]", DisplayOptions::default());
    assert_eq!(text_for(&double, Dialect::CSharp), "Int32[,]");
    assert_eq!(text_for(&double, Dialect::VisualBasic), "Int32(,)");
    assert_eq!(text_for(&double, Dialect::Cpp), "array<Int32, 2>");
}

#[test]
fn test_by_ref_and_pointer_suffixes() {
    let by_ref = render_cer("T:System.Int32@", DisplayOptions::default());
    assert_eq!(text_for(&by_ref, Dialect::CSharp), "Int32");
    assert_eq!(text_for(&by_ref, Dialect::Cpp), "Int32%");

    let pointer = render_cer("T:System.Byte*", DisplayOptions::default());
    assert_eq!(cs(&pointer), "Byte*");
}

#[test]
fn test_unindexed_generic_type_gets_generated_names() {
    assert_eq!(cs(&render_cer("T:N.Pair`2", DisplayOptions::default())), "Pair<T1, T2>");
    assert_eq!(cs(&render_cer("T:N.Box`1", DisplayOptions::default())), "Box<T>");
}

#[test]
fn test_unindexed_specialized_type() {
    let markup = render_cer(
        "T:System.Collections.Generic.Dictionary{System.String,System.Int32}",
        DisplayOptions::default(),
    );
    assert_eq!(cs(&markup), "Dictionary<String, Int32>");
}

#[test]
fn test_unindexed_member_fallback() {
    let markup = render_cer("M:N.T.Method(System.Int32,System.String)", DisplayOptions::default());
    assert_eq!(cs(&markup), "Method(Int32, String)");

    let markup = render_cer(
        "M:N.T.Method(System.Int32)",
        DisplayOptions::default() | DisplayOptions::SHOW_CONTAINER,
    );
    assert_eq!(cs(&markup), "T.Method(Int32)");

    let markup = render_cer("M:N.T.#ctor(System.Int32)", DisplayOptions::default());
    assert_eq!(cs(&markup), "T(Int32)");

    let markup = render_cer("M:N.T.Run()", DisplayOptions::default());
    assert_eq!(text_for(&markup, Dialect::CSharp), "Run()");
    assert_eq!(text_for(&markup, Dialect::VisualBasic), "Run");
}

#[test]
fn test_namespace_names() {
    assert_eq!(cs(&render_cer("N:Acme", DisplayOptions::default())), "Acme");
    assert_eq!(cs(&render_cer("N:Other.Place", DisplayOptions::default())), "Other.Place");
    assert_eq!(cs(&render_cer("N:", DisplayOptions::default())), "(Default Namespace)");
}

#[test]
fn test_invalid_reference_is_bracketed() {
    let targets = dictionary();
    let reference = CerParser::new().parse_reference("bogus").unwrap();
    assert!(matches!(reference, Reference::Invalid(_)));
    let markup = LinkTextResolver::new(&targets).render_reference(&reference, DisplayOptions::default());
    assert_eq!(to_xml(&markup), "[bogus]");
}

#[test]
fn test_extension_method_skips_instance_parameter() {
    let doc = roxmltree::Document::parse(
        r#"<api>
             <apidata name="Shout"/>
             <parameters>
               <parameter name="self"><type api="T:Acme.Widget"/></parameter>
               <parameter name="volume"><type api="T:System.Int32"/></parameter>
             </parameters>
           </api>"#,
    )
    .unwrap();
    let method = create_extension_method_reference(doc.root_element(), "inline").unwrap();
    let targets = dictionary();
    let markup = LinkTextResolver::new(&targets)
        .render_reference(&Reference::ExtensionMethod(method), DisplayOptions::default());
    assert_eq!(cs(&markup), "Shout(Int32)");
}

#[test]
fn test_dialect_markup_serialization() {
    let markup = render_target("T:Acme.Generic`1", DisplayOptions::default());
    let xml = to_xml(&markup);
    assert!(xml.starts_with("Generic<span class=\"languageSpecificText\">"));
    assert!(xml.contains("<span class=\"vb\">(Of </span>"));
    assert!(xml.contains("<span class=\"cs\">&lt;</span>"));
}
