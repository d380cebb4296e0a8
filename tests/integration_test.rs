use std::fs;
use std::path::Path;
use std::sync::Arc;

use cerlink::config::*;
use cerlink::errors::{CerLinkError, Result};
use cerlink::resolution::IdLookup;
use cerlink::session::BuildSession;
use cerlink::targets::DictionaryRegistry;
use cerlink::types::{LinkCategory, Severity};
use tempfile::TempDir;

const REFLECTION: &str = include_str!("fixtures/reflection.xml");

struct StaticLookup;

impl IdLookup for StaticLookup {
    fn lookup(&self, id: &str, _locale: &str) -> Result<Option<String>> {
        Ok(Some(id.replace([':', '.'], "-").to_lowercase()))
    }
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

fn base(dir: &TempDir, sub: &str) -> String {
    dir.path().join(sub).to_string_lossy().to_string()
}

/// A project with one reflection file, one comments file and a copy command
/// pulling summaries into each topic.
fn project(dir: &TempDir) -> ResolverConfig {
    write(&dir.path().join("reflection").join("reflection.xml"), REFLECTION);
    write(
        &dir.path().join("comments").join("comments.xml"),
        r#"<doc><members>
             <member name="T:Acme.Widget"><summary>See <referenceLink target="T:Acme.Color"/>.</summary></member>
           </members></doc>"#,
    );

    ResolverConfig {
        targets: vec![TargetSourceConfig {
            id: "acme".to_string(),
            base: base(dir, "reflection"),
            files: "*.xml".to_string(),
            recurse: false,
            link_category: LinkCategory::LocalOrIndex,
        }],
        indices: vec![IndexConfig {
            name: "comments".to_string(),
            value: "/doc/members/member".to_string(),
            key: "@name".to_string(),
            cache_size: 2,
            missing_entry: Severity::Ignore,
            data: vec![DataSourceConfig {
                base: base(dir, "comments"),
                files: "*.xml".to_string(),
                recurse: false,
                duplicate_warning: true,
            }],
        }],
        copies: vec![CopyConfig {
            index: "comments".to_string(),
            key: "$key".to_string(),
            source: "summary".to_string(),
            target: "/document/comments".to_string(),
            missing_entry: None,
            missing_source: Severity::Warn,
            missing_target: Severity::Warn,
        }],
        ..ResolverConfig::default()
    }
}

#[test]
fn test_full_pipeline() {
    let dir = TempDir::new().unwrap();
    let mut registry = DictionaryRegistry::new();
    let mut session = BuildSession::open(project(&dir), &mut registry).unwrap();
    assert!(session.index("comments").is_some());
    assert!(session.targets().contains("T:Acme.Widget"));

    let text = r#"<document><comments/><body><referenceLink target="T:Acme.Extras.Gadget"/></body></document>"#;
    let result = session.process(text, "T:Acme.Widget").unwrap();

    assert_eq!(result.total, 2);
    assert_eq!(result.resolved_count, 2);
    assert_eq!(
        result.text,
        concat!(
            r#"<document><comments><summary>See <a href="T_Acme_Color.htm">Color</a>.</summary></comments>"#,
            r#"<body><mshelp:link xmlns:mshelp="http://msdn.microsoft.com/mshelp" keywords="T:Acme.Extras.Gadget" tabindex="0">Gadget</mshelp:link></body></document>"#
        )
    );
    assert_eq!(session.processed(), 1);
    session.finish(&mut registry).unwrap();
}

#[test]
fn test_topics_without_index_entry_pass_through_copy() {
    let dir = TempDir::new().unwrap();
    let mut registry = DictionaryRegistry::new();
    let mut session = BuildSession::open(project(&dir), &mut registry).unwrap();

    let text = r#"<document><comments/><referenceLink target="T:Acme.Widget"/></document>"#;
    let result = session.process(text, "T:Acme.Color").unwrap();
    assert_eq!(
        result.text,
        r#"<document><comments/><a href="T_Acme_Widget.htm">Widget</a></document>"#
    );
}

#[test]
fn test_process_file_writes_output() {
    let dir = TempDir::new().unwrap();
    let mut registry = DictionaryRegistry::new();
    let mut session = BuildSession::open(project(&dir), &mut registry).unwrap();

    let input = dir.path().join("topics").join("T:Acme.Color.xml");
    write(
        &input,
        r#"<document><comments/><referenceLink target="F:Acme.Color.Red"/></document>"#,
    );
    let output = dir.path().join("out").join("T:Acme.Color.xml");

    let result = session.process_file(&input, &output).unwrap();
    assert_eq!(result.total, 1);

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(
        written,
        r#"<document><comments/><span class="selflink">Red</span></document>"#
    );
}

#[test]
fn test_sources_with_same_id_share_a_dictionary() {
    let dir = TempDir::new().unwrap();
    let mut config = project(&dir);
    let mut duplicate = config.targets[0].clone();
    duplicate.link_category = LinkCategory::Local;
    config.targets.push(duplicate);

    let mut registry = DictionaryRegistry::new();
    let session = BuildSession::open(config, &mut registry).unwrap();
    let dictionaries = session.targets().dictionaries();
    assert_eq!(dictionaries.len(), 2);
    assert!(Arc::ptr_eq(&dictionaries[0], &dictionaries[1]));
}

#[test]
fn test_remote_resolution_in_session() {
    let dir = TempDir::new().unwrap();
    let mut config = project(&dir);
    config.targets[0].link_category = LinkCategory::Msdn;
    config.copies.clear();
    config.remote = Some(RemoteSettings {
        url_format: "https://ids.example.invalid/{id}".to_string(),
        cache_file: Some(dir.path().join("remote-ids.json")),
        ..RemoteSettings::default()
    });

    let mut registry = DictionaryRegistry::new();
    let mut session =
        BuildSession::open_with_lookup(config, &mut registry, Box::new(StaticLookup)).unwrap();
    let result = session
        .process(
            r#"<p><referenceLink target="T:Acme.Widget"/></p>"#,
            "T:Other.Topic",
        )
        .unwrap();
    assert_eq!(
        result.text,
        r#"<p><a href="https://learn.microsoft.com/en-us/library/t-acme-widget" target="_blank">Widget</a></p>"#
    );

    session.finish(&mut registry).unwrap();
    let cache = fs::read_to_string(dir.path().join("remote-ids.json")).unwrap();
    assert!(cache.contains("t-acme-widget"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    let mut config = project(&dir);
    config.copies[0].index = "missing".to_string();
    assert!(matches!(
        BuildSession::open(config, &mut DictionaryRegistry::new()),
        Err(CerLinkError::Config { .. })
    ));
}

#[test]
fn test_malformed_topic_is_an_xml_error() {
    let dir = TempDir::new().unwrap();
    let mut config = project(&dir);
    config.copies.clear();
    let mut registry = DictionaryRegistry::new();
    let mut session = BuildSession::open(config, &mut registry).unwrap();
    assert!(matches!(
        session.process("<document>", "T:Acme.Widget"),
        Err(CerLinkError::Xml { .. })
    ));
}

#[test]
fn test_stages_share_dictionaries_through_the_registry() {
    let dir = TempDir::new().unwrap();
    let config = project(&dir);
    let mut registry = DictionaryRegistry::new();
    let first = BuildSession::open(config.clone(), &mut registry).unwrap();

    // The second stage must not reread the reflection files.
    write(
        &dir.path().join("reflection").join("reflection.xml"),
        "<reflection><apis/></reflection>",
    );
    let second = BuildSession::open(config.clone(), &mut registry).unwrap();
    assert!(second.targets().contains("T:Acme.Widget"));
    assert!(Arc::ptr_eq(
        &first.targets().dictionaries()[0],
        &second.targets().dictionaries()[0]
    ));
    assert_eq!(registry.len(), 1);

    first.finish(&mut registry).unwrap();
    assert!(registry.contains("acme"));

    second.finish(&mut registry).unwrap();
    assert!(registry.is_empty());

    // Once purged, the next stage builds from the current files.
    let third = BuildSession::open(config, &mut registry).unwrap();
    assert!(!third.targets().contains("T:Acme.Widget"));
    third.finish(&mut registry).unwrap();
    registry.clear();
}
