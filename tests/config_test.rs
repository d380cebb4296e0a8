use std::fs;

use cerlink::config::*;
use cerlink::errors::CerLinkError;
use cerlink::types::{LinkCategory, Severity};
use tempfile::TempDir;

fn sample_config() -> ResolverConfig {
    ResolverConfig {
        targets: vec![TargetSourceConfig {
            id: "local".to_string(),
            base: "reflection".to_string(),
            files: "*.xml".to_string(),
            recurse: true,
            link_category: LinkCategory::LocalOrIndex,
        }],
        indices: vec![IndexConfig {
            name: "comments".to_string(),
            value: "/doc/members/member".to_string(),
            key: "@name".to_string(),
            cache_size: 15,
            missing_entry: Severity::Warn,
            data: vec![DataSourceConfig {
                base: "comments".to_string(),
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
            missing_entry: Some(Severity::Ignore),
            missing_source: Severity::Warn,
            missing_target: Severity::Error,
        }],
        ..ResolverConfig::default()
    }
}

fn assert_config_error(config: &ResolverConfig) {
    match config.validate() {
        Err(CerLinkError::Config { .. }) => {}
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn test_default_config_is_valid() {
    let config = ResolverConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.links.href_format, "{file}.htm");
    assert_eq!(config.links.link_target, "_blank");
    assert!(config.remote.is_none());
}

#[test]
fn test_save_and_load_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cerlink.json");
    let config = sample_config();
    save_config(&path, &config).unwrap();
    let loaded = load_config(&path).unwrap();
    assert_eq!(config, loaded);
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn test_load_toml_config_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cerlink.toml");
    fs::write(
        &path,
        r#"
[links]
missing_target = "error"

[[targets]]
id = "framework"
files = "*.xml"
link_category = "msdn"

[remote]
url_format = "https://ids.example.invalid/{id}"

[[indices]]
name = "comments"
value = "/doc/members/member"
key = "@name"

[[indices.data]]
files = "*.xml"
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.links.missing_target, Severity::Error);
    assert_eq!(config.links.href_format, "{file}.htm");
    assert_eq!(config.targets[0].base, ".");
    assert_eq!(config.targets[0].link_category, LinkCategory::Msdn);
    assert!(!config.targets[0].recurse);

    let remote = config.remote.as_ref().unwrap();
    assert_eq!(remote.locale, "en-us");
    assert_eq!(remote.timeout_secs, 10);

    assert_eq!(config.indices[0].cache_size, 15);
    assert!(config.indices[0].data[0].duplicate_warning);
}

#[test]
fn test_load_rejects_malformed_files() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(load_config(&path), Err(CerLinkError::Config { .. })));

    let missing = dir.path().join("missing.json");
    assert!(matches!(load_config(&missing), Err(CerLinkError::Config { .. })));
}

#[test]
fn test_validation_rejects_missing_attributes() {
    let mut config = sample_config();
    config.targets[0].id = String::new();
    assert_config_error(&config);

    let mut config = sample_config();
    config.targets[0].files = " ".to_string();
    assert_config_error(&config);

    let mut config = sample_config();
    config.links.href_format = "static.htm".to_string();
    assert_config_error(&config);

    let mut config = sample_config();
    config.remote = Some(RemoteSettings::default());
    assert_config_error(&config);

    let mut config = sample_config();
    config.indices[0].key = String::new();
    assert_config_error(&config);

    let mut config = sample_config();
    config.indices[0].cache_size = 0;
    assert_config_error(&config);

    let mut config = sample_config();
    config.copies[0].index = "undeclared".to_string();
    assert_config_error(&config);

    let mut config = sample_config();
    config.copies[0].target = String::new();
    assert_config_error(&config);

    assert!(sample_config().validate().is_ok());
}

#[test]
fn test_remote_cache_path() {
    let settings = RemoteSettings {
        cache_file: Some("ids.json".into()),
        ..RemoteSettings::default()
    };
    assert_eq!(settings.cache_path().unwrap(), std::path::PathBuf::from("ids.json"));

    if let Some(path) = RemoteSettings::default().cache_path() {
        assert!(path.ends_with(format!("{CERLINK_DIR}/{REMOTE_CACHE_FILENAME}")));
    }
}

#[test]
fn test_collect_source_files() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("b.xml"), "<x/>").unwrap();
    fs::write(dir.path().join("A.XML"), "<x/>").unwrap();
    fs::write(dir.path().join("notes.txt"), "").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested").join("c.xml"), "<x/>").unwrap();

    let flat = collect_source_files(dir.path(), "*.xml", false).unwrap();
    let names: Vec<String> = flat
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["A.XML".to_string(), "b.xml".to_string()]);

    let deep = collect_source_files(dir.path(), "*.xml", true).unwrap();
    assert_eq!(deep.len(), 3);

    assert!(matches!(
        collect_source_files(dir.path(), "[", false),
        Err(CerLinkError::Config { .. })
    ));
}
