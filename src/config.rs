use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::errors::{CerLinkError, Result};
use crate::types::{LinkCategory, Severity};

/// Name of the persistent remote-ID cache file.
pub const REMOTE_CACHE_FILENAME: &str = "remote-ids.json";

/// Name of the directory (under the user cache directory) holding cerlink state.
pub const CERLINK_DIR: &str = "cerlink";

/// Top-level configuration of one cross-reference build.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Target dictionaries, consulted in declaration order.
    pub targets: Vec<TargetSourceConfig>,
    pub links: LinkSettings,
    /// Remote ID service. Msdn links degrade to inert text without it.
    pub remote: Option<RemoteSettings>,
    pub indices: Vec<IndexConfig>,
    pub copies: Vec<CopyConfig>,
}

/// One reflection data source feeding a target dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSourceConfig {
    /// Registry id. Sources sharing an id share one in-memory dictionary.
    pub id: String,
    #[serde(default = "default_base")]
    pub base: String,
    /// File-name glob, matched against entries under `base`.
    pub files: String,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub link_category: LinkCategory,
}

/// How links are written out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Href template for Local links; `{file}` receives the target's file name.
    pub href_format: String,
    /// When set, Local hrefs are rewritten relative to this location.
    pub base_url: Option<String>,
    /// `target` attribute of external links.
    pub link_target: String,
    pub missing_target: Severity,
    pub invalid_reference: Severity,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            href_format: "{file}.htm".to_string(),
            base_url: None,
            link_target: "_blank".to_string(),
            missing_target: Severity::Warn,
            invalid_reference: Severity::Warn,
        }
    }
}

/// Remote ID service endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    /// Lookup URL; `{id}` receives the target id, `{locale}` the locale.
    pub url_format: String,
    /// Link URL; `{content_id}` receives the looked-up id.
    pub link_format: String,
    pub locale: String,
    pub timeout_secs: u64,
    /// Persistent cache location. Defaults to the user cache directory.
    pub cache_file: Option<PathBuf>,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            url_format: String::new(),
            link_format: "https://learn.microsoft.com/{locale}/library/{content_id}".to_string(),
            locale: "en-us".to_string(),
            timeout_secs: 10,
            cache_file: None,
        }
    }
}

impl RemoteSettings {
    /// Resolves the cache file location, falling back to the per-user cache
    /// directory. Returns `None` when neither is available.
    pub fn cache_path(&self) -> Option<PathBuf> {
        self.cache_file.clone().or_else(|| {
            dirs::cache_dir().map(|dir| dir.join(CERLINK_DIR).join(REMOTE_CACHE_FILENAME))
        })
    }
}

/// A named indexed document cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    /// Path selecting the indexed nodes in each file.
    pub value: String,
    /// Path, relative to each value node, selecting its key.
    pub key: String,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    /// Severity of a missing entry for copy commands that set none.
    #[serde(default)]
    pub missing_entry: Severity,
    pub data: Vec<DataSourceConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    #[serde(default = "default_base")]
    pub base: String,
    pub files: String,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default = "default_true")]
    pub duplicate_warning: bool,
}

/// Copies nodes out of an index entry into each processed document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Name of a declared index.
    pub index: String,
    /// Entry key; `$key` stands for the current topic key.
    #[serde(default = "default_copy_key")]
    pub key: String,
    /// Path selecting nodes inside the index entry.
    pub source: String,
    /// Path selecting the document nodes that receive the copies.
    pub target: String,
    /// Falls back to the index's `missing_entry` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing_entry: Option<Severity>,
    #[serde(default)]
    pub missing_source: Severity,
    #[serde(default)]
    pub missing_target: Severity,
}

fn default_base() -> String {
    ".".to_string()
}

fn default_cache_size() -> usize {
    15
}

fn default_true() -> bool {
    true
}

fn default_copy_key() -> String {
    "$key".to_string()
}

impl ResolverConfig {
    /// Rejects configurations missing required attributes.
    pub fn validate(&self) -> Result<()> {
        for target in &self.targets {
            if target.id.trim().is_empty() {
                return Err(config_error("target source is missing an id"));
            }
            if target.files.trim().is_empty() {
                return Err(config_error(format!(
                    "target source '{}' is missing a files pattern",
                    target.id
                )));
            }
        }

        if !self.links.href_format.contains("{file}") {
            return Err(config_error(format!(
                "href_format '{}' has no {{file}} placeholder",
                self.links.href_format
            )));
        }

        if let Some(remote) = &self.remote {
            if remote.url_format.trim().is_empty() {
                return Err(config_error("remote resolver is missing a url_format"));
            }
        }

        for index in &self.indices {
            if index.name.trim().is_empty() {
                return Err(config_error("index is missing a name"));
            }
            if index.value.trim().is_empty() || index.key.trim().is_empty() {
                return Err(config_error(format!(
                    "index '{}' needs both a value and a key path",
                    index.name
                )));
            }
            if index.cache_size == 0 {
                return Err(config_error(format!(
                    "index '{}' has a zero cache size",
                    index.name
                )));
            }
            if index.data.iter().any(|d| d.files.trim().is_empty()) {
                return Err(config_error(format!(
                    "index '{}' has a data source without a files pattern",
                    index.name
                )));
            }
        }

        for copy in &self.copies {
            if !self.indices.iter().any(|i| i.name == copy.index) {
                return Err(config_error(format!(
                    "copy command refers to undeclared index '{}'",
                    copy.index
                )));
            }
            if copy.source.trim().is_empty() || copy.target.trim().is_empty() {
                return Err(config_error(format!(
                    "copy command for index '{}' needs source and target paths",
                    copy.index
                )));
            }
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> CerLinkError {
    CerLinkError::Config {
        message: message.into(),
    }
}

/// Loads and validates a configuration. The format is picked from the file
/// extension: `.toml` is read as TOML, anything else as JSON.
pub fn load_config(path: &Path) -> Result<ResolverConfig> {
    let contents = fs::read_to_string(path).map_err(|e| CerLinkError::Config {
        message: format!("failed to read config file '{}': {}", path.display(), e),
    })?;

    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    let config: ResolverConfig = if is_toml {
        toml::from_str(&contents).map_err(|e| CerLinkError::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?
    } else {
        serde_json::from_str(&contents).map_err(|e| CerLinkError::Config {
            message: format!("failed to parse config file '{}': {}", path.display(), e),
        })?
    };

    config.validate()?;
    Ok(config)
}

/// Saves the configuration as pretty JSON using an atomic write.
pub fn save_config(path: &Path, config: &ResolverConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CerLinkError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(config).map_err(|e| CerLinkError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| CerLinkError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, path).map_err(|e| CerLinkError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            path.display(),
            e
        ),
    })?;

    Ok(())
}

/// Enumerates the files under `base` whose names match the `files` glob.
///
/// Only the top level of `base` is scanned unless `recurse` is set. Results
/// are sorted so that later-wins policies are deterministic.
pub fn collect_source_files(base: &Path, files: &str, recurse: bool) -> Result<Vec<PathBuf>> {
    let pattern = Pattern::new(files).map_err(|e| CerLinkError::Config {
        message: format!("invalid files pattern '{}': {}", files, e),
    })?;
    let match_opts = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut walker = WalkDir::new(base).min_depth(1).sort_by_file_name();
    if !recurse {
        walker = walker.max_depth(1);
    }

    let mut found = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| CerLinkError::Config {
            message: format!("failed to scan '{}': {}", base.display(), e),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if pattern.matches_with(&name, match_opts) {
            found.push(entry.into_path());
        }
    }

    Ok(found)
}
