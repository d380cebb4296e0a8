use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::RemoteSettings;
use crate::errors::{CerLinkError, Result};

/// Transport for remote ID lookups.
pub trait IdLookup {
    /// Content id the service knows `id` by. `Ok(None)` means the service
    /// answered but has no entry; `Err` means the service could not be
    /// reached.
    fn lookup(&self, id: &str, locale: &str) -> Result<Option<String>>;
}

/// [`IdLookup`] over HTTP. The response body is the content id.
pub struct HttpIdLookup {
    agent: ureq::Agent,
    url_format: String,
}

impl HttpIdLookup {
    pub fn new(settings: &RemoteSettings) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(settings.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            url_format: settings.url_format.clone(),
        }
    }

    fn url_for(&self, id: &str, locale: &str) -> String {
        self.url_format
            .replace("{id}", &percent_encode(id))
            .replace("{locale}", locale)
    }
}

impl IdLookup for HttpIdLookup {
    fn lookup(&self, id: &str, locale: &str) -> Result<Option<String>> {
        let url = self.url_for(id, locale);
        match self.agent.get(&url).call() {
            Ok(mut response) => {
                let body = response
                    .body_mut()
                    .read_to_string()
                    .map_err(|e| CerLinkError::Remote {
                        message: format!("failed to read response from '{url}': {e}"),
                    })?;
                let content_id = body.trim();
                Ok((!content_id.is_empty()).then(|| content_id.to_string()))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(CerLinkError::Remote {
                message: format!("request to '{url}' failed: {e}"),
            }),
        }
    }
}

fn percent_encode(text: &str) -> String {
    let mut encoded = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b':' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// Resolves ids to external addresses through an [`IdLookup`], with a
/// persistent cache.
///
/// The first transport failure disables the resolver for the rest of the
/// build; later lookups are answered from the cache only.
pub struct RemoteIdResolver {
    lookup: Box<dyn IdLookup>,
    link_format: String,
    locale: String,
    cache: BTreeMap<String, String>,
    cache_path: Option<PathBuf>,
    modified: bool,
    disabled: bool,
}

impl RemoteIdResolver {
    /// Creates a resolver over `lookup`, loading the cache file if it exists.
    pub fn new(settings: &RemoteSettings, lookup: Box<dyn IdLookup>) -> Result<Self> {
        let cache_path = settings.cache_path();
        let cache = match &cache_path {
            Some(path) if path.exists() => load_cache(path)?,
            _ => BTreeMap::new(),
        };
        tracing::debug!(entries = cache.len(), "loaded remote id cache");

        Ok(Self {
            lookup,
            link_format: settings.link_format.clone(),
            locale: settings.locale.clone(),
            cache,
            cache_path,
            modified: false,
            disabled: false,
        })
    }

    /// Creates a resolver that talks HTTP.
    pub fn from_settings(settings: &RemoteSettings) -> Result<Self> {
        Self::new(settings, Box::new(HttpIdLookup::new(settings)))
    }

    /// External address of `id`, or `None` when it cannot be resolved.
    pub fn resolve(&mut self, id: &str) -> Option<String> {
        if let Some(content_id) = self.cache.get(id) {
            return Some(self.link_for(content_id));
        }
        if self.disabled {
            return None;
        }

        match self.lookup.lookup(id, &self.locale) {
            Ok(Some(content_id)) => {
                let url = self.link_for(&content_id);
                self.cache.insert(id.to_string(), content_id);
                self.modified = true;
                Some(url)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "remote id lookup failed, disabling remote resolution for this build");
                self.disabled = true;
                None
            }
        }
    }

    fn link_for(&self, content_id: &str) -> String {
        self.link_format
            .replace("{content_id}", content_id)
            .replace("{locale}", &self.locale)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Writes the cache back if lookups added entries. Returns whether a
    /// file was written.
    pub fn save(&mut self) -> Result<bool> {
        let Some(path) = self.cache_path.as_deref() else {
            return Ok(false);
        };
        if !self.modified {
            return Ok(false);
        }

        save_cache(path, &self.cache)?;
        self.modified = false;
        tracing::info!(path = %path.display(), entries = self.cache.len(), "saved remote id cache");
        Ok(true)
    }
}

fn load_cache(path: &Path) -> Result<BTreeMap<String, String>> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn save_cache(path: &Path, cache: &BTreeMap<String, String>) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, serde_json::to_string_pretty(cache)?)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}
