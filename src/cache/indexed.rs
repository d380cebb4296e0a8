use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use super::xpath::XmlPath;
use crate::config::{collect_source_files, IndexConfig};
use crate::errors::{CerLinkError, Result};

/// Key to fragment map for one indexed file. Fragments are the verbatim
/// XML text of each value node.
#[derive(Debug, Clone, Default)]
pub struct IndexedDocument {
    entries: HashMap<String, String>,
}

impl IndexedDocument {
    /// Parses `path` and records every value node under its key.
    pub fn load(path: &Path, value_path: &XmlPath, key_path: &XmlPath) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let doc = roxmltree::Document::parse(&text).map_err(|e| CerLinkError::Xml {
            message: e.to_string(),
            path: path.display().to_string(),
        })?;

        let mut entries = HashMap::new();
        for node in value_path.select(doc.root_element()) {
            if let Some(key) = key_path.evaluate_string(node) {
                entries.insert(key, text[node.range()].to_string());
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Key to XML fragment lookup over many files, holding at most `capacity`
/// parsed files in memory.
///
/// Eviction is by insertion order: when a file has to be loaded and the
/// cache is full, the file loaded longest ago is dropped, however often it
/// has been read since.
#[derive(Debug)]
pub struct IndexedDocumentCache {
    name: String,
    value_path: XmlPath,
    key_path: XmlPath,
    capacity: usize,
    key_files: HashMap<String, PathBuf>,
    documents: HashMap<PathBuf, IndexedDocument>,
    insertion_order: VecDeque<PathBuf>,
}

impl IndexedDocumentCache {
    pub fn new(name: impl Into<String>, value: &str, key: &str, capacity: usize) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            value_path: XmlPath::parse(value)?,
            key_path: XmlPath::parse(key)?,
            capacity: capacity.max(1),
            key_files: HashMap::new(),
            documents: HashMap::new(),
            insertion_order: VecDeque::new(),
        })
    }

    /// Builds the key index for every data source of `config`.
    pub fn build(config: &IndexConfig) -> Result<Self> {
        let mut cache = Self::new(&config.name, &config.value, &config.key, config.cache_size)?;
        for source in &config.data {
            let files = collect_source_files(Path::new(&source.base), &source.files, source.recurse)?;
            for path in files {
                cache.add_file(&path, source.duplicate_warning)?;
            }
        }

        tracing::info!(
            index = %cache.name,
            keys = cache.key_files.len(),
            "built index"
        );
        Ok(cache)
    }

    /// Indexes the keys of one file. The file's content is not retained.
    pub fn add_file(&mut self, path: &Path, duplicate_warning: bool) -> Result<usize> {
        let document = IndexedDocument::load(path, &self.value_path, &self.key_path)?;
        for key in document.keys() {
            let previous = self.key_files.insert(key.to_string(), path.to_path_buf());
            if let Some(previous) = previous.filter(|p| p != path) {
                if duplicate_warning {
                    tracing::warn!(
                        index = %self.name,
                        key = %key,
                        previous = %previous.display(),
                        file = %path.display(),
                        "duplicate index key, the later file wins"
                    );
                }
            }
        }
        Ok(document.len())
    }

    /// Fragment stored under `key`, loading its file if needed.
    pub fn get_content(&mut self, key: &str) -> Result<Option<String>> {
        let Some(path) = self.key_files.get(key).cloned() else {
            return Ok(None);
        };
        let document = self.get_document(&path)?;
        Ok(document.get(key).map(str::to_string))
    }

    /// Parsed data of `path`, from the cache or freshly loaded.
    pub fn get_document(&mut self, path: &Path) -> Result<&IndexedDocument> {
        if !self.documents.contains_key(path) {
            let document = IndexedDocument::load(path, &self.value_path, &self.key_path)?;
            if self.documents.len() >= self.capacity {
                if let Some(oldest) = self.insertion_order.pop_front() {
                    tracing::debug!(index = %self.name, file = %oldest.display(), "evicting cached file");
                    self.documents.remove(&oldest);
                }
            }
            self.documents.insert(path.to_path_buf(), document);
            self.insertion_order.push_back(path.to_path_buf());
        }

        self.documents.get(path).ok_or_else(|| CerLinkError::Xml {
            message: "indexed document missing after load".to_string(),
            path: path.display().to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.key_files.contains_key(key)
    }

    /// File that holds `key`.
    pub fn file_for(&self, key: &str) -> Option<&Path> {
        self.key_files.get(key).map(PathBuf::as_path)
    }

    pub fn key_count(&self) -> usize {
        self.key_files.len()
    }

    pub fn is_cached(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    pub fn cached_count(&self) -> usize {
        self.documents.len()
    }
}
