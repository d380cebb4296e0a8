use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::builder::build_targets;
use super::collection::TargetCollection;
use super::target::{Target, TargetKind};
use crate::config::{collect_source_files, TargetSourceConfig};
use crate::errors::{CerLinkError, Result};
use crate::types::LinkCategory;

/// Targets loaded from one reflection data source, all sharing one link
/// category.
#[derive(Debug, Clone)]
pub struct TargetDictionary {
    id: String,
    link_category: LinkCategory,
    targets: TargetCollection,
}

impl TargetDictionary {
    pub fn new(id: impl Into<String>, link_category: LinkCategory) -> Self {
        Self {
            id: id.into(),
            link_category,
            targets: TargetCollection::new(),
        }
    }

    /// Builds a dictionary by loading every reflection file the source
    /// selects.
    pub fn build(source: &TargetSourceConfig) -> Result<Self> {
        let mut dictionary = Self::new(&source.id, source.link_category);
        let files = collect_source_files(Path::new(&source.base), &source.files, source.recurse)?;
        if files.is_empty() {
            tracing::warn!(dictionary = %source.id, base = %source.base, files = %source.files, "target source matched no files");
        }

        for path in &files {
            dictionary.load_file(path)?;
        }

        tracing::info!(
            dictionary = %source.id,
            files = files.len(),
            targets = dictionary.len(),
            "built target dictionary"
        );
        Ok(dictionary)
    }

    /// Parses one reflection file and adds its targets.
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let text = fs::read_to_string(path)?;
        let label = path.display().to_string();
        let doc = roxmltree::Document::parse(&text).map_err(|e| CerLinkError::Xml {
            message: e.to_string(),
            path: label.clone(),
        })?;

        let targets = build_targets(&doc, &label)?;
        let count = targets.len();
        for target in targets {
            self.add(target);
        }
        tracing::debug!(path = %label, targets = count, "loaded reflection file");
        Ok(count)
    }

    /// Adds a target, stamping it with this dictionary's link category.
    pub fn add(&mut self, mut target: Target) {
        target.link_category = self.link_category;
        if let TargetKind::Enumeration(enumeration) = &mut target.kind {
            for element in &mut enumeration.elements {
                element.link_category = self.link_category;
            }
        }
        self.targets.add(target);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn link_category(&self) -> LinkCategory {
        self.link_category
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.targets.contains(id)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> &TargetCollection {
        &self.targets
    }
}

/// Ordered stack of target dictionaries. The first dictionary holding an
/// id answers for it.
#[derive(Debug, Clone, Default)]
pub struct TargetTypeDictionary {
    dictionaries: Vec<Arc<TargetDictionary>>,
}

impl TargetTypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, dictionary: Arc<TargetDictionary>) {
        self.dictionaries.push(dictionary);
    }

    /// Finds a target together with the link category of the dictionary
    /// that holds it.
    pub fn lookup(&self, id: &str) -> Option<(&Target, LinkCategory)> {
        self.dictionaries
            .iter()
            .find_map(|d| d.get(id).map(|t| (t, d.link_category())))
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.lookup(id).map(|(t, _)| t)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dictionaries.iter().any(|d| d.contains(id))
    }

    pub fn dictionaries(&self) -> &[Arc<TargetDictionary>] {
        &self.dictionaries
    }
}

/// Build-scoped registry handing out shared, read-only dictionaries by id.
///
/// A second request for an id already registered gets the existing
/// dictionary without rebuilding it.
#[derive(Debug, Default)]
pub struct DictionaryRegistry {
    entries: HashMap<String, Arc<TargetDictionary>>,
}

impl DictionaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, source: &TargetSourceConfig) -> Result<Arc<TargetDictionary>> {
        if let Some(existing) = self.entries.get(&source.id) {
            tracing::debug!(dictionary = %source.id, "reusing shared target dictionary");
            return Ok(Arc::clone(existing));
        }

        let dictionary = Arc::new(TargetDictionary::build(source)?);
        self.entries
            .insert(source.id.clone(), Arc::clone(&dictionary));
        Ok(dictionary)
    }

    /// Registers an already built dictionary under its own id, replacing
    /// any previous entry.
    pub fn insert(&mut self, dictionary: TargetDictionary) -> Arc<TargetDictionary> {
        let dictionary = Arc::new(dictionary);
        self.entries
            .insert(dictionary.id().to_string(), Arc::clone(&dictionary));
        dictionary
    }

    pub fn get(&self, id: &str) -> Option<Arc<TargetDictionary>> {
        self.entries.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every dictionary no longer held outside the registry and
    /// returns how many were removed.
    pub fn purge_unused(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, d| Arc::strong_count(d) > 1);
        before - self.entries.len()
    }

    /// Tears the registry down at the end of a build.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
