use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use crate::cache::{CopyCommand, IndexedDocumentCache};
use crate::config::ResolverConfig;
use crate::errors::{CerLinkError, Result};
use crate::resolution::{IdLookup, ReferenceLinkResolver, RemoteIdResolver, ResolutionResult};
use crate::targets::{DictionaryRegistry, TargetTypeDictionary};

/// One build: the target dictionaries, index caches and link resolver
/// configured for a set of topics.
///
/// Dictionaries come from a build-scoped [`DictionaryRegistry`] owned by the
/// caller, so target sources with the same id are loaded once across every
/// stage opened against it.
pub struct BuildSession {
    config: ResolverConfig,
    indices: HashMap<String, IndexedDocumentCache>,
    copies: Vec<CopyCommand>,
    resolver: ReferenceLinkResolver,
    processed: usize,
}

/// Totals for a finished build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSummary {
    /// Number of topics processed.
    pub topic_count: usize,
    /// Total number of reference links seen.
    pub link_count: usize,
    /// Links whose target was found in a dictionary.
    pub resolved_count: usize,
    /// Time taken in milliseconds.
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

impl BuildSession {
    /// Loads every dictionary and index of `config` and prepares the
    /// resolver. Dictionaries already in `registry` are reused. Remote
    /// resolution talks HTTP when configured.
    pub fn open(config: ResolverConfig, registry: &mut DictionaryRegistry) -> Result<Self> {
        let remote = match &config.remote {
            Some(settings) => Some(RemoteIdResolver::from_settings(settings)?),
            None => None,
        };
        Self::open_with_remote(config, registry, remote)
    }

    /// Like [`BuildSession::open`], with remote lookups going through
    /// `lookup` instead of HTTP.
    pub fn open_with_lookup(
        config: ResolverConfig,
        registry: &mut DictionaryRegistry,
        lookup: Box<dyn IdLookup>,
    ) -> Result<Self> {
        let remote = match &config.remote {
            Some(settings) => Some(RemoteIdResolver::new(settings, lookup)?),
            None => None,
        };
        Self::open_with_remote(config, registry, remote)
    }

    fn open_with_remote(
        config: ResolverConfig,
        registry: &mut DictionaryRegistry,
        remote: Option<RemoteIdResolver>,
    ) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();

        let mut targets = TargetTypeDictionary::new();
        for source in &config.targets {
            targets.add(registry.get_or_build(source)?);
        }

        let mut indices = HashMap::new();
        for index in &config.indices {
            indices.insert(index.name.clone(), IndexedDocumentCache::build(index)?);
        }

        let mut copies = Vec::with_capacity(config.copies.len());
        for copy in &config.copies {
            let index = config
                .indices
                .iter()
                .find(|index| index.name == copy.index)
                .ok_or_else(|| CerLinkError::Config {
                    message: format!("copy command refers to unknown index '{}'", copy.index),
                })?;
            copies.push(CopyCommand::new(copy, index)?);
        }

        tracing::info!(
            dictionaries = targets.dictionaries().len(),
            shared = registry.len(),
            indices = indices.len(),
            copies = copies.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "opened build session"
        );

        let resolver = ReferenceLinkResolver::new(targets, config.links.clone(), remote);
        Ok(Self {
            config,
            indices,
            copies,
            resolver,
            processed: 0,
        })
    }

    /// Saves the remote id cache and releases this stage's dictionaries.
    /// Dictionaries no other stage still holds are purged from `registry`;
    /// the caller clears it once the whole batch is done.
    pub fn finish(self, registry: &mut DictionaryRegistry) -> Result<()> {
        let Self {
            mut resolver,
            processed,
            ..
        } = self;
        resolver.finish()?;
        drop(resolver);

        let purged = registry.purge_unused();
        tracing::info!(topics = processed, purged, "finished build session");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Processing
// ---------------------------------------------------------------------------

impl BuildSession {
    /// Runs the copy commands over one topic, then resolves its links.
    pub fn process(&mut self, text: &str, key: &str) -> Result<ResolutionResult> {
        let mut text = text.to_string();
        for command in &self.copies {
            let cache = self
                .indices
                .get_mut(command.index())
                .ok_or_else(|| CerLinkError::Config {
                    message: format!("copy command refers to unknown index '{}'", command.index()),
                })?;
            text = command.apply(&text, key, cache)?;
        }

        let result = self.resolver.resolve_document(&text, key)?;
        self.processed += 1;
        Ok(result)
    }

    /// Processes the topic file at `input` and writes the result to `output`.
    /// The topic key is the file stem.
    pub fn process_file(&mut self, input: &Path, output: &Path) -> Result<ResolutionResult> {
        let key = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let text = fs::read_to_string(input)?;
        let result = self.process(&text, &key)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, &result.text)?;
        tracing::debug!(
            key = %key,
            links = result.total,
            unresolved = result.unresolved.len(),
            "wrote topic"
        );
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl BuildSession {
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn targets(&self) -> &TargetTypeDictionary {
        self.resolver.targets()
    }

    pub fn index(&self, name: &str) -> Option<&IndexedDocumentCache> {
        self.indices.get(name)
    }

    pub fn resolver(&self) -> &ReferenceLinkResolver {
        &self.resolver
    }

    pub fn processed(&self) -> usize {
        self.processed
    }
}
