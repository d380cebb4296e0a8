use super::indexed::IndexedDocumentCache;
use super::xpath::XmlPath;
use crate::config::{CopyConfig, IndexConfig};
use crate::document::{append_child, apply_splices, parse};
use crate::errors::{CerLinkError, Result};
use crate::types::Severity;

/// Placeholder in a copy key that stands for the current topic key.
pub const TOPIC_KEY_VARIABLE: &str = "$key";

/// Copies nodes selected inside an index entry into a document.
#[derive(Debug, Clone)]
pub struct CopyCommand {
    index: String,
    key: String,
    source: XmlPath,
    target: XmlPath,
    missing_entry: Severity,
    missing_source: Severity,
    missing_target: Severity,
}

impl CopyCommand {
    /// Builds the command for `config` reading from `index`.
    pub fn new(config: &CopyConfig, index: &IndexConfig) -> Result<Self> {
        if config.index != index.name {
            return Err(CerLinkError::Config {
                message: format!(
                    "copy command for index '{}' built against index '{}'",
                    config.index, index.name
                ),
            });
        }
        Ok(Self {
            index: config.index.clone(),
            key: config.key.clone(),
            source: XmlPath::parse(&config.source)?,
            target: XmlPath::parse(&config.target)?,
            missing_entry: config.missing_entry.unwrap_or(index.missing_entry),
            missing_source: config.missing_source,
            missing_target: config.missing_target,
        })
    }

    /// Name of the index this command reads from.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Severity reported when the index has no entry for a topic.
    pub fn missing_entry(&self) -> Severity {
        self.missing_entry
    }

    /// Entry key for the topic `key`.
    pub fn entry_key(&self, key: &str) -> String {
        self.key.replace(TOPIC_KEY_VARIABLE, key)
    }

    /// Returns `text` with the copied nodes appended to every target node.
    /// Missing entries, sources or targets leave the document unchanged.
    pub fn apply(&self, text: &str, key: &str, cache: &mut IndexedDocumentCache) -> Result<String> {
        let entry_key = self.entry_key(key);
        let Some(fragment) = cache.get_content(&entry_key)? else {
            self.missing_entry.report(
                key,
                &entry_key,
                &format!("no entry in index '{}'", self.index),
            );
            return Ok(text.to_string());
        };

        let fragment_doc = match roxmltree::Document::parse(&fragment) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(key = %key, id = %entry_key, error = %e, "index entry is not a standalone fragment");
                return Ok(text.to_string());
            }
        };

        let copied: String = self
            .source
            .select(fragment_doc.root_element())
            .into_iter()
            .map(|node| &fragment[node.range()])
            .collect();
        if copied.is_empty() {
            self.missing_source.report(
                key,
                &entry_key,
                &format!("source '{}' selected nothing", self.source.as_str()),
            );
            return Ok(text.to_string());
        }

        let doc = parse(text, key)?;
        let targets = self.target.select(doc.root_element());
        if targets.is_empty() {
            self.missing_target.report(
                key,
                &entry_key,
                &format!("target '{}' selected nothing", self.target.as_str()),
            );
            return Ok(text.to_string());
        }

        let splices = targets
            .into_iter()
            .filter(|node| node.is_element())
            .map(|node| append_child(text, node, &copied))
            .collect();
        Ok(apply_splices(text, splices))
    }
}
