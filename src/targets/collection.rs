use std::collections::HashMap;

use super::target::{Target, TargetKind};

/// Identifier to target map. A later target with an id already present
/// replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct TargetCollection {
    index: HashMap<String, Target>,
}

impl TargetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target, and for enumerations each enumerator as well.
    pub fn add(&mut self, target: Target) {
        if let TargetKind::Enumeration(enumeration) = &target.kind {
            for element in &enumeration.elements {
                self.index.insert(element.id.clone(), element.clone());
            }
        }
        self.index.insert(target.id.clone(), target);
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.index.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.index.values()
    }
}
