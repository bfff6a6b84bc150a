//! Resolved entity model: catalog validated and flattened for runtime use.

use crate::config::{SortConfig, ValidationRule};
use std::collections::HashMap;

/// One foreign key of an entity: `fk_column` is looked up in `target`, the hit is stored under `embed`.
#[derive(Clone, Debug, PartialEq)]
pub struct IncludeSpec {
    pub embed: String,
    pub fk_column: String,
    /// Logical name of the referenced entity.
    pub target: String,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub name: String,
    pub table: String,
    pub primary_key: String,
    pub pk_aliases: Vec<String>,
    pub sort: Option<SortConfig>,
    /// Relations this entity embeds (to-one).
    pub includes: Vec<IncludeSpec>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    /// Lower-cased resource path segment.
    pub fn path_segment(&self) -> String {
        self.table.to_lowercase()
    }

    pub fn is_embed(&self, key: &str) -> bool {
        self.includes.iter().any(|i| i.embed == key)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    /// Entities in topological order: every include target precedes its referrers.
    pub entities: Vec<ResolvedEntity>,
    pub(crate) index_by_name: HashMap<String, usize>,
    /// Direct referrers per entity name.
    pub(crate) dependents: HashMap<String, Vec<String>>,
}

impl ResolvedModel {
    pub fn entity(&self, name: &str) -> Option<&ResolvedEntity> {
        self.index_by_name.get(name).map(|&i| &self.entities[i])
    }

    pub fn entity_by_table(&self, table: &str) -> Option<&ResolvedEntity> {
        let table = table.to_lowercase();
        self.entities.iter().find(|e| e.path_segment() == table)
    }

    /// Position in the topological order.
    pub fn rank(&self, name: &str) -> Option<usize> {
        self.index_by_name.get(name).copied()
    }

    pub fn direct_dependents(&self, name: &str) -> &[String] {
        self.dependents.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every entity that embeds `name`, directly or through another embed, in topological order.
    pub fn transitive_dependents(&self, name: &str) -> Vec<&ResolvedEntity> {
        let mut seen = vec![false; self.entities.len()];
        let mut stack: Vec<&str> = vec![name];
        while let Some(current) = stack.pop() {
            for dep in self.direct_dependents(current) {
                if let Some(i) = self.rank(dep) {
                    if !seen[i] {
                        seen[i] = true;
                        stack.push(dep);
                    }
                }
            }
        }
        self.entities
            .iter()
            .enumerate()
            .filter(|(i, _)| seen[*i])
            .map(|(_, e)| e)
            .collect()
    }
}
