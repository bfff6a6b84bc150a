//! Catalog validation: referential integrity of relations and unique names.

use crate::config::FullConfig;
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(config: &FullConfig) -> Result<(), ConfigError> {
    if config.entities.is_empty() {
        return Err(ConfigError::Validation("at least one entity required".into()));
    }

    let mut names = HashSet::new();
    let mut tables = HashSet::new();
    for e in &config.entities {
        if e.name.is_empty() || e.table.is_empty() {
            return Err(ConfigError::Validation(
                "entity name and table must be non-empty".into(),
            ));
        }
        if !names.insert(e.name.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate entity: {}", e.name)));
        }
        if !tables.insert(e.table.to_lowercase()) {
            return Err(ConfigError::DuplicateTable(e.table.clone()));
        }
    }

    let mut embeds = HashSet::new();
    for r in &config.relations {
        if !names.contains(r.from_entity.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "entity",
                id: r.from_entity.clone(),
            });
        }
        if !names.contains(r.to_entity.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "entity",
                id: r.to_entity.clone(),
            });
        }
        if r.from_entity == r.to_entity {
            return Err(ConfigError::Cycle(r.from_entity.clone()));
        }
        if r.from_column.is_empty() || r.embed.is_empty() {
            return Err(ConfigError::Validation(format!(
                "relation {} -> {} needs a column and an embed name",
                r.from_entity, r.to_entity
            )));
        }
        if r.embed == r.from_column || r.embed == "id" {
            return Err(ConfigError::Validation(format!(
                "embed name '{}' on {} would overwrite a column",
                r.embed, r.from_entity
            )));
        }
        if !embeds.insert((r.from_entity.as_str(), r.embed.as_str())) {
            return Err(ConfigError::DuplicateRelation {
                entity: r.from_entity.clone(),
                embed: r.embed.clone(),
            });
        }
    }

    Ok(())
}
