//! Load the catalog from a JSON file and resolve it into the runtime model.

use crate::config::resolved::{IncludeSpec, ResolvedEntity, ResolvedModel};
use crate::config::{validate, EntityConfig, FullConfig};
use crate::error::ConfigError;
use std::collections::{HashMap, VecDeque};
use std::path::Path;

/// Build resolved model from the catalog (validates first).
/// Entities come out in dependency order; ties keep catalog order.
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, ConfigError> {
    validate(config)?;

    let position: HashMap<&str, usize> = config
        .entities
        .iter()
        .enumerate()
        .map(|(i, e)| (e.name.as_str(), i))
        .collect();

    let includes_by_entity: HashMap<&str, Vec<IncludeSpec>> =
        config.relations.iter().fold(HashMap::new(), |mut m, r| {
            m.entry(r.from_entity.as_str()).or_default().push(IncludeSpec {
                embed: r.embed.clone(),
                fk_column: r.from_column.clone(),
                target: r.to_entity.clone(),
            });
            m
        });

    // Kahn's algorithm over target -> referrer edges.
    let n = config.entities.len();
    let mut in_degree = vec![0usize; n];
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n];
    for r in &config.relations {
        let from = position[r.from_entity.as_str()];
        let to = position[r.to_entity.as_str()];
        if !edges[to].contains(&from) {
            edges[to].push(from);
            in_degree[from] += 1;
        }
    }
    let mut ready: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_front() {
        order.push(i);
        let mut next: Vec<usize> = Vec::new();
        for &j in &edges[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                next.push(j);
            }
        }
        next.sort_unstable();
        ready.extend(next);
        ready.make_contiguous().sort_unstable();
    }
    if order.len() < n {
        let stuck: Vec<&str> = (0..n)
            .filter(|i| !order.contains(i))
            .map(|i| config.entities[i].name.as_str())
            .collect();
        return Err(ConfigError::Cycle(stuck.join(", ")));
    }

    let mut entities = Vec::with_capacity(n);
    let mut index_by_name = HashMap::new();
    for i in order {
        let e = &config.entities[i];
        index_by_name.insert(e.name.clone(), entities.len());
        entities.push(ResolvedEntity {
            name: e.name.clone(),
            table: e.table.clone(),
            primary_key: e.primary_key.clone(),
            pk_aliases: pk_aliases(e),
            sort: e.sort.clone(),
            includes: includes_by_entity.get(e.name.as_str()).cloned().unwrap_or_default(),
            validation: e.validation.clone(),
        });
    }

    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    for r in &config.relations {
        let list = dependents.entry(r.to_entity.clone()).or_default();
        if !list.contains(&r.from_entity) {
            list.push(r.from_entity.clone());
        }
    }

    Ok(ResolvedModel {
        entities,
        index_by_name,
        dependents,
    })
}

/// The stored primary-key column counts as an alias of `id` when it is named differently.
fn pk_aliases(e: &EntityConfig) -> Vec<String> {
    let mut aliases = e.pk_aliases.clone();
    if e.primary_key != "id" && !aliases.contains(&e.primary_key) {
        aliases.insert(0, e.primary_key.clone());
    }
    aliases
}

/// Read a catalog override from disk.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<FullConfig, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading catalog");
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::catalog::*;
    use crate::config::{EntityConfig, RelationConfig};

    fn bare(name: &str) -> EntityConfig {
        EntityConfig {
            name: name.into(),
            table: name.into(),
            primary_key: "id".into(),
            pk_aliases: Vec::new(),
            sort: None,
            validation: Default::default(),
            comment: None,
        }
    }

    fn rel(from: &str, col: &str, to: &str, embed: &str) -> RelationConfig {
        RelationConfig {
            from_entity: from.into(),
            from_column: col.into(),
            to_entity: to.into(),
            embed: embed.into(),
        }
    }

    #[test]
    fn default_catalog_orders_targets_before_referrers() {
        let model = resolve(&default_catalog()).expect("resolve");
        for e in &model.entities {
            let rank = model.rank(&e.name).expect("rank");
            for inc in &e.includes {
                assert!(model.rank(&inc.target).expect("target") < rank, "{} before {}", inc.target, e.name);
            }
        }
        assert_eq!(model.entities[0].name, CITIES);
    }

    #[test]
    fn transitive_dependents_of_cities_reach_tickets() {
        let model = resolve(&default_catalog()).expect("resolve");
        let names: Vec<&str> = model
            .transitive_dependents(CITIES)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names.first(), Some(&STATIONS));
        assert!(names.contains(&BUS_LINES));
        assert!(names.contains(&TICKETS));
        assert!(!names.contains(&BUSES));
        let trips = names.iter().position(|n| *n == TRIPS).expect("trips");
        let tickets = names.iter().position(|n| *n == TICKETS).expect("tickets");
        assert!(trips < tickets);
    }

    #[test]
    fn cycle_is_rejected() {
        let config = FullConfig {
            entities: vec![bare("a"), bare("b")],
            relations: vec![rel("a", "b_id", "b", "b"), rel("b", "a_id", "a", "a")],
        };
        assert!(matches!(resolve(&config), Err(ConfigError::Cycle(_))));
    }

    #[test]
    fn unknown_target_is_rejected() {
        let config = FullConfig {
            entities: vec![bare("a")],
            relations: vec![rel("a", "z_id", "z", "z")],
        };
        assert!(matches!(
            resolve(&config),
            Err(ConfigError::MissingReference { kind: "entity", .. })
        ));
    }

    #[test]
    fn duplicate_embed_is_rejected() {
        let config = FullConfig {
            entities: vec![bare("a"), bare("b")],
            relations: vec![rel("a", "b_id", "b", "b"), rel("a", "other_b_id", "b", "b")],
        };
        assert!(matches!(resolve(&config), Err(ConfigError::DuplicateRelation { .. })));
    }

    #[test]
    fn catalog_round_trips_through_json_file() {
        let path = std::env::temp_dir().join(format!("busnet-catalog-{}.json", uuid::Uuid::new_v4()));
        let json = serde_json::to_string(&default_catalog()).expect("serialize");
        std::fs::write(&path, json).expect("write");
        let loaded = load_from_file(&path).expect("load");
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.entities.len(), default_catalog().entities.len());
        assert!(resolve(&loaded).is_ok());
    }
}
