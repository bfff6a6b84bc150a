//! Foreign-key stitching and ordering of collections.

use crate::config::{ResolvedEntity, SortDirection, SortKind};
use crate::record::{Record, RecordId};
use crate::store::dates::parse_timestamp;
use crate::store::Snapshot;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Index a collection by id. First occurrence wins on duplicate ids.
pub fn index_by_id(records: &[Record]) -> HashMap<RecordId, &Record> {
    let mut index = HashMap::with_capacity(records.len());
    for r in records {
        if let Some(id) = r.id() {
            index.entry(id).or_insert(r);
        }
    }
    index
}

/// Embed each include of `entity` by looking the foreign key up in the snapshot.
///
/// The relation is the referenced record when the key is set and found, JSON null
/// otherwise. With `keep_embedded` (bindings that return joined rows) a relation the
/// row already carries survives a miss. Running this twice over its own output yields
/// the same records.
pub fn enrich(entity: &ResolvedEntity, records: &[Record], snapshot: &Snapshot, keep_embedded: bool) -> Vec<Record> {
    if entity.includes.is_empty() {
        return records.to_vec();
    }
    let indexes: Vec<HashMap<RecordId, &Record>> = entity
        .includes
        .iter()
        .map(|inc| index_by_id(snapshot.get(&inc.target)))
        .collect();

    records
        .iter()
        .map(|record| {
            let mut out = record.clone();
            for (inc, index) in entity.includes.iter().zip(&indexes) {
                let found = record
                    .key(&inc.fk_column)
                    .and_then(|id| index.get(&id))
                    .map(|r| Value::Object(r.as_map().clone()));
                let embedded = match found {
                    Some(v) => v,
                    None if keep_embedded => record
                        .get(&inc.embed)
                        .filter(|v| v.is_object() && record.key(&inc.fk_column).is_some())
                        .cloned()
                        .unwrap_or(Value::Null),
                    None => Value::Null,
                };
                out.insert(inc.embed.clone(), embedded);
            }
            out
        })
        .collect()
}

/// Stable sort by the entity's configured key; records missing the key go last.
pub fn sort_records(entity: &ResolvedEntity, records: &mut [Record]) {
    let Some(sort) = &entity.sort else { return };
    let field = sort.field.as_str();
    let direction = sort.direction;
    match sort.kind {
        SortKind::Text => records.sort_by(|a, b| {
            let ka = a.get(field).map(text_key).unwrap_or_default();
            let kb = b.get(field).map(text_key).unwrap_or_default();
            directed(ka.cmp(&kb), direction)
        }),
        SortKind::Number => records.sort_by(|a, b| {
            nulls_last(a.number(field), b.number(field), direction, |x, y| {
                x.partial_cmp(y).unwrap_or(Ordering::Equal)
            })
        }),
        SortKind::Date => records.sort_by(|a, b| {
            let ka = a.str_field(field).and_then(parse_timestamp);
            let kb = b.str_field(field).and_then(parse_timestamp);
            nulls_last(ka, kb, direction, |x, y| x.cmp(y))
        }),
    }
}

fn text_key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn directed(o: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => o,
        SortDirection::Desc => o.reverse(),
    }
}

fn nulls_last<T>(
    a: Option<T>,
    b: Option<T>,
    direction: SortDirection,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => directed(cmp(&x, &y), direction),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve, ResolvedModel};
    use serde_json::json;

    fn model() -> ResolvedModel {
        resolve(&default_catalog()).expect("resolve")
    }

    fn records(values: Vec<Value>) -> Vec<Record> {
        values.into_iter().filter_map(Record::from_value).collect()
    }

    #[test]
    fn station_gets_its_city_or_null() {
        let model = model();
        let mut snapshot = Snapshot::default();
        snapshot.insert("cities", records(vec![json!({"id": 1, "name": "Acme"})]));
        let stations = records(vec![
            json!({"id": 10, "name": "North", "city_id": 1}),
            json!({"id": 11, "name": "South", "city_id": 2}),
            json!({"id": 12, "name": "West", "city_id": null}),
        ]);
        let out = enrich(model.entity("stations").expect("stations"), &stations, &snapshot, false);
        assert_eq!(out[0].get("city"), Some(&json!({"id": 1, "name": "Acme"})));
        assert_eq!(out[1].get("city"), Some(&Value::Null));
        assert_eq!(out[2].get("city"), Some(&Value::Null));
    }

    #[test]
    fn string_and_numeric_keys_match() {
        let model = model();
        let mut snapshot = Snapshot::default();
        snapshot.insert("buses", records(vec![json!({"id": "7", "plate_number": "AB-1"})]));
        let rows = records(vec![json!({"id": 1, "bus_id": 7})]);
        let out = enrich(model.entity("maintenance").expect("maintenance"), &rows, &snapshot, false);
        assert_eq!(out[0].relation("bus").and_then(|b| b.get("plate_number")), Some(&json!("AB-1")));
    }

    #[test]
    fn enrichment_is_idempotent() {
        let model = model();
        let mut snapshot = Snapshot::default();
        snapshot.insert("stations", records(vec![json!({"id": 1, "name": "A"}), json!({"id": 2, "name": "B"})]));
        let lines = records(vec![
            json!({"id": 5, "name": "L5", "origin_station_id": 1, "destination_station_id": 9}),
        ]);
        let entity = model.entity("bus_lines").expect("bus_lines");
        let once = enrich(entity, &lines, &snapshot, false);
        let twice = enrich(entity, &once, &snapshot, false);
        assert_eq!(once, twice);
        assert_eq!(once[0].get("destination_station"), Some(&Value::Null));
    }

    #[test]
    fn stale_relation_is_cleared_without_keep() {
        let model = model();
        let snapshot = Snapshot::default();
        let rows = records(vec![json!({"id": 1, "city_id": 1, "city": {"id": 1, "name": "Old"}})]);
        let entity = model.entity("stations").expect("stations");
        assert_eq!(enrich(entity, &rows, &snapshot, false)[0].get("city"), Some(&Value::Null));
        assert_eq!(
            enrich(entity, &rows, &snapshot, true)[0].get("city"),
            Some(&json!({"id": 1, "name": "Old"}))
        );
    }

    #[test]
    fn trips_sort_newest_first_with_unparseable_last() {
        let model = model();
        let mut trips = records(vec![
            json!({"id": 1, "departure_time": "2024-03-14T08:00:00"}),
            json!({"id": 2, "departure_time": "tbd"}),
            json!({"id": 3, "departure_time": "16/03/2024"}),
            json!({"id": 4, "departure_time": "2024-03-15T08:00:00"}),
        ]);
        sort_records(model.entity("trips").expect("trips"), &mut trips);
        let ids: Vec<String> = trips.iter().filter_map(|t| t.id()).map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["3", "4", "1", "2"]);
    }

    #[test]
    fn names_sort_case_sensitive() {
        let model = model();
        let mut cities = records(vec![
            json!({"id": 1, "name": "bravo"}),
            json!({"id": 2, "name": "Alpha"}),
            json!({"id": 3}),
            json!({"id": 4, "name": "Charlie"}),
        ]);
        sort_records(model.entity("cities").expect("cities"), &mut cities);
        let ids: Vec<String> = cities.iter().filter_map(|c| c.id()).map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["3", "2", "4", "1"]);
    }
}
