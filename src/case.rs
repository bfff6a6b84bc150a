//! Key normalization: backend rows arrive as snake_case, camelCase or UPPER_CASE (Oracle views);
//! every row is rewritten once into snake_case keys with `id` as primary key.

use crate::config::ResolvedEntity;
use crate::record::Record;
use serde_json::{Map, Value};

/// Convert a single identifier from camelCase to snake_case.
/// e.g. "busLineId" -> "bus_line_id". Keys with no lower-case letter are only lower-cased,
/// so "CITY_ID" -> "city_id".
pub fn to_snake_case(s: &str) -> String {
    if !s.chars().any(|c| c.is_lowercase()) {
        return s.to_lowercase();
    }
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(c);
            prev_lower_or_digit = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Logical entity name as accepted by `fetch_entity`: "busLines", "bus_lines" and "BUS_LINES" agree.
pub fn entity_name(s: &str) -> String {
    to_snake_case(s.trim())
}

/// Convert all keys of a JSON object to snake_case (in place). On collision the
/// key already in canonical form wins.
pub fn object_keys_to_snake_case(obj: &mut Map<String, Value>) {
    let keys: Vec<String> = obj.keys().cloned().collect();
    for k in keys {
        let snake = to_snake_case(&k);
        if snake != k {
            if let Some(v) = obj.remove(&k) {
                obj.entry(snake).or_insert(v);
            }
        }
    }
}

/// Canonical shape for one row of `entity`. Non-objects yield `None`.
pub fn normalize_record(entity: &ResolvedEntity, value: Value) -> Option<Record> {
    let Value::Object(mut map) = value else {
        return None;
    };
    object_keys_to_snake_case(&mut map);
    if !map.contains_key("id") {
        for alias in &entity.pk_aliases {
            if let Some(v) = map.remove(alias) {
                map.insert("id".to_string(), v);
                break;
            }
        }
    }
    Some(Record::new(map))
}

/// Normalize a list payload; rows that are not objects are dropped.
pub fn normalize_rows(entity: &ResolvedEntity, rows: Vec<Value>) -> Vec<Record> {
    let total = rows.len();
    let out: Vec<Record> = rows
        .into_iter()
        .filter_map(|row| normalize_record(entity, row))
        .collect();
    if out.len() < total {
        tracing::warn!(
            entity = %entity.name,
            dropped = total - out.len(),
            "dropped rows that are not JSON objects"
        );
    }
    out
}

/// Outgoing payload: snake_case keys, no embedded relations.
pub fn payload_for(entity: &ResolvedEntity, value: Value) -> Option<Value> {
    let mut record = normalize_record(entity, value)?;
    for inc in &entity.includes {
        record.remove(&inc.embed);
    }
    Some(record.into_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve};
    use serde_json::json;

    #[test]
    fn snake_case_conversions() {
        assert_eq!(to_snake_case("busLineId"), "bus_line_id");
        assert_eq!(to_snake_case("CITY_ID"), "city_id");
        assert_eq!(to_snake_case("ID"), "id");
        assert_eq!(to_snake_case("origin_station_id"), "origin_station_id");
        assert_eq!(to_snake_case("address2Line"), "address2_line");
        assert_eq!(entity_name("busLines"), "bus_lines");
    }

    #[test]
    fn oracle_row_becomes_canonical() {
        let model = resolve(&default_catalog()).expect("resolve");
        let cities = model.entity("cities").expect("cities");
        let r = normalize_record(cities, json!({"ID_CITY": 3, "NAME": "Acme"})).expect("object");
        assert_eq!(r.id().map(|i| i.to_string()), Some("3".to_string()));
        assert_eq!(r.str_field("name"), Some("Acme"));
        assert!(r.get("id_city").is_none());
    }

    #[test]
    fn existing_id_wins_over_alias() {
        let model = resolve(&default_catalog()).expect("resolve");
        let cities = model.entity("cities").expect("cities");
        let r = normalize_record(cities, json!({"id": 1, "id_city": 9})).expect("object");
        assert_eq!(r.id().map(|i| i.to_string()), Some("1".to_string()));
    }

    #[test]
    fn payload_strips_embeds() {
        let model = resolve(&default_catalog()).expect("resolve");
        let stations = model.entity("stations").expect("stations");
        let p = payload_for(stations, json!({"name": "North", "cityId": 1, "city": {"id": 1}})).expect("object");
        assert_eq!(p, json!({"name": "North", "city_id": 1}));
    }
}
