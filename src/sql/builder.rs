//! Builds parameterized SELECT/INSERT/UPDATE/DELETE for the joined PostgreSQL binding.
//! Every statement yields one jsonb column per row; to-one includes are nested
//! `jsonb_build_object` subqueries, so a row comes back already joined.

use crate::config::{ResolvedEntity, ResolvedModel, SortDirection};
use crate::sql::PgBindValue;
use serde_json::{Map, Value};

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL.
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgBindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgBindValue) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }
}

/// jsonb of the row aliased `alias`, with every include of `entity` embedded (recursively).
/// A dangling or null foreign key embeds JSON null.
fn row_json(model: &ResolvedModel, entity: &ResolvedEntity, alias: &str, schema: &str) -> String {
    let pairs: Vec<String> = entity
        .includes
        .iter()
        .enumerate()
        .filter_map(|(i, inc)| {
            let target = model.entity(&inc.target)?;
            let sub = format!("{}_{}", alias, i);
            let inner = row_json(model, target, &sub, schema);
            Some(format!(
                "{}, (SELECT {} FROM {} {} WHERE {}.{}::text = {}.{}::text)",
                literal(&inc.embed),
                inner,
                qualified_table(schema, &target.table),
                sub,
                sub,
                quoted(&target.primary_key),
                alias,
                quoted(&inc.fk_column)
            ))
        })
        .collect();
    if pairs.is_empty() {
        format!("to_jsonb({})", alias)
    } else {
        format!("(to_jsonb({}) || jsonb_build_object({}))", alias, pairs.join(", "))
    }
}

/// SELECT list with includes, optional exact-match filter, ORDER BY the entity's sort field.
pub fn select_list_with_includes(
    model: &ResolvedModel,
    entity: &ResolvedEntity,
    filter: Option<(&str, &Value)>,
    schema: &str,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table);
    let select = row_json(model, entity, MAIN_ALIAS, schema);

    let where_clause = match filter {
        Some((col, val)) => {
            let n = q.push_param(PgBindValue::text(val));
            format!(" WHERE {}.{}::text = ${}", MAIN_ALIAS, quoted(col), n)
        }
        None => String::new(),
    };
    let order_clause = match &entity.sort {
        Some(sort) => {
            let dir = match sort.direction {
                SortDirection::Asc => "ASC NULLS LAST",
                SortDirection::Desc => "DESC NULLS LAST",
            };
            format!(
                " ORDER BY {}.{} {}, {}.{}",
                MAIN_ALIAS,
                quoted(&sort.field),
                dir,
                MAIN_ALIAS,
                quoted(&entity.primary_key)
            )
        }
        None => format!(" ORDER BY {}.{}", MAIN_ALIAS, quoted(&entity.primary_key)),
    };

    q.sql = format!(
        "SELECT {} FROM {} {}{}{}",
        select, table, MAIN_ALIAS, where_clause, order_clause
    );
    q
}

/// INSERT the columns present in `body`; values are coerced to column types by
/// `jsonb_populate_record`, omitted columns keep their DB defaults.
pub fn insert(entity: &ResolvedEntity, body: &Map<String, Value>, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table);
    if body.is_empty() {
        q.sql = format!(
            "INSERT INTO {} AS {} DEFAULT VALUES RETURNING to_jsonb({})",
            table, MAIN_ALIAS, MAIN_ALIAS
        );
        return q;
    }
    let cols = body.keys().map(|k| quoted(k)).collect::<Vec<_>>().join(", ");
    let n = q.push_param(PgBindValue::json(&Value::Object(body.clone())));
    q.sql = format!(
        "INSERT INTO {} AS {} ({}) SELECT {} FROM jsonb_populate_record(NULL::{}, ${}::jsonb) RETURNING to_jsonb({})",
        table, MAIN_ALIAS, cols, cols, table, n, MAIN_ALIAS
    );
    q
}

/// UPDATE by id: SET only columns present in body (primary key excluded).
/// An empty patch degrades to a read of the row.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &Map<String, Value>, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table);
    let pk = quoted(&entity.primary_key);
    let mut patch = body.clone();
    patch.remove(&entity.primary_key);
    patch.remove("id");
    if patch.is_empty() {
        let n = q.push_param(PgBindValue::text(id));
        q.sql = format!(
            "SELECT to_jsonb({}) FROM {} {} WHERE {}.{}::text = ${}",
            MAIN_ALIAS, table, MAIN_ALIAS, MAIN_ALIAS, pk, n
        );
        return q;
    }
    let cols = patch.keys().map(|k| quoted(k)).collect::<Vec<_>>().join(", ");
    let doc = q.push_param(PgBindValue::json(&Value::Object(patch)));
    let id_param = q.push_param(PgBindValue::text(id));
    q.sql = format!(
        "UPDATE {} AS {} SET ({}) = (SELECT {} FROM jsonb_populate_record(NULL::{}, ${}::jsonb)) WHERE {}.{}::text = ${} RETURNING to_jsonb({})",
        table, MAIN_ALIAS, cols, cols, table, doc, MAIN_ALIAS, pk, id_param, MAIN_ALIAS
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, id: &Value, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table);
    let n = q.push_param(PgBindValue::text(id));
    q.sql = format!(
        "DELETE FROM {} AS {} WHERE {}.{}::text = ${} RETURNING to_jsonb({})",
        table,
        MAIN_ALIAS,
        MAIN_ALIAS,
        quoted(&entity.primary_key),
        n,
        MAIN_ALIAS
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_catalog, resolve};
    use serde_json::json;

    #[test]
    fn stations_select_embeds_city() {
        let model = resolve(&default_catalog()).expect("resolve");
        let stations = model.entity("stations").expect("stations");
        let q = select_list_with_includes(&model, stations, None, "public");
        assert!(q.sql.starts_with("SELECT (to_jsonb(main) || jsonb_build_object('city', (SELECT to_jsonb(main_0) FROM \"public\".\"cities\" main_0 WHERE main_0.\"id\"::text = main.\"city_id\"::text)))"));
        assert!(q.sql.ends_with("ORDER BY main.\"name\" ASC NULLS LAST, main.\"id\""));
        assert!(q.params.is_empty());
    }

    #[test]
    fn tickets_select_nests_trip_bus_line() {
        let model = resolve(&default_catalog()).expect("resolve");
        let tickets = model.entity("tickets").expect("tickets");
        let q = select_list_with_includes(&model, tickets, None, "public");
        assert!(q.sql.contains("'trip', (SELECT (to_jsonb(main_0) || jsonb_build_object('bus_line'"));
        assert!(q.sql.contains("\"public\".\"cities\""));
        assert!(q.sql.contains("ORDER BY main.\"booking_date\" DESC NULLS LAST"));
    }

    #[test]
    fn filter_is_a_text_parameter() {
        let model = resolve(&default_catalog()).expect("resolve");
        let buses = model.entity("buses").expect("buses");
        let q = select_list_with_includes(&model, buses, Some(("status", &json!("available"))), "fleet");
        assert!(q.sql.contains("FROM \"fleet\".\"buses\" main WHERE main.\"status\"::text = $1"));
        assert_eq!(q.params, vec![PgBindValue::Text("available".into())]);
    }

    #[test]
    fn update_excludes_primary_key_and_binds_id_last() {
        let model = resolve(&default_catalog()).expect("resolve");
        let cities = model.entity("cities").expect("cities");
        let body = json!({"id": 4, "name": "Acme"});
        let q = update(cities, &json!(4), body.as_object().expect("object"), "public");
        assert!(q.sql.starts_with("UPDATE \"public\".\"cities\" AS main SET (\"name\") = (SELECT \"name\" FROM jsonb_populate_record(NULL::\"public\".\"cities\", $1::jsonb))"));
        assert!(q.sql.contains("WHERE main.\"id\"::text = $2"));
        assert_eq!(q.params[1], PgBindValue::Text("4".into()));
    }

    #[test]
    fn insert_and_delete_shapes() {
        let model = resolve(&default_catalog()).expect("resolve");
        let cities = model.entity("cities").expect("cities");
        let body = json!({"name": "Acme", "country": "FR"});
        let q = insert(cities, body.as_object().expect("object"), "public");
        assert!(q.sql.contains("(\"country\", \"name\") SELECT \"country\", \"name\" FROM jsonb_populate_record"));
        assert!(q.sql.ends_with("RETURNING to_jsonb(main)"));
        let d = delete(cities, &json!("7"), "public");
        assert_eq!(
            d.sql,
            "DELETE FROM \"public\".\"cities\" AS main WHERE main.\"id\"::text = $1 RETURNING to_jsonb(main)"
        );
    }
}
