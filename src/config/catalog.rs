//! Built-in catalog of the bus network: entities, foreign keys, ordering, form rules.

use crate::config::types::*;
use serde_json::Value;
use std::collections::HashMap;

pub const CITIES: &str = "cities";
pub const STATIONS: &str = "stations";
pub const BUS_LINES: &str = "bus_lines";
pub const BUSES: &str = "buses";
pub const DRIVERS: &str = "drivers";
pub const TRIPS: &str = "trips";
pub const TICKETS: &str = "tickets";
pub const SUBSCRIPTIONS: &str = "subscriptions";
pub const MAINTENANCE: &str = "maintenance";
pub const INCIDENTS: &str = "incidents";
pub const SCHEDULES: &str = "schedules";
pub const LINE_STATIONS: &str = "line_stations";
pub const SCHEDULE_STOPS: &str = "schedule_stops";

/// Pseudo-entity accepted by `fetch_entity`: recomputes the dashboard summary.
pub const DASHBOARD: &str = "dashboard";

pub fn default_catalog() -> FullConfig {
    let entities = vec![
        entity(CITIES, &["id_city"], by_name("name"), rules(&[
            ("name", required()),
            ("country", required()),
        ])),
        entity(STATIONS, &["id_station"], by_name("name"), rules(&[
            ("name", required()),
            ("city_id", required()),
            ("latitude", range(-90.0, 90.0)),
            ("longitude", range(-180.0, 180.0)),
        ])),
        entity(BUS_LINES, &["id_line", "id_bus_line"], by_name("name"), rules(&[
            ("code", required()),
            ("name", required()),
            ("origin_station_id", required()),
            ("destination_station_id", required()),
            ("distance_km", at_least(0.0)),
            ("duration_minutes", at_least(0.0)),
            ("status", one_of(&["active", "inactive", "maintenance"])),
        ])),
        entity(BUSES, &["id_bus"], by_name("plate_number"), rules(&[
            ("plate_number", required()),
            ("model", required()),
            ("capacity", at_least(1.0)),
            ("status", one_of(&["available", "in_service", "maintenance", "retired"])),
        ])),
        entity(DRIVERS, &["id_driver"], by_name("name"), rules(&[
            ("name", required()),
            ("license_number", required()),
            ("email", email()),
            ("status", one_of(&["active", "inactive", "on_leave"])),
        ])),
        entity(TRIPS, &["id_trip"], newest_first("departure_time"), rules(&[
            ("bus_line_id", required()),
            ("bus_id", required()),
            ("driver_id", required()),
            ("departure_time", required()),
            ("available_seats", at_least(0.0)),
            ("price", at_least(0.0)),
            ("status", one_of(&["scheduled", "in_progress", "completed", "cancelled"])),
        ])),
        entity(TICKETS, &["id_ticket"], newest_first("booking_date"), rules(&[
            ("trip_id", required()),
            ("passenger_name", required()),
            ("passenger_email", email()),
            ("price", at_least(0.0)),
            ("status", one_of(&["booked", "confirmed", "used", "cancelled"])),
        ])),
        entity(SUBSCRIPTIONS, &["id_subscription"], newest_first("start_date"), rules(&[
            ("user_name", required()),
            ("user_email", email()),
            ("bus_line_id", required()),
            ("start_date", required()),
            ("price", at_least(0.0)),
            ("type", one_of(&["weekly", "monthly", "yearly"])),
            ("status", one_of(&["active", "expired", "cancelled"])),
        ])),
        entity(MAINTENANCE, &["id_maintenance"], newest_first("scheduled_date"), rules(&[
            ("bus_id", required()),
            ("scheduled_date", required()),
            ("cost", at_least(0.0)),
            ("type", one_of(&["routine", "repair", "inspection"])),
            ("status", one_of(&["scheduled", "in_progress", "completed"])),
        ])),
        entity(INCIDENTS, &["id_incident"], newest_first("incident_date"), rules(&[
            ("bus_id", required()),
            ("incident_date", required()),
            ("type", one_of(&["accident", "breakdown", "delay", "other"])),
            ("severity", one_of(&["low", "medium", "high", "critical"])),
            ("status", one_of(&["open", "investigating", "resolved"])),
        ])),
        entity(SCHEDULES, &["id_schedule"], by_name("service_type"), rules(&[
            ("id_line", required()),
            ("service_type", required()),
            ("frequency_min", at_least(1.0)),
        ])),
        entity(
            LINE_STATIONS,
            &["id_line_station"],
            Some(SortConfig {
                field: "stop_order".into(),
                kind: SortKind::Number,
                direction: SortDirection::Asc,
            }),
            rules(&[
                ("id_line", required()),
                ("id_station", required()),
                ("stop_order", at_least(1.0)),
                ("distance_from_start_km", at_least(0.0)),
            ]),
        ),
        entity(SCHEDULE_STOPS, &["id_schedule_stop"], by_name("scheduled_stop_time"), rules(&[
            ("id_schedule", required()),
            ("id_station", required()),
        ])),
    ];

    let relations = vec![
        relation(STATIONS, "city_id", CITIES, "city"),
        relation(BUS_LINES, "origin_station_id", STATIONS, "origin_station"),
        relation(BUS_LINES, "destination_station_id", STATIONS, "destination_station"),
        relation(TRIPS, "bus_line_id", BUS_LINES, "bus_line"),
        relation(TRIPS, "bus_id", BUSES, "bus"),
        relation(TRIPS, "driver_id", DRIVERS, "driver"),
        relation(TICKETS, "trip_id", TRIPS, "trip"),
        relation(SUBSCRIPTIONS, "bus_line_id", BUS_LINES, "bus_line"),
        relation(MAINTENANCE, "bus_id", BUSES, "bus"),
        relation(INCIDENTS, "trip_id", TRIPS, "trip"),
        relation(INCIDENTS, "bus_id", BUSES, "bus"),
        relation(INCIDENTS, "driver_id", DRIVERS, "driver"),
        relation(SCHEDULES, "id_line", BUS_LINES, "bus_line"),
        relation(LINE_STATIONS, "id_line", BUS_LINES, "bus_line"),
        relation(LINE_STATIONS, "id_station", STATIONS, "station"),
        relation(SCHEDULE_STOPS, "id_schedule", SCHEDULES, "schedule"),
        relation(SCHEDULE_STOPS, "id_station", STATIONS, "station"),
    ];

    FullConfig {
        entities,
        relations,
    }
}

fn entity(
    name: &str,
    pk_aliases: &[&str],
    sort: Option<SortConfig>,
    validation: HashMap<String, ValidationRule>,
) -> EntityConfig {
    EntityConfig {
        name: name.to_string(),
        table: name.to_string(),
        primary_key: "id".to_string(),
        pk_aliases: pk_aliases.iter().map(|s| s.to_string()).collect(),
        sort,
        validation,
        comment: None,
    }
}

fn relation(from: &str, column: &str, to: &str, embed: &str) -> RelationConfig {
    RelationConfig {
        from_entity: from.to_string(),
        from_column: column.to_string(),
        to_entity: to.to_string(),
        embed: embed.to_string(),
    }
}

fn by_name(field: &str) -> Option<SortConfig> {
    Some(SortConfig {
        field: field.to_string(),
        kind: SortKind::Text,
        direction: SortDirection::Asc,
    })
}

fn newest_first(field: &str) -> Option<SortConfig> {
    Some(SortConfig {
        field: field.to_string(),
        kind: SortKind::Date,
        direction: SortDirection::Desc,
    })
}

fn rules(entries: &[(&str, ValidationRule)]) -> HashMap<String, ValidationRule> {
    entries
        .iter()
        .map(|(col, rule)| (col.to_string(), rule.clone()))
        .collect()
}

fn required() -> ValidationRule {
    ValidationRule {
        required: Some(true),
        ..Default::default()
    }
}

fn email() -> ValidationRule {
    ValidationRule {
        format: Some("email".into()),
        ..Default::default()
    }
}

fn at_least(min: f64) -> ValidationRule {
    ValidationRule {
        minimum: Some(min),
        ..Default::default()
    }
}

fn range(min: f64, max: f64) -> ValidationRule {
    ValidationRule {
        minimum: Some(min),
        maximum: Some(max),
        ..Default::default()
    }
}

fn one_of(values: &[&str]) -> ValidationRule {
    ValidationRule {
        allowed: Some(values.iter().map(|v| Value::String(v.to_string())).collect()),
        ..Default::default()
    }
}
