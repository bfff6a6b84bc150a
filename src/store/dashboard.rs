//! Dashboard summary derived from the current snapshots. Never fetched on its own.

use crate::config::catalog::{BUSES, INCIDENTS, MAINTENANCE, TICKETS, TRIPS};
use crate::record::Record;
use crate::store::dates::is_on;
use crate::store::Snapshot;
use chrono::NaiveDate;
use serde::Serialize;

/// Collections the summary is computed from.
pub const DASHBOARD_SOURCES: &[&str] = &[BUSES, TRIPS, TICKETS, INCIDENTS, MAINTENANCE];

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_buses: usize,
    pub active_buses: usize,
    pub total_trips: usize,
    pub today_trips: usize,
    pub total_tickets: usize,
    pub today_revenue: f64,
    pub open_incidents: usize,
    pub maintenance_pending: usize,
}

fn status_in(r: &Record, statuses: &[&str]) -> bool {
    r.str_field("status").map(|s| statuses.contains(&s)).unwrap_or(false)
}

impl DashboardStats {
    /// Missing collections count as empty.
    pub fn compute(snapshot: &Snapshot, today: NaiveDate) -> Self {
        let buses = snapshot.get(BUSES);
        let trips = snapshot.get(TRIPS);
        let tickets = snapshot.get(TICKETS);
        let incidents = snapshot.get(INCIDENTS);
        let maintenance = snapshot.get(MAINTENANCE);

        let today_revenue = tickets
            .iter()
            .filter(|t| is_on(t.str_field("booking_date"), today))
            .map(|t| t.number("price").unwrap_or(0.0))
            .sum();

        DashboardStats {
            total_buses: buses.len(),
            active_buses: buses.iter().filter(|b| status_in(b, &["available", "in_service"])).count(),
            total_trips: trips.len(),
            today_trips: trips
                .iter()
                .filter(|t| is_on(t.str_field("departure_time"), today))
                .count(),
            total_tickets: tickets.len(),
            today_revenue,
            open_incidents: incidents.iter().filter(|i| status_in(i, &["open", "investigating"])).count(),
            maintenance_pending: maintenance.iter().filter(|m| status_in(m, &["scheduled"])).count(),
        }
    }
}
