//! Process-wide snapshot store: fetches collections through a [`Backend`], stitches foreign
//! keys, keeps dependents re-enriched, and derives the dashboard summary.
//!
//! Every write (collection replace, cascade re-enrichment, stats) happens under one write
//! lock with no await inside, so an enrichment pass never sees a half-applied fetch.

pub mod dashboard;
pub mod dates;
pub mod enrich;

pub use dashboard::{DashboardStats, DASHBOARD_SOURCES};

use crate::case;
use crate::client::Backend;
use crate::config::catalog::{DASHBOARD, TICKETS};
use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::StoreError;
use crate::record::{Record, RecordId};
use crate::service::RequestValidator;
use chrono::{Local, NaiveDate};
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    Uninitialized,
    Loading,
    Ready,
}

/// Last-fetched value of every collection. Cloning is cheap: collections are shared.
#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    collections: HashMap<String, Arc<Vec<Record>>>,
}

impl Snapshot {
    /// Records of `name`; empty when never loaded.
    pub fn get(&self, name: &str) -> &[Record] {
        self.collections.get(name).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn collection(&self, name: &str) -> Option<Arc<Vec<Record>>> {
        self.collections.get(name).cloned()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.collections.contains_key(name)
    }

    /// Replace a collection wholesale. Returns false when the new value is identical.
    pub fn insert(&mut self, name: &str, records: Vec<Record>) -> bool {
        if let Some(current) = self.collections.get(name) {
            if **current == records {
                return false;
            }
        }
        self.collections.insert(name.to_string(), Arc::new(records));
        true
    }
}

struct Inner {
    snapshot: Snapshot,
    stats: Option<DashboardStats>,
    phase: LoadPhase,
    refreshes_in_flight: usize,
}

pub struct DataStore {
    backend: Arc<dyn Backend>,
    model: Arc<ResolvedModel>,
    inner: RwLock<Inner>,
    revision: watch::Sender<u64>,
}

impl DataStore {
    pub fn new(backend: Arc<dyn Backend>, model: Arc<ResolvedModel>) -> Self {
        let (revision, _) = watch::channel(0);
        DataStore {
            backend,
            model,
            inner: RwLock::new(Inner {
                snapshot: Snapshot::default(),
                stats: None,
                phase: LoadPhase::Uninitialized,
                refreshes_in_flight: 0,
            }),
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn model(&self) -> &Arc<ResolvedModel> {
        &self.model
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn phase(&self) -> LoadPhase {
        self.read().phase
    }

    /// Receiver of the store revision; it advances only on an actual change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.read().snapshot.clone()
    }

    /// Current records of `name` (accepts "busLines" as well as "bus_lines").
    pub fn collection(&self, name: &str) -> Arc<Vec<Record>> {
        self.read()
            .snapshot
            .collection(&case::entity_name(name))
            .unwrap_or_default()
    }

    pub fn dashboard_stats(&self) -> Option<DashboardStats> {
        self.read().stats.clone()
    }

    /// First load. Does nothing once the store has left `Uninitialized`.
    pub async fn mount(&self) {
        if self.phase() == LoadPhase::Uninitialized {
            self.refresh_all().await;
        }
    }

    /// Fetch every collection concurrently, then enrich all of them in dependency order
    /// in one pass. Failed fetches keep their previous value and never abort the cycle.
    ///
    /// Only the first load passes through `Loading`; later refreshes keep serving the
    /// current snapshots as `Ready`. Dropping the future before it completes leaves the
    /// phase as it was before the call.
    pub async fn refresh_all(&self) {
        let guard = RefreshGuard::enter(self);

        let fetches = self.model.entities.iter().map(|e| self.fetch_rows(e));
        let results: Vec<Option<Vec<Record>>> = join_all(fetches).await;
        let failed = results.iter().filter(|r| r.is_none()).count();

        let changed = {
            let mut inner = self.write();
            let keep = self.backend.embeds_relations();
            let mut changed = false;
            for (entity, rows) in self.model.entities.iter().zip(results) {
                match rows {
                    Some(rows) => {
                        let enriched = enrich::enrich(entity, &rows, &inner.snapshot, keep);
                        changed |= inner.snapshot.insert(&entity.name, enriched);
                    }
                    None => {
                        // Keep the old rows but point them at the freshly fetched targets.
                        if let Some(current) = inner.snapshot.collection(&entity.name) {
                            let enriched = enrich::enrich(entity, &current, &inner.snapshot, keep);
                            changed |= inner.snapshot.insert(&entity.name, enriched);
                        }
                    }
                }
            }
            changed |= self.recompute_stats(&mut inner);
            if inner.phase != LoadPhase::Ready {
                inner.phase = LoadPhase::Ready;
                changed = true;
            }
            tracing::info!(
                entities = self.model.entities.len(),
                failed,
                changed,
                "refresh finished"
            );
            changed
        };
        drop(guard);
        if changed {
            self.bump();
        }
    }

    /// Refetch one collection by logical name. Unknown names are ignored.
    /// `"dashboard"` recomputes the summary; fetching tickets also refreshes it.
    pub async fn fetch_entity(&self, name: &str) {
        let name = case::entity_name(name);
        if name == DASHBOARD {
            self.refresh_dashboard();
            return;
        }
        let Some(entity) = self.model.entity(&name) else {
            tracing::debug!(entity = %name, "fetch for unknown entity ignored");
            return;
        };
        if let Some(rows) = self.fetch_rows(entity).await {
            if self.apply(entity, rows) {
                self.bump();
            }
        }
        if name == TICKETS {
            self.refresh_dashboard();
        }
    }

    /// Recompute the summary from the current snapshots (the date may have rolled over).
    pub fn refresh_dashboard(&self) {
        let changed = {
            let mut inner = self.write();
            self.recompute_stats(&mut inner)
        };
        if changed {
            self.bump();
        }
    }

    /// Re-run enrichment over every loaded collection in dependency order.
    /// Returns whether anything changed; a second call on stable data returns false.
    pub fn reenrich(&self) -> bool {
        let changed = {
            let mut inner = self.write();
            let keep = self.backend.embeds_relations();
            let mut changed = false;
            for entity in &self.model.entities {
                if let Some(current) = inner.snapshot.collection(&entity.name) {
                    let enriched = enrich::enrich(entity, &current, &inner.snapshot, keep);
                    changed |= inner.snapshot.insert(&entity.name, enriched);
                }
            }
            changed
        };
        if changed {
            self.bump();
        }
        changed
    }

    /// Select, normalize and order one collection. `None` on any failure (already logged).
    async fn fetch_rows(&self, entity: &ResolvedEntity) -> Option<Vec<Record>> {
        let envelope = self.backend.select(&entity.table, None).await;
        match envelope.into_result() {
            Ok(Some(rows)) => {
                let mut records = case::normalize_rows(entity, rows);
                enrich::sort_records(entity, &mut records);
                tracing::debug!(entity = %entity.name, count = records.len(), "fetched");
                Some(records)
            }
            Ok(None) => {
                tracing::warn!(entity = %entity.name, "fetch returned no data; keeping previous rows");
                None
            }
            Err(e) => {
                tracing::warn!(entity = %entity.name, error = %e, "fetch failed; keeping previous rows");
                None
            }
        }
    }

    /// Commit a fetched collection, then re-enrich everything that embeds it.
    /// Only structurally different collections are written.
    fn apply(&self, entity: &ResolvedEntity, rows: Vec<Record>) -> bool {
        let mut inner = self.write();
        let keep = self.backend.embeds_relations();
        let enriched = enrich::enrich(entity, &rows, &inner.snapshot, keep);
        let mut changed = inner.snapshot.insert(&entity.name, enriched);
        if changed {
            for dependent in self.model.transitive_dependents(&entity.name) {
                if let Some(current) = inner.snapshot.collection(&dependent.name) {
                    let next = enrich::enrich(dependent, &current, &inner.snapshot, keep);
                    if inner.snapshot.insert(&dependent.name, next) {
                        tracing::debug!(entity = %dependent.name, source = %entity.name, "re-enriched");
                    }
                }
            }
        }
        changed |= self.recompute_stats(&mut inner);
        changed
    }

    fn recompute_stats(&self, inner: &mut Inner) -> bool {
        let stats = DashboardStats::compute(&inner.snapshot, today());
        if inner.stats.as_ref() == Some(&stats) {
            return false;
        }
        inner.stats = Some(stats);
        true
    }

    fn entity_for(&self, name: &str) -> Result<&ResolvedEntity, StoreError> {
        let name = case::entity_name(name);
        self.model
            .entity(&name)
            .ok_or(StoreError::UnknownEntity(name))
    }

    fn payload(entity: &ResolvedEntity, value: Value) -> Result<serde_json::Map<String, Value>, StoreError> {
        match case::payload_for(entity, value) {
            Some(Value::Object(map)) => Ok(map),
            _ => Err(StoreError::Validation("payload must be a JSON object".into())),
        }
    }

    fn mutation_result(entity: &ResolvedEntity, op: &str, result: Result<Option<Value>, String>) -> Result<Option<Record>, StoreError> {
        match result {
            Ok(data) => Ok(data.and_then(|v| case::normalize_record(entity, v))),
            Err(e) => {
                tracing::warn!(entity = %entity.name, op, error = %e, "mutation failed");
                Err(StoreError::Backend(e))
            }
        }
    }

    /// Create a record, then refetch its collection. Errors carry the message to show the user.
    pub async fn create(&self, name: &str, payload: Value) -> Result<Option<Record>, StoreError> {
        let entity = self.entity_for(name)?;
        let body = Self::payload(entity, payload)?;
        RequestValidator::validate(&body, &entity.validation)?;
        let result = self.backend.insert(&entity.table, &Value::Object(body)).await.into_result();
        let created = Self::mutation_result(entity, "create", result)?;
        self.fetch_entity(&entity.name).await;
        Ok(created)
    }

    /// Update the given fields of one record, then refetch its collection.
    pub async fn update(&self, name: &str, id: &RecordId, patch: Value) -> Result<Option<Record>, StoreError> {
        let entity = self.entity_for(name)?;
        let mut body = Self::payload(entity, patch)?;
        body.remove("id");
        RequestValidator::validate_partial(&body, &entity.validation)?;
        let result = self
            .backend
            .update(&entity.table, id, &Value::Object(body))
            .await
            .into_result();
        let updated = Self::mutation_result(entity, "update", result)?;
        self.fetch_entity(&entity.name).await;
        Ok(updated)
    }

    /// Delete one record, then refetch the now-shorter collection.
    pub async fn delete(&self, name: &str, id: &RecordId) -> Result<(), StoreError> {
        let entity = self.entity_for(name)?;
        let result = self.backend.delete(&entity.table, id).await.into_result();
        Self::mutation_result(entity, "delete", result)?;
        self.fetch_entity(&entity.name).await;
        Ok(())
    }
}

/// Counts a running `refresh_all`. A first load abandoned mid-flight falls back to
/// `Uninitialized` once no other refresh is running, so `mount` will try again.
struct RefreshGuard<'a> {
    store: &'a DataStore,
}

impl<'a> RefreshGuard<'a> {
    fn enter(store: &'a DataStore) -> Self {
        let entered_loading = {
            let mut inner = store.write();
            inner.refreshes_in_flight += 1;
            if inner.phase == LoadPhase::Uninitialized {
                inner.phase = LoadPhase::Loading;
                tracing::info!("store loading");
                true
            } else {
                false
            }
        };
        if entered_loading {
            store.bump();
        }
        RefreshGuard { store }
    }
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        let abandoned = {
            let mut inner = self.store.write();
            inner.refreshes_in_flight = inner.refreshes_in_flight.saturating_sub(1);
            if inner.refreshes_in_flight == 0 && inner.phase == LoadPhase::Loading {
                inner.phase = LoadPhase::Uninitialized;
                true
            } else {
                false
            }
        };
        if abandoned {
            tracing::warn!("first load abandoned before completion");
            self.store.bump();
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
