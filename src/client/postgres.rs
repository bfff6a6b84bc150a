//! Managed binding: talks to PostgreSQL directly and lets the database do joins and ordering.

use super::{Backend, Filter};
use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::ClientError;
use crate::record::RecordId;
use crate::response::{Envelope, HealthStatus};
use crate::sql::{self, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;

pub struct PgBackend {
    pool: PgPool,
    model: Arc<ResolvedModel>,
    schema: String,
}

impl PgBackend {
    pub fn new(pool: PgPool, model: Arc<ResolvedModel>, schema: impl Into<String>) -> Self {
        Self {
            pool,
            model,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn entity(&self, table: &str) -> Result<&ResolvedEntity, ClientError> {
        self.model
            .entity_by_table(table)
            .ok_or_else(|| ClientError::Backend(format!("unknown table: {}", table)))
    }

    fn object<'a>(value: &'a Value) -> Result<&'a serde_json::Map<String, Value>, ClientError> {
        value
            .as_object()
            .ok_or_else(|| ClientError::Backend("record must be a JSON object".into()))
    }

    async fn query_many(&self, q: &QueryBuf) -> Result<Vec<Value>, ClientError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn query_one(&self, q: &QueryBuf) -> Result<Option<Value>, ClientError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, Value>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_optional(&self.pool).await?)
    }

    fn one_or_not_found(row: Result<Option<Value>, ClientError>, id: &RecordId) -> Envelope<Value> {
        match row {
            Ok(Some(v)) => Envelope::ok(v),
            Ok(None) => Envelope::err(format!("Not found: {}", id)),
            Err(e) => Envelope::err(e.to_string()),
        }
    }
}

#[async_trait]
impl Backend for PgBackend {
    fn binding(&self) -> &'static str {
        "postgres"
    }

    fn embeds_relations(&self) -> bool {
        true
    }

    async fn select(&self, table: &str, filter: Option<&Filter>) -> Envelope<Vec<Value>> {
        let result = async {
            let entity = self.entity(table)?;
            let filter = filter.map(|f| (f.column.as_str(), &f.value));
            let q = sql::select_list_with_includes(&self.model, entity, filter, &self.schema);
            self.query_many(&q).await
        }
        .await;
        match result {
            Ok(rows) => Envelope::ok(rows),
            Err(e) => {
                tracing::warn!(table = %table, error = %e, "select failed");
                Envelope::err(e.to_string())
            }
        }
    }

    async fn insert(&self, table: &str, record: &Value) -> Envelope<Value> {
        let result = async {
            let entity = self.entity(table)?;
            let q = sql::insert(entity, Self::object(record)?, &self.schema);
            self.query_one(&q).await
        }
        .await;
        match result {
            Ok(Some(row)) => Envelope::ok(row),
            Ok(None) => Envelope::err("insert returned no row"),
            Err(e) => Envelope::err(e.to_string()),
        }
    }

    async fn update(&self, table: &str, id: &RecordId, patch: &Value) -> Envelope<Value> {
        let result = async {
            let entity = self.entity(table)?;
            let q = sql::update(entity, &Value::String(id.to_string()), Self::object(patch)?, &self.schema);
            self.query_one(&q).await
        }
        .await;
        Self::one_or_not_found(result, id)
    }

    async fn delete(&self, table: &str, id: &RecordId) -> Envelope<Value> {
        let result = async {
            let entity = self.entity(table)?;
            let q = sql::delete(entity, &Value::String(id.to_string()), &self.schema);
            self.query_one(&q).await
        }
        .await;
        Self::one_or_not_found(result, id)
    }

    async fn health(&self) -> HealthStatus {
        match sqlx::query("SELECT 1").fetch_optional(&self.pool).await {
            Ok(_) => HealthStatus::healthy(),
            Err(e) => HealthStatus::unhealthy(e.to_string()),
        }
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
