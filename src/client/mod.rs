//! Backend bindings behind one seam. Every call resolves to an [`Envelope`]; failures are
//! messages in `error`, never panics or `Err` for the caller to unwind.

mod postgres;
mod rest;

pub use postgres::PgBackend;
pub use rest::RestClient;

use crate::config::{BackendKind, ClientConfig, ResolvedModel};
use crate::error::ClientError;
use crate::record::RecordId;
use crate::response::{Envelope, HealthStatus};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Exact-match filter on one column.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub column: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter {
            column: column.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    fn binding(&self) -> &'static str;

    /// True when rows come back with their to-one relations already embedded.
    fn embeds_relations(&self) -> bool {
        false
    }

    /// All rows of `table`, or those matching `filter`.
    async fn select(&self, table: &str, filter: Option<&Filter>) -> Envelope<Vec<Value>>;

    async fn insert(&self, table: &str, record: &Value) -> Envelope<Value>;

    async fn update(&self, table: &str, id: &RecordId, patch: &Value) -> Envelope<Value>;

    async fn delete(&self, table: &str, id: &RecordId) -> Envelope<Value>;

    async fn health(&self) -> HealthStatus;

    /// Release connections held by the binding.
    async fn close(&self) {}
}

/// Build the binding selected by `config.backend`.
pub async fn connect(
    config: &ClientConfig,
    model: Arc<ResolvedModel>,
) -> Result<Arc<dyn Backend>, ClientError> {
    match config.backend {
        BackendKind::Rest => Ok(Arc::new(RestClient::from_config(config)?)),
        BackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ClientError::Backend("DATABASE_URL not set".into()))?;
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .acquire_timeout(config.timeout)
                .connect(url)
                .await?;
            Ok(Arc::new(PgBackend::new(pool, model, config.db_schema.clone())))
        }
    }
}
