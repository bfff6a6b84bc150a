//! Process-wide context: configuration, resolved catalog, the backend binding and the store.
//! Built once at startup and shared by reference.

use crate::client::{self, Backend};
use crate::config::{default_catalog, load_from_file, resolve, ClientConfig, ResolvedModel};
use crate::error::InitError;
use crate::store::DataStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppContext {
    pub config: ClientConfig,
    pub model: Arc<ResolvedModel>,
    pub backend: Arc<dyn Backend>,
    pub store: Arc<DataStore>,
}

impl AppContext {
    pub async fn from_env() -> Result<Self, InitError> {
        Self::build(ClientConfig::from_env()?).await
    }

    /// Resolve the catalog (`catalog_path` overrides the built-in one) and connect the backend.
    pub async fn build(config: ClientConfig) -> Result<Self, InitError> {
        let catalog = match &config.catalog_path {
            Some(path) => {
                tracing::info!(path = %path, "loading catalog override");
                load_from_file(path)?
            }
            None => default_catalog(),
        };
        let model = Arc::new(resolve(&catalog)?);
        let backend = client::connect(&config, model.clone()).await?;
        tracing::info!(
            binding = backend.binding(),
            entities = model.entities.len(),
            "backend connected"
        );
        Ok(Self::with_backend(config, model, backend))
    }

    /// Assemble around an already-built backend.
    pub fn with_backend(config: ClientConfig, model: Arc<ResolvedModel>, backend: Arc<dyn Backend>) -> Self {
        let store = Arc::new(DataStore::new(backend.clone(), model.clone()));
        AppContext {
            config,
            model,
            backend,
            store,
        }
    }

    /// Tear down: close backend connections. Snapshots go with the last reference to the store.
    pub async fn shutdown(self) {
        tracing::info!(binding = self.backend.binding(), revision = self.store.revision(), "shutting down");
        self.backend.close().await;
    }
}
