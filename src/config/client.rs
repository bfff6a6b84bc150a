//! Runtime settings read from the environment (`.env` honoured by the caller via dotenvy).

use crate::error::ConfigError;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Which backend binding the store is wired to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Generic REST API returning `{ data, error }`.
    Rest,
    /// Managed PostgreSQL: joins and ordering done by the database.
    Postgres,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rest" | "http" => Ok(BackendKind::Rest),
            "postgres" | "postgresql" | "pg" => Ok(BackendKind::Postgres),
            _ => Err(ConfigError::Validation(format!(
                "invalid backend: {} (expected rest or postgres)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub backend: BackendKind,
    /// Base path prefix of the REST API, without trailing slash.
    pub api_url: String,
    pub timeout: Duration,
    pub database_url: Option<String>,
    /// PostgreSQL schema holding the entity tables.
    pub db_schema: String,
    /// Optional catalog override file.
    pub catalog_path: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            backend: BackendKind::Rest,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            database_url: None,
            db_schema: "public".to_string(),
            catalog_path: None,
        }
    }
}

impl ClientConfig {
    /// Read `BUSNET_*` variables and `DATABASE_URL` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::default();
        if let Some(kind) = lookup("BUSNET_BACKEND") {
            config.backend = kind.parse()?;
        }
        if let Some(url) = lookup("BUSNET_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("BUSNET_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ConfigError::Validation(format!("BUSNET_HTTP_TIMEOUT_SECS must be an integer, got {}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        config.database_url = lookup("DATABASE_URL");
        if let Some(schema) = lookup("BUSNET_DB_SCHEMA") {
            config.db_schema = schema;
        }
        config.catalog_path = lookup("BUSNET_CATALOG");

        if config.backend == BackendKind::Postgres && config.database_url.is_none() {
            return Err(ConfigError::Validation(
                "DATABASE_URL is required for the postgres backend".into(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_env_is_empty() {
        let config = ClientConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config.backend, BackendKind::Rest);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let config =
            ClientConfig::from_lookup(lookup(&[("BUSNET_API_URL", "http://api.local/v1/")])).expect("config");
        assert_eq!(config.api_url, "http://api.local/v1");
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = ClientConfig::from_lookup(lookup(&[("BUSNET_BACKEND", "postgres")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        assert!(ClientConfig::from_lookup(lookup(&[("BUSNET_HTTP_TIMEOUT_SECS", "soon")])).is_err());
    }
}
