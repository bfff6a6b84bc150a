//! busnet-admin: data access for the bus-network administration dashboard.
//!
//! A [`Backend`] binding (REST or PostgreSQL) answers every call with an [`Envelope`];
//! the [`DataStore`] keeps one snapshot per collection, embeds referenced records,
//! and derives [`DashboardStats`].

pub mod case;
pub mod client;
pub mod config;
pub mod error;
pub mod record;
pub mod response;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use client::{connect, Backend, Filter, PgBackend, RestClient};
pub use config::{default_catalog, resolve, BackendKind, ClientConfig, FullConfig, ResolvedEntity, ResolvedModel};
pub use error::{ClientError, ConfigError, InitError, StoreError};
pub use record::{Record, RecordId};
pub use response::{Envelope, HealthStatus};
pub use state::AppContext;
pub use store::{DashboardStats, DataStore, LoadPhase, Snapshot};
