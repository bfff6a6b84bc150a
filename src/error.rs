//! Typed errors for catalog loading, backend calls, and store mutations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate table: {0}")]
    DuplicateTable(String),
    #[error("duplicate relation '{embed}' on {entity}")]
    DuplicateRelation { entity: String, embed: String },
    #[error("dependency cycle between: {0}")]
    Cycle(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Failure of a single backend call. Never escapes the binding: it is folded into an
/// [`Envelope`](crate::response::Envelope) error message.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{0}")]
    Backend(String),
}

/// User-facing mutation failure. `Display` is the message shown in the notification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Backend(String),
}

/// Failure while assembling an [`AppContext`](crate::state::AppContext).
#[derive(Error, Debug)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
}
