use crud_framework::{ConfigError, OperationError, StateError, StoreError, TransportError};
use thiserror::Error;

/// Errors surfaced by the catalog's typed clients.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("State error: {0}")]
    State(#[from] StateError),
    #[error("Request failed: {0}")]
    Request(TransportError),
    #[error("Request skipped: the same action is already in flight")]
    InFlight,
    #[error("Malformed entity: {0}")]
    Decode(#[from] serde_json::Error),
}
