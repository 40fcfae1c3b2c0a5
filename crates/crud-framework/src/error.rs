//! # Framework Errors
//!
//! This module defines the error types shared by every part of the factory.
//! They follow the propagation policy of the framework:
//!
//! - [`ConfigError`]: a configuration or wiring mistake. Returned from setup
//!   and from operations that name something that was never configured.
//! - [`TransportError`]: a failed network call. Stored in state under
//!   `actions[verb].error` and never returned as an `Err` from an operation.
//! - [`StateError`]: the state tree does not have the shape a selector or
//!   guard expects (usually a reducer that was never registered).
//! - [`StoreError`]: the store actor is gone.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Errors raised while validating configuration or wiring resources together.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("resource `{0}`: the option `recursive` is only valid when `parent` is set")]
    RecursiveWithoutParent(String),
    #[error("resource `{resource}`: `{verb}` is enabled but no route is configured")]
    MissingRoute { resource: String, verb: String },
    #[error("resource `{0}`: network actions are enabled but no transport was injected")]
    MissingTransport(String),
    #[error("resource `{resource}`: `{name}` is reserved and cannot be used as an included action")]
    ReservedActionName { resource: String, name: String },
    #[error("action type `{0}` is generated twice")]
    DuplicateActionType(String),
    #[error("resource `{0}` is configured twice")]
    DuplicateResource(String),
    #[error("unknown resource `{0}`")]
    UnknownResource(String),
    #[error("resource `{resource}`: `{operation}` is not enabled")]
    OperationDisabled { resource: String, operation: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A failed call to the injected transport.
///
/// This is the value stored in `actions[verb].error`, so it is cloneable and serializable.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TransportError {
    #[error("HTTP {status}: {message}")]
    Status {
        status: u16,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("Unexpected request: {0}")]
    Unexpected(String),
}

impl TransportError {
    /// Convenience constructor for a status error without a body.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        TransportError::Status {
            status,
            message: message.into(),
            data: None,
        }
    }
}

/// The state tree does not look the way the reader expects.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StateError {
    #[error("no state for resource `{0}`: its reducer was not registered with the store")]
    Unregistered(String),
    #[error("resource `{resource}` has no async action `{action}` in its state")]
    UnknownAction { resource: String, action: String },
}

/// Errors that can occur while talking to the store actor.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum StoreError {
    #[error("Store closed")]
    StoreClosed,
    #[error("Store dropped response channel")]
    StoreDropped,
    #[error(transparent)]
    State(#[from] StateError),
}

/// Errors returned by operations. Transport failures are not part of this type.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum OperationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<StateError> for OperationError {
    fn from(e: StateError) -> Self {
        OperationError::Store(StoreError::State(e))
    }
}
