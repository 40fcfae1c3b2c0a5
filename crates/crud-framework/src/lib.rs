//! # CRUD Framework
//!
//! A configuration-driven factory for the client-side state of REST resources.
//! Describe a resource once (its route, which verbs it supports, how its
//! entities are keyed and nested) and the framework generates everything
//! needed to fetch, cache, select and mutate it:
//!
//! - **Action types**: a unique event token per verb and phase ([`ActionTypes`])
//! - **Reducer**: a pure state machine folding events into a normalized
//!   `key → entity` map with per-verb `{ isLoading, error }` ([`ResourceReducer`])
//! - **Operations**: async verbs that call an injected [`Transport`] and
//!   dispatch the outcome, plus sync setters ([`ResourceHandle`])
//! - **Selectors and hooks**: flat props for a view ([`Mapper`], [`ResourceHook`])
//!
//! ## Why an Actor for the Store?
//!
//! The state tree has exactly one writer: a [`StoreActor`] task that owns it and
//! applies events sequentially. Operations talk to it through a cloneable
//! [`StoreClient`]. This gives the duplicate-call guard for free: checking
//! `isLoading` and dispatching the loading event happen in a single turn of
//! the actor, so two concurrent `getList()` calls result in one request.
//!
//! Every applied event publishes a new immutable snapshot over a `watch`
//! channel. Readers never lock; unchanged resources keep their identity.
//!
//! ## Two-Phase Composition
//!
//! A callback of one resource often needs another resource's operations
//! (creating an item refreshes its category). [`CrudFactory`] solves the
//! cycle in two phases:
//!
//! 1. [`CrudFactory::into_parts`] builds each resource's reducer and pure
//!    operation definitions, with no cross-references.
//! 2. [`FactoryParts::connect`] builds the [`Dispatchers`] registry and every
//!    callback receives it.
//!
//! ## Quick Start
//!
//! ```rust
//! use crud_framework::{
//!     Actions, CrudFactory, FactoryDefaults, MockTransport, OperationOptions, ResourceConfig,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect_get("/api/items/").return_ok(json!([{ "id": 1, "name": "a" }]));
//!
//!     let (store, dispatchers) = CrudFactory::builder(FactoryDefaults::new(mock.shared()))
//!         .resource(
//!             "items",
//!             ResourceConfig::new("/api/items/")
//!                 .actions(Actions::default().get_list(true).create(true).delete(true)),
//!         )
//!         .build()
//!         .unwrap();
//!     tokio::spawn(store.run());
//!
//!     let items = dispatchers.resource("items").unwrap();
//!     items.get_list(OperationOptions::new()).await.unwrap();
//!
//!     let state = dispatchers.state().await.unwrap();
//!     let list = state.list("items", None).unwrap().unwrap();
//!     assert_eq!(list.len(), 1);
//!     mock.verify();
//! }
//! ```
//!
//! ## Nested Resources
//!
//! With `parent` set, a resource keeps one list per parent key. `getAll`
//! fetches everything at once and partitions it; every other event is routed
//! to the bucket named by its parent. A `null` parent is a bucket of its own.
//!
//! ## Errors
//!
//! - Configuration mistakes fail fast at build time ([`ConfigError`]).
//! - Network failures never cross the operation boundary: they land in
//!   `actions[verb].error` and run the error hooks ([`TransportError`]).
//! - Reading state of an unregistered resource is a wiring bug ([`StateError`]).
//!
//! ## Testing
//!
//! [`MockTransport`] queues expected requests and their responses, and can
//! hold a response back until the test releases it. See the [`mock`] module.

pub mod action_types;
pub mod config;
pub mod error;
pub mod event;
pub mod hooks;
pub mod key;
pub mod mock;
pub mod naming;
pub mod operations;
pub mod reducer;
pub mod registry;
pub mod selectors;
pub mod state;
pub mod store;
pub mod transport;

pub use action_types::{ActionType, ActionTypes, AsyncTarget, EventKind, Phase, Verb};
pub use config::{
    callback, error_hook, prepare, Actions, FactoryDefaults, IncludeAction, ResourceConfig, Route,
    RouteContext, SelectMode, ValidatedConfig, VerbConfig,
};
pub use error::{ConfigError, OperationError, StateError, StoreError, TransportError};
pub use event::Event;
pub use hooks::{BoundOperation, HookOutput, ResourceHook};
pub use key::{Key, KeyCodec, ParentKey};
pub use mock::MockTransport;
pub use operations::{OperationKind, OperationOptions, Outcome, ResourceHandle, ResourceOperations};
pub use reducer::ResourceReducer;
pub use registry::{CrudFactory, Dispatchers, FactoryParts};
pub use selectors::{Mapper, NameMode, NameTable, OwnProps, Props};
pub use state::{AsyncState, ResourceState, ResourceTree, StoreState};
pub use store::{StoreActor, StoreClient};
pub use transport::{Method, Request, Response, Transport};
