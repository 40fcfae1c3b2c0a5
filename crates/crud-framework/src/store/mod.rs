//! # Store
//!
//! The host state-management runtime: a single actor owns the [`StoreState`]
//! and is its only writer. Operations and sync verbs talk to it through a
//! cloneable [`StoreClient`]; every change is published on a `watch` channel
//! so UI bindings can re-render.
//!
//! [`StoreState`]: crate::state::StoreState

mod actor;
mod client;
mod message;

pub use actor::StoreActor;
pub use client::StoreClient;
pub use message::{Guard, StoreRequest};
