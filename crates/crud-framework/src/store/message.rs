//! Messages between the `StoreClient` and the `StoreActor`.

use crate::error::StoreError;
use crate::event::Event;
use crate::key::ParentKey;
use crate::state::StoreState;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One-shot response channel used by the store.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Identifies the `{ isLoading }` flag an async operation must find idle.
#[derive(Debug, Clone, PartialEq)]
pub struct Guard {
    pub resource: String,
    pub action: String,
    pub parent: Option<ParentKey>,
}

/// Requests processed by the store actor, one at a time.
///
/// - **Dispatch**: fold an event through every reducer.
/// - **Begin**: check a [`Guard`] and, if the action is idle, dispatch its
///   `IsLoading` event. Both happen in the same turn of the actor loop, so two
///   concurrent calls of the same verb can never both start.
/// - **GetState**: read the current snapshot.
#[derive(Debug)]
pub enum StoreRequest {
    Dispatch {
        event: Event,
        respond_to: Response<()>,
    },
    Begin {
        guard: Guard,
        event: Event,
        respond_to: Response<bool>,
    },
    GetState {
        respond_to: Response<Arc<StoreState>>,
    },
}
