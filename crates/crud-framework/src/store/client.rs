//! # Store Client

use super::message::{Guard, StoreRequest};
use crate::error::StoreError;
use crate::event::Event;
use crate::state::{ResourceTree, StoreState};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

/// Async handle to the [`StoreActor`](super::StoreActor). Cheap to clone.
#[derive(Clone, Debug)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
    snapshots: watch::Receiver<Arc<StoreState>>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>, snapshots: watch::Receiver<Arc<StoreState>>) -> Self {
        Self { sender, snapshots }
    }

    /// Fold `event` into the state. Resolves once it has been applied.
    pub async fn dispatch(&self, event: Event) -> Result<(), StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Dispatch { event, respond_to })
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        response.await.map_err(|_| StoreError::StoreDropped)?
    }

    /// Dispatch `event` only if the guarded action is idle. Returns whether it was dispatched.
    pub async fn begin(&self, guard: Guard, event: Event) -> Result<bool, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Begin {
                guard,
                event,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        response.await.map_err(|_| StoreError::StoreDropped)?
    }

    pub async fn get_state(&self) -> Result<Arc<StoreState>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::GetState { respond_to })
            .await
            .map_err(|_| StoreError::StoreClosed)?;
        response.await.map_err(|_| StoreError::StoreDropped)?
    }

    pub async fn resource_state(&self, name: &str) -> Result<ResourceTree, StoreError> {
        let state = self.get_state().await?;
        Ok(state.resource(name)?.clone())
    }

    /// The latest published snapshot, without a round trip to the actor.
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<StoreState>> {
        self.snapshots.clone()
    }
}
