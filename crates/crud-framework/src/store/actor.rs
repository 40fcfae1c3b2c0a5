//! # Store Actor
//!
//! Owns the state tree and applies events sequentially. Snapshots are shared
//! as `Arc<StoreState>` and copied on write, so a reader holding an old
//! snapshot never observes a later change.

use super::client::StoreClient;
use super::message::StoreRequest;
use crate::event::Event;
use crate::reducer::ResourceReducer;
use crate::state::StoreState;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// The server half of the store.
///
/// **Concurrency Model**:
/// The actor processes its messages one at a time, so the state needs no lock
/// and reducers stay plain functions of `(previous state, event)`.
///
/// ```rust
/// use crud_framework::store::StoreActor;
///
/// #[tokio::main]
/// async fn main() {
///     let (actor, client) = StoreActor::new(16, Vec::new());
///     tokio::spawn(actor.run());
///
///     let state = client.get_state().await.unwrap();
///     assert!(state.resources.is_empty());
/// }
/// ```
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    reducers: Vec<ResourceReducer>,
    state: Arc<StoreState>,
    publisher: watch::Sender<Arc<StoreState>>,
}

impl StoreActor {
    /// Creates the actor and its client. Every reducer contributes its initial state.
    ///
    /// # Arguments
    ///
    /// * `buffer_size` - The capacity of the MPSC channel.
    /// * `reducers` - One reducer per registered resource.
    pub fn new(buffer_size: usize, reducers: Vec<ResourceReducer>) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let mut state = StoreState::default();
        for reducer in &reducers {
            state
                .resources
                .insert(reducer.name().to_owned(), reducer.initial());
        }
        let state = Arc::new(state);
        let (publisher, snapshots) = watch::channel(state.clone());

        let actor = Self {
            receiver,
            reducers,
            state,
            publisher,
        };
        (actor, StoreClient::new(sender, snapshots))
    }

    /// Runs the event loop until every client is dropped.
    pub async fn run(mut self) {
        let resources: Vec<&str> = self.reducers.iter().map(|r| r.name()).collect();
        info!(?resources, "Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Dispatch { event, respond_to } => {
                    self.apply(&event);
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Begin {
                    guard,
                    event,
                    respond_to,
                } => {
                    let result = self
                        .state
                        .is_loading(&guard.resource, &guard.action, guard.parent.as_ref());
                    match result {
                        Ok(true) => {
                            debug!(
                                resource = %guard.resource,
                                action = %guard.action,
                                parent = ?guard.parent,
                                "Already loading, skipped"
                            );
                            let _ = respond_to.send(Ok(false));
                        }
                        Ok(false) => {
                            self.apply(&event);
                            let _ = respond_to.send(Ok(true));
                        }
                        Err(e) => {
                            warn!(resource = %guard.resource, error = %e, "Guard failed");
                            let _ = respond_to.send(Err(e.into()));
                        }
                    }
                }
                StoreRequest::GetState { respond_to } => {
                    let _ = respond_to.send(Ok(self.state.clone()));
                }
            }
        }

        info!(resources = self.state.resources.len(), "Store shutdown");
    }

    fn apply(&mut self, event: &Event) {
        let mut changed = Vec::new();
        for reducer in &self.reducers {
            let next = reducer.reduce_tree(self.state.resources.get(reducer.name()), event);
            if let Some(next) = next {
                Arc::make_mut(&mut self.state)
                    .resources
                    .insert(reducer.name().to_owned(), next);
                changed.push(reducer.name());
            }
        }
        debug!(
            action_type = %event.action_type,
            parent = ?event.parent,
            ?changed,
            "Dispatch"
        );
        if !changed.is_empty() {
            self.publisher.send_replace(self.state.clone());
        }
    }
}
