//! # Registry
//!
//! Multi-resource composition in two phases.
//!
//! 1. [`CrudFactory::into_parts`] validates every resource config and builds
//!    its action types, reducer and operation definitions. Nothing here needs
//!    a store, so reducers can be mounted before any operation exists.
//! 2. [`FactoryParts::connect`] binds the operation definitions to a
//!    [`StoreClient`] and to each other, producing [`Dispatchers`]. Callbacks
//!    receive the full registry, so any resource can act on any other.
//!
//! [`CrudFactory::build`] does both and also returns the store actor.

use crate::action_types::{ActionType, ActionTypes};
use crate::config::{FactoryDefaults, ResourceConfig};
use crate::error::{ConfigError, StoreError};
use crate::operations::{ResourceHandle, ResourceOperations};
use crate::reducer::ResourceReducer;
use crate::state::{ResourceTree, StoreState};
use crate::store::{StoreActor, StoreClient};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_BUFFER_SIZE: usize = 64;

/// Collects resource configs sharing one set of defaults.
pub struct CrudFactory {
    defaults: FactoryDefaults,
    resources: Vec<(String, ResourceConfig)>,
    buffer_size: usize,
}

impl CrudFactory {
    pub fn builder(defaults: FactoryDefaults) -> Self {
        Self {
            defaults,
            resources: Vec::new(),
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Register a resource. `name` is its plural camelCase name, e.g. `fooCategories`.
    pub fn resource(mut self, name: impl Into<String>, config: ResourceConfig) -> Self {
        self.resources.push((name.into(), config));
        self
    }

    /// Capacity of the store's request channel.
    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Phase one: validate and build reducers and operation definitions.
    pub fn into_parts(self) -> Result<FactoryParts, ConfigError> {
        let mut reducers = Vec::with_capacity(self.resources.len());
        let mut operations = BTreeMap::new();
        let mut owners: HashMap<ActionType, String> = HashMap::new();

        for (name, config) in self.resources {
            if operations.contains_key(&name) {
                return Err(ConfigError::DuplicateResource(name));
            }
            let config = Arc::new(config.validate(&name, &self.defaults)?);
            let types = Arc::new(ActionTypes::new(&config)?);
            for (_, action_type) in types.iter() {
                if let Some(owner) = owners.insert(action_type.clone(), name.clone()) {
                    debug!(%action_type, first = %owner, second = %name, "Action type collision");
                    return Err(ConfigError::DuplicateActionType(action_type.to_string()));
                }
            }
            debug!(resource = %name, action_types = types.len(), "Resource built");
            reducers.push(ResourceReducer::new(config.clone(), types.clone()));
            operations.insert(name, Arc::new(ResourceOperations::new(config, types)));
        }

        Ok(FactoryParts {
            reducers,
            operations,
            buffer_size: self.buffer_size,
        })
    }

    /// Both phases: returns the store actor to spawn and the bound registry.
    pub fn build(self) -> Result<(StoreActor, Dispatchers), ConfigError> {
        let parts = self.into_parts()?;
        let buffer_size = parts.buffer_size;
        let (reducers, operations) = (parts.reducers, parts.operations);
        let (actor, client) = StoreActor::new(buffer_size, reducers);
        let dispatchers = Dispatchers::new(client, operations);
        info!(resources = ?dispatchers.names(), "Factory built");
        Ok((actor, dispatchers))
    }
}

/// Output of phase one.
pub struct FactoryParts {
    pub reducers: Vec<ResourceReducer>,
    operations: BTreeMap<String, Arc<ResourceOperations>>,
    buffer_size: usize,
}

impl FactoryParts {
    pub fn operations(&self) -> impl Iterator<Item = (&str, &ResourceOperations)> {
        self.operations.iter().map(|(name, ops)| (name.as_str(), ops.as_ref()))
    }

    /// Take the reducers out, for a store assembled by hand.
    pub fn take_reducers(&mut self) -> Vec<ResourceReducer> {
        std::mem::take(&mut self.reducers)
    }

    /// Phase two: bind every resource's operations to `store`.
    pub fn connect(self, store: StoreClient) -> Dispatchers {
        Dispatchers::new(store, self.operations)
    }
}

struct Inner {
    store: StoreClient,
    operations: BTreeMap<String, Arc<ResourceOperations>>,
}

/// Every resource's bound operations, keyed by resource name. Cheap to clone.
#[derive(Clone)]
pub struct Dispatchers {
    inner: Arc<Inner>,
}

impl Dispatchers {
    fn new(store: StoreClient, operations: BTreeMap<String, Arc<ResourceOperations>>) -> Self {
        Self {
            inner: Arc::new(Inner { store, operations }),
        }
    }

    pub fn resource(&self, name: &str) -> Result<ResourceHandle, ConfigError> {
        let ops = self
            .inner
            .operations
            .get(name)
            .ok_or_else(|| ConfigError::UnknownResource(name.to_owned()))?;
        Ok(ResourceHandle::new(ops.clone(), self.clone()))
    }

    pub fn store(&self) -> &StoreClient {
        &self.inner.store
    }

    /// Current state, read through the actor.
    pub async fn state(&self) -> Result<Arc<StoreState>, StoreError> {
        self.inner.store.get_state().await
    }

    /// Latest published state without a round trip.
    pub fn snapshot(&self) -> Arc<StoreState> {
        self.inner.store.snapshot()
    }

    pub async fn resource_state(&self, name: &str) -> Result<ResourceTree, StoreError> {
        self.inner.store.resource_state(name).await
    }

    pub fn names(&self) -> Vec<&str> {
        self.inner.operations.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for Dispatchers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatchers")
            .field("resources", &self.names())
            .finish_non_exhaustive()
    }
}
