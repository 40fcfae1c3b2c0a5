//! Starting and stopping the catalog.

use crate::catalog;
use crate::clients::{CategoryClient, ItemClient, UserClient};
use crate::error::CatalogError;
use crud_framework::{Dispatchers, ResourceHook, Transport};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The running catalog: one store actor and a typed client per resource.
///
/// `CatalogSystem` is responsible for:
/// - **Wiring**: building every resource from [`catalog`] over one transport
/// - **Lifecycle**: spawning the store actor and stopping it on [`shutdown`](Self::shutdown)
///
/// # Example
///
/// ```ignore
/// let api = InMemoryApi::new();
/// let system = CatalogSystem::new(api.shared())?;
///
/// let pens = system.categories.create(&Category::new("Pens")).await?;
/// system.items.create(&Item::new(pens.id.unwrap(), "Fountain pen", 25.0)).await?;
///
/// system.shutdown().await?;
/// ```
pub struct CatalogSystem {
    pub users: UserClient,
    pub categories: CategoryClient,
    pub items: ItemClient,

    /// Every resource's operations, for callers needing the untyped API.
    pub dispatchers: Dispatchers,

    store: JoinHandle<()>,
}

impl CatalogSystem {
    /// Builds the catalog over `transport` and starts the store.
    ///
    /// Fails if any resource configuration is invalid.
    pub fn new(transport: Arc<dyn Transport>) -> Result<Self, CatalogError> {
        let (store, dispatchers) = catalog::factory(transport).build()?;
        let store = tokio::spawn(store.run());

        let system = Self {
            users: UserClient::new(dispatchers.resource("users")?),
            categories: CategoryClient::new(dispatchers.resource("categories")?),
            items: ItemClient::new(dispatchers.resource("items")?),
            dispatchers,
            store,
        };
        info!(resources = ?system.dispatchers.names(), "Catalog started");
        Ok(system)
    }

    /// A hook for `resource`, for view code reading props.
    pub fn hook(&self, resource: &str) -> Result<ResourceHook, CatalogError> {
        Ok(ResourceHook::new(self.dispatchers.resource(resource)?))
    }

    /// Gracefully shuts down the store.
    ///
    /// Dropping every client closes the store's channel; the actor then drains
    /// its queue and exits. Handles cloned out of the system keep it alive.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down catalog...");
        drop(self.users);
        drop(self.categories);
        drop(self.items);
        drop(self.dispatchers);

        if let Err(e) = self.store.await {
            error!("Store task failed: {:?}", e);
            return Err(format!("Store task failed: {:?}", e));
        }

        info!("Catalog shutdown complete.");
        Ok(())
    }
}
