//! # CRUD Recipe demo
//!
//! Starts the [`CatalogSystem`] over the in-memory backend and walks through
//! the catalog: categories, items nested under them, a user selection and an
//! included action.

use crud_framework::{NameMode, OwnProps, ParentKey};
use crud_recipe::backend::InMemoryApi;
use crud_recipe::lifecycle::CatalogSystem;
use crud_recipe::model::{Category, Item, User};
use crud_recipe::runtime::setup_tracing;
use std::time::Duration;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    info!("Starting catalog demo");

    let api = InMemoryApi::new().with_latency(Duration::from_millis(5));
    let system = CatalogSystem::new(api.shared()).map_err(|e| e.to_string())?;

    let span = tracing::info_span!("catalog_setup");
    let (pens, inks) = async {
        let pens = system.categories.create(&Category::new("Pens")).await?;
        let pens_id = pens.id.unwrap_or_default();
        let inks = system.categories.create(&Category::new("Inks").under(pens_id)).await?;
        Ok::<_, crud_recipe::error::CatalogError>((pens, inks))
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;
    info!(pens = ?pens.id, inks = ?inks.id, "Categories created");

    let pens_id = pens.id.unwrap_or_default();
    let span = tracing::info_span!("item_creation");
    async {
        for (name, price) in [("Fountain pen", 25.0), ("Ballpoint", 2.5)] {
            let item = system.items.create(&Item::new(pens_id, name, price)).await?;
            info!(item_id = ?item.id, name, "Item created");
        }
        Ok::<_, crud_recipe::error::CatalogError>(())
    }
    .instrument(span)
    .await
    .map_err(|e| e.to_string())?;

    let refreshed = system
        .categories
        .cached(Some(&ParentKey::null()))
        .map_err(|e| e.to_string())?;
    for category in &refreshed {
        info!(name = %category.name, item_count = ?category.item_count, "Category");
    }

    match system.items.fetch_all().await {
        Ok(items) => info!(count = items.len(), "All items loaded"),
        Err(e) => error!(error = %e, "Loading items failed"),
    }
    let in_pens = system.items.in_category(pens_id).map_err(|e| e.to_string())?;
    info!(count = in_pens.len(), "Items in Pens");

    let alice = system
        .users
        .create(&User::new("Alice", "alice@example.com"))
        .await
        .map_err(|e| e.to_string())?;
    let alice_id = alice.id.unwrap_or_default();
    system.users.select(alice_id).await.map_err(|e| e.to_string())?;
    match system.users.archive(alice_id).await {
        Ok(user) => info!(user = %user.name, archived = user.archived, "User archived"),
        Err(e) => error!(error = %e, "Archive failed"),
    }

    let hook = system.hook("users").map_err(|e| e.to_string())?;
    let output = hook
        .use_props(OwnProps::new(), NameMode::Full)
        .map_err(|e| e.to_string())?;
    info!(
        selected = ?output.prop("selectedUser"),
        loading = ?output.prop("getUsersListIsLoading"),
        "Users props"
    );

    system.shutdown().await?;

    info!("Demo completed successfully");
    Ok(())
}
