//! Resource configuration of the catalog.
//!
//! Three resources share one transport:
//!
//! - `users`: flat, single selection, an `archive` action and a `filter` slice
//! - `categories`: recursive, nested under their parent category
//! - `items`: nested under their category; creating or deleting one refreshes
//!   the category's `itemCount`

use crate::model::{CatalogEntity, Category, Item, User};
use crud_framework::{
    callback, Actions, ConfigError, CrudFactory, Dispatchers, FactoryDefaults, IncludeAction,
    Method, OperationOptions, ResourceConfig, Route, VerbConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub fn users() -> ResourceConfig {
    let archive = IncludeAction::new(Route::dynamic(|user, _| {
        format!("/api/users/{}/archive/", user.get("id").unwrap_or(&Value::Null))
    }))
    .method(Method::Post)
    .on_response(callback(|user: Value, dispatchers: Dispatchers| async move {
        match dispatchers.resource(User::RESOURCE) {
            Ok(users) => {
                if let Err(e) = users.set(user).await {
                    warn!(error = %e, "Could not store archived user");
                }
            }
            Err(e) => warn!(error = %e, "Users resource missing"),
        }
    }));

    ResourceConfig::new("/api/users/")
        .actions(
            Actions::default()
                .get(true)
                .get_list(true)
                .create(true)
                .update(true)
                .delete(true)
                .single_select(),
        )
        .include_action("archive", archive)
        .state("filter", json!(""))
}

pub fn categories() -> ResourceConfig {
    ResourceConfig::new("/api/categories/")
        .parent("parentId")
        .recursive(true)
        .parse_parent_to_int(true)
        .actions(Actions::default().multiple_select())
}

pub fn items() -> ResourceConfig {
    ResourceConfig::new("/api/items/")
        .parent("categoryId")
        .parse_parent_to_int(true)
        .actions(
            Actions::all(true)
                .create(VerbConfig::enabled().callback(callback(refresh_category)))
                .delete(VerbConfig::enabled().callback(callback(refresh_category))),
        )
        .state("sortBy", json!("name"))
}

/// Re-read the category of `item` so its `itemCount` follows.
async fn refresh_category(item: Value, dispatchers: Dispatchers) {
    let Some(category_id) = item.get("categoryId").cloned().filter(|v| !v.is_null()) else {
        return;
    };
    match dispatchers.resource(Category::RESOURCE) {
        Ok(categories) => {
            if let Err(e) = categories.get(category_id, OperationOptions::new()).await {
                warn!(error = %e, "Category refresh failed");
            }
        }
        Err(e) => warn!(error = %e, "Categories resource missing"),
    }
}

/// The catalog's factory over `transport`.
pub fn factory(transport: Arc<dyn crud_framework::Transport>) -> CrudFactory {
    CrudFactory::builder(FactoryDefaults::new(transport).parse_id_to_int(true))
        .resource(User::RESOURCE, users())
        .resource(Category::RESOURCE, categories())
        .resource(Item::RESOURCE, items())
}

/// Validate the catalog configuration without starting anything.
pub fn validate(transport: Arc<dyn crud_framework::Transport>) -> Result<(), ConfigError> {
    factory(transport).into_parts().map(|_| ())
}
