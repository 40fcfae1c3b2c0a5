use super::CatalogEntity;
use serde::{Deserialize, Serialize};

/// An item listed in a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub category_id: u64,
    pub name: String,
    pub price: f64,
}

impl Item {
    /// # Arguments
    /// * `category_id` - Category the item is listed in
    /// * `name` - Display name
    /// * `price` - Unit price
    pub fn new(category_id: u64, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            category_id,
            name: name.into(),
            price,
        }
    }
}

impl CatalogEntity for Item {
    const RESOURCE: &'static str = "items";
}
