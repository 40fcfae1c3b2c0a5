//! Typed views of the catalog's entities.
//!
//! The framework stores entities as JSON. These structs are the shapes the
//! application reads and writes, converted at the client boundary through
//! [`CatalogEntity`].

pub mod category;
pub mod item;
pub mod user;

pub use category::*;
pub use item::*;
pub use user::*;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// An entity managed by one catalog resource.
pub trait CatalogEntity: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name the resource is registered under.
    const RESOURCE: &'static str;

    fn to_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    fn from_entity(entity: &Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(entity)
    }
}
