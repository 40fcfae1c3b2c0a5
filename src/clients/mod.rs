//! Typed wrappers around [`ResourceHandle`].
//!
//! The framework speaks JSON and reports network failures as an [`Outcome`].
//! [`EntityClient`] converts both ways, so application code works with
//! [`User`](crate::model::User), [`Category`](crate::model::Category) and
//! [`Item`](crate::model::Item) and gets a `Result`.

use crate::error::CatalogError;
use crate::model::{CatalogEntity, Category, Item, User};
use crud_framework::{OperationOptions, Outcome, ParentKey, ResourceHandle};
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, instrument};

/// Client for one catalog resource.
#[derive(Debug, Clone)]
pub struct EntityClient<T> {
    handle: ResourceHandle,
    _entity: PhantomData<fn() -> T>,
}

pub type UserClient = EntityClient<User>;
pub type CategoryClient = EntityClient<Category>;
pub type ItemClient = EntityClient<Item>;

impl<T: CatalogEntity> EntityClient<T> {
    pub fn new(handle: ResourceHandle) -> Self {
        Self {
            handle,
            _entity: PhantomData,
        }
    }

    /// The untyped handle, for operations without a typed wrapper.
    pub fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    #[instrument(skip(self), fields(resource = T::RESOURCE))]
    pub async fn fetch(&self, id: u64) -> Result<T, CatalogError> {
        debug!("Sending request");
        let outcome = self.handle.get(Value::from(id), OperationOptions::new()).await?;
        decode(outcome)
    }

    #[instrument(skip(self), fields(resource = T::RESOURCE))]
    pub async fn fetch_list(&self) -> Result<Vec<T>, CatalogError> {
        debug!("Sending request");
        let outcome = self.handle.get_list(OperationOptions::new()).await?;
        decode(outcome)
    }

    #[instrument(skip(self, entity), fields(resource = T::RESOURCE))]
    pub async fn create(&self, entity: &T) -> Result<T, CatalogError> {
        let payload = entity.to_payload()?;
        debug!(?payload, "Sending request");
        let outcome = self.handle.create(payload, OperationOptions::new()).await?;
        decode(outcome)
    }

    /// Update `entity`. `original` is the stored version, needed when the
    /// entity moves to another parent.
    #[instrument(skip(self, entity, original), fields(resource = T::RESOURCE))]
    pub async fn update(&self, entity: &T, original: Option<&T>) -> Result<T, CatalogError> {
        let mut opts = OperationOptions::new();
        if let Some(original) = original {
            opts = opts.original(original.to_payload()?);
        }
        let outcome = self.handle.update(entity.to_payload()?, opts).await?;
        decode(outcome)
    }

    #[instrument(skip(self, entity), fields(resource = T::RESOURCE))]
    pub async fn delete(&self, entity: &T) -> Result<(), CatalogError> {
        let outcome = self.handle.delete(entity.to_payload()?, OperationOptions::new()).await?;
        expect_success(outcome).map(|_| ())
    }

    /// Entities currently in the store, from the latest snapshot.
    pub fn cached(&self, parent: Option<&ParentKey>) -> Result<Vec<T>, CatalogError> {
        let state = self.handle.dispatchers().snapshot();
        let list = state.list(self.handle.name(), parent)?;
        list.into_iter()
            .flat_map(|l| l.values())
            .map(|v| T::from_entity(v).map_err(CatalogError::from))
            .collect()
    }
}

impl ItemClient {
    /// Fetch the items of one category into its bucket.
    #[instrument(skip(self))]
    pub async fn fetch_category(&self, category_id: u64) -> Result<Vec<Item>, CatalogError> {
        let opts = OperationOptions::new().param("categoryId", Value::from(category_id));
        let outcome = self.handle.get_list(opts).await?;
        decode(outcome)
    }

    /// Fetch every item and partition them by category.
    #[instrument(skip(self))]
    pub async fn fetch_all(&self) -> Result<Vec<Item>, CatalogError> {
        let outcome = self.handle.get_all(OperationOptions::new()).await?;
        decode(outcome)
    }

    pub fn in_category(&self, category_id: u64) -> Result<Vec<Item>, CatalogError> {
        self.cached(Some(&ParentKey::from(category_id as i64)))
    }
}

impl UserClient {
    #[instrument(skip(self))]
    pub async fn archive(&self, id: u64) -> Result<User, CatalogError> {
        let input = serde_json::json!({ "id": id });
        let outcome = self
            .handle
            .call_included("archive", input, OperationOptions::new())
            .await?;
        decode(outcome)
    }

    pub async fn select(&self, id: u64) -> Result<(), CatalogError> {
        self.handle.select(Value::from(id), None).await?;
        Ok(())
    }
}

fn expect_success(outcome: Outcome) -> Result<Value, CatalogError> {
    match outcome {
        Outcome::Succeeded(data) => Ok(data),
        Outcome::Dispatched => Ok(Value::Null),
        Outcome::Skipped => Err(CatalogError::InFlight),
        Outcome::Failed(e) => Err(CatalogError::Request(e)),
    }
}

fn decode<D: serde::de::DeserializeOwned>(outcome: Outcome) -> Result<D, CatalogError> {
    let data = expect_success(outcome)?;
    Ok(D::deserialize(data)?)
}
