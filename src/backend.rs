//! An in-memory REST backend.
//!
//! Implements [`Transport`] by routing requests to JSON tables held in memory,
//! so the demo and the tests can exercise the full request path without a
//! network. Routes follow the `/api/{collection}/[{id}/[{action}/]]` shape.

use async_trait::async_trait;
use crud_framework::{Method, Request, Response, Transport, TransportError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

type Table = BTreeMap<u64, Value>;

/// In-memory stand-in for the catalog's HTTP API. Cheap to clone.
#[derive(Clone, Default)]
pub struct InMemoryApi {
    tables: Arc<RwLock<BTreeMap<String, Table>>>,
    next_id: Arc<AtomicU64>,
    latency: Option<Duration>,
}

/// A parsed request path.
#[derive(Debug, PartialEq)]
enum Route<'a> {
    Collection(&'a str),
    Detail(&'a str, u64),
    Action(&'a str, u64, &'a str),
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response, to make in-flight states observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn shared(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    /// Insert entities directly, assigning ids where missing. Returns the stored entities.
    pub async fn seed(&self, collection: &str, entities: Vec<Value>) -> Vec<Value> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection.to_owned()).or_default();
        entities
            .into_iter()
            .filter_map(|entity| match entity {
                Value::Object(fields) => Some(self.store(table, fields)),
                _ => None,
            })
            .collect()
    }

    pub async fn count(&self, collection: &str) -> usize {
        self.tables.read().await.get(collection).map_or(0, BTreeMap::len)
    }

    fn store(&self, table: &mut Table, mut fields: Map<String, Value>) -> Value {
        let id = match fields.get("id").and_then(Value::as_u64) {
            Some(id) => {
                self.next_id.fetch_max(id, Ordering::SeqCst);
                id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
        };
        fields.insert("id".into(), Value::from(id));
        let entity = Value::Object(fields);
        table.insert(id, entity.clone());
        entity
    }

    async fn list(&self, collection: &str, params: &Map<String, Value>) -> Value {
        let tables = self.tables.read().await;
        let entities = tables
            .get(collection)
            .into_iter()
            .flat_map(|t| t.values())
            .filter(|entity| params.iter().all(|(k, v)| loosely_equal(entity.get(k), v)))
            .cloned()
            .collect();
        Value::Array(entities)
    }

    async fn detail(&self, collection: &str, id: u64) -> Result<Value, TransportError> {
        let tables = self.tables.read().await;
        let mut entity = tables
            .get(collection)
            .and_then(|t| t.get(&id))
            .cloned()
            .ok_or_else(|| not_found(collection, id))?;
        if collection == "categories" {
            let count = tables
                .get("items")
                .into_iter()
                .flat_map(|t| t.values())
                .filter(|item| item.get("categoryId").and_then(Value::as_u64) == Some(id))
                .count();
            if let Value::Object(fields) = &mut entity {
                fields.insert("itemCount".into(), Value::from(count));
            }
        }
        Ok(entity)
    }

    async fn create(&self, collection: &str, body: Option<Value>) -> Result<Value, TransportError> {
        let Some(Value::Object(mut fields)) = body else {
            return Err(TransportError::status(400, "body should be an object"));
        };
        fields.remove("id");
        let mut tables = self.tables.write().await;
        let table = tables.entry(collection.to_owned()).or_default();
        Ok(self.store(table, fields))
    }

    async fn modify(&self, collection: &str, id: u64, body: Option<Value>, replace: bool) -> Result<Value, TransportError> {
        let Some(Value::Object(fields)) = body else {
            return Err(TransportError::status(400, "body should be an object"));
        };
        let mut tables = self.tables.write().await;
        let entity = tables
            .get_mut(collection)
            .and_then(|t| t.get_mut(&id))
            .ok_or_else(|| not_found(collection, id))?;
        let mut next = if replace {
            Map::new()
        } else {
            entity.as_object().cloned().unwrap_or_default()
        };
        next.extend(fields);
        next.insert("id".into(), Value::from(id));
        *entity = Value::Object(next);
        Ok(entity.clone())
    }

    async fn remove(&self, collection: &str, id: u64) -> Result<Value, TransportError> {
        let mut tables = self.tables.write().await;
        tables
            .get_mut(collection)
            .and_then(|t| t.remove(&id))
            .ok_or_else(|| not_found(collection, id))?;
        Ok(Value::Null)
    }

    async fn act(&self, collection: &str, id: u64, action: &str) -> Result<Value, TransportError> {
        match (collection, action) {
            ("users", "archive") => {
                let mut patch = Map::new();
                patch.insert("archived".into(), Value::Bool(true));
                self.modify(collection, id, Some(Value::Object(patch)), false).await
            }
            _ => Err(TransportError::status(404, format!("no action `{action}` on {collection}"))),
        }
    }
}

#[async_trait]
impl Transport for InMemoryApi {
    #[instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn request(&self, request: Request) -> Result<Response, TransportError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let route = parse(&request.url)?;
        debug!(?route, "Routing");

        let data = match (request.method, route) {
            (Method::Get, Route::Collection(c)) => self.list(c, &request.params).await,
            (Method::Get, Route::Detail(c, id)) => self.detail(c, id).await?,
            (Method::Post, Route::Collection(c)) => self.create(c, request.body).await?,
            (Method::Patch, Route::Detail(c, id)) => self.modify(c, id, request.body, false).await?,
            (Method::Put, Route::Detail(c, id)) => self.modify(c, id, request.body, true).await?,
            (Method::Delete, Route::Detail(c, id)) => self.remove(c, id).await?,
            (Method::Post, Route::Action(c, id, action)) => self.act(c, id, action).await?,
            (method, _) => {
                return Err(TransportError::status(405, format!("{method} not allowed on {}", request.url)))
            }
        };
        Ok(Response::new(data))
    }
}

fn parse(url: &str) -> Result<Route<'_>, TransportError> {
    let segments: Vec<&str> = url.split('/').filter(|s| !s.is_empty()).collect();
    let id = |raw: &str| {
        raw.parse::<u64>()
            .map_err(|_| TransportError::status(404, format!("invalid id `{raw}`")))
    };
    match segments.as_slice() {
        ["api", collection] => Ok(Route::Collection(collection)),
        ["api", collection, raw] => Ok(Route::Detail(collection, id(raw)?)),
        ["api", collection, raw, action] => Ok(Route::Action(collection, id(raw)?, action)),
        _ => Err(TransportError::status(404, format!("no route for {url}"))),
    }
}

fn not_found(collection: &str, id: u64) -> TransportError {
    TransportError::status(404, format!("{collection}/{id} not found"))
}

/// Query parameters arrive as JSON; compare numbers and numeric strings alike.
fn loosely_equal(field: Option<&Value>, param: &Value) -> bool {
    match (field, param) {
        (None, Value::Null) => true,
        (Some(field), param) if field == param => true,
        (Some(field), Value::String(s)) => field.to_string().trim_matches('"') == s,
        (Some(Value::String(s)), param) => param.to_string() == *s,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_routes() {
        assert_eq!(parse("/api/items/").unwrap(), Route::Collection("items"));
        assert_eq!(parse("/api/items/4/").unwrap(), Route::Detail("items", 4));
        assert_eq!(parse("/api/users/2/archive/").unwrap(), Route::Action("users", 2, "archive"));
        assert!(parse("/api/items/abc/").is_err());
        assert!(parse("/other/").is_err());
    }

    #[tokio::test]
    async fn test_crud_round_trip() {
        let api = InMemoryApi::new();
        let created = api
            .post("/api/items/", json!({"categoryId": 1, "name": "pen"}), Map::new())
            .await
            .unwrap()
            .data;
        assert_eq!(created["id"], json!(1));

        let updated = api
            .patch("/api/items/1/", json!({"name": "pencil"}), Map::new())
            .await
            .unwrap()
            .data;
        assert_eq!(updated, json!({"id": 1, "categoryId": 1, "name": "pencil"}));

        let mut params = Map::new();
        params.insert("categoryId".into(), json!("1"));
        let listed = api.get("/api/items/", params).await.unwrap().data;
        assert_eq!(listed.as_array().unwrap().len(), 1);

        api.delete("/api/items/1/", Map::new()).await.unwrap();
        let err = api.get("/api/items/1/", Map::new()).await.unwrap_err();
        assert_eq!(err, TransportError::status(404, "items/1 not found"));
    }

    #[tokio::test]
    async fn test_category_detail_counts_items() {
        let api = InMemoryApi::new();
        api.seed("categories", vec![json!({"id": 10, "name": "Pens"})]).await;
        api.seed("items", vec![json!({"categoryId": 10, "name": "a"}), json!({"categoryId": 10, "name": "b"})])
            .await;

        let category = api.get("/api/categories/10/", Map::new()).await.unwrap().data;
        assert_eq!(category["itemCount"], json!(2));
        assert_eq!(api.count("items").await, 2);
    }
}
