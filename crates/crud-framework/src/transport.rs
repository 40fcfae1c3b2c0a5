//! # Transport
//!
//! The HTTP transport is a collaborator: the factory never opens a socket
//! itself. Anything implementing [`Transport`] can be injected through
//! [`FactoryDefaults`](crate::config::FactoryDefaults) or per resource.
//!
//! Implementors only have to provide [`Transport::request`]; the per-method
//! helpers (`get`, `post`, ...) are provided on top of it.

use crate::error::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Whether the request carries a body.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put | Method::Patch)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        })
    }
}

/// A single request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    pub params: Map<String, Value>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            params: Map::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }
}

/// The response of a successful request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub data: Value,
}

impl Response {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

/// The HTTP collaborator.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use crud_framework::transport::{Request, Response, Transport};
/// use crud_framework::TransportError;
/// use serde_json::json;
///
/// struct Offline;
///
/// #[async_trait]
/// impl Transport for Offline {
///     async fn request(&self, request: Request) -> Result<Response, TransportError> {
///         Err(TransportError::Network(format!("offline: {} {}", request.method, request.url)))
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let result = Offline.post("/api/users/", json!({"name": "Alice"}), Default::default()).await;
///     assert!(result.is_err());
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one request.
    async fn request(&self, request: Request) -> Result<Response, TransportError>;

    async fn get(&self, url: &str, params: Map<String, Value>) -> Result<Response, TransportError> {
        self.request(Request::new(Method::Get, url).with_params(params)).await
    }

    async fn post(
        &self,
        url: &str,
        body: Value,
        params: Map<String, Value>,
    ) -> Result<Response, TransportError> {
        self.request(Request::new(Method::Post, url).with_body(body).with_params(params))
            .await
    }

    async fn put(
        &self,
        url: &str,
        body: Value,
        params: Map<String, Value>,
    ) -> Result<Response, TransportError> {
        self.request(Request::new(Method::Put, url).with_body(body).with_params(params))
            .await
    }

    async fn patch(
        &self,
        url: &str,
        body: Value,
        params: Map<String, Value>,
    ) -> Result<Response, TransportError> {
        self.request(Request::new(Method::Patch, url).with_body(body).with_params(params))
            .await
    }

    async fn delete(&self, url: &str, params: Map<String, Value>) -> Result<Response, TransportError> {
        self.request(Request::new(Method::Delete, url).with_params(params)).await
    }
}
