//! # Mock Transport & Testing Guide
//!
//! `MockTransport` implements [`Transport`] entirely in memory. Tests queue
//! expectations (method + URL + canned response) and the mock answers requests
//! in order, so every network-backed operation can be exercised without a
//! server.
//!
//! ## When to use the mock vs a fake backend
//!
//! | Feature | MockTransport | In-memory backend |
//! |---------|---------------|-------------------|
//! | **Determinism** | Exact request order is asserted | Behaves like a server |
//! | **Error injection** | Easy (`return_err`) | Hard |
//! | **Timing control** | `respond_later` resolves when the test says so | Immediate |
//! | **Use case** | Operation contracts, guards, error paths | Demos and full flows |
//!
//! ## Testing Strategies
//!
//! <details>
//! <summary><b>Pattern 1: Canned responses</b></summary>
//!
//! ```rust
//! use crud_framework::mock::MockTransport;
//! use crud_framework::transport::Transport;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect_get("/api/items/").return_ok(json!([{"id": 1}]));
//!
//!     let response = mock.get("/api/items/", Default::default()).await.unwrap();
//!     assert_eq!(response.data, json!([{"id": 1}]));
//!     mock.verify();
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Controlling when a request resolves</b></summary>
//!
//! `respond_later` hands back the sending half of a oneshot channel. The
//! request stays in flight until the test sends the response, which is how the
//! duplicate-call guard is tested.
//!
//! ```rust
//! use crud_framework::mock::MockTransport;
//! use crud_framework::transport::Transport;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     let reply = mock.expect_get("/api/items/").respond_later();
//!
//!     let transport = mock.clone();
//!     let call = tokio::spawn(async move { transport.get("/api/items/", Default::default()).await });
//!
//!     reply.send(Ok(json!([]))).unwrap();
//!     assert_eq!(call.await.unwrap().unwrap().data, json!([]));
//! }
//! ```
//! </details>
//!
//! ## Testing Failure Scenarios
//!
//! ```rust
//! use crud_framework::mock::MockTransport;
//! use crud_framework::transport::Transport;
//! use crud_framework::TransportError;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockTransport::new();
//!     mock.expect_post("/api/items/").return_err(TransportError::status(400, "name is required"));
//!
//!     let result = mock.post("/api/items/", json!({}), Default::default()).await;
//!     assert!(matches!(result, Err(TransportError::Status { status: 400, .. })));
//! }
//! ```

use crate::error::TransportError;
use crate::transport::{Method, Request, Response, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

type Reply = Result<Value, TransportError>;

enum Canned {
    Ready(Reply),
    Later(oneshot::Receiver<Reply>),
}

struct Expectation {
    method: Method,
    url: String,
    response: Canned,
}

/// An expectation-queue transport for tests.
#[derive(Clone, Default)]
pub struct MockTransport {
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
    calls: Arc<Mutex<Vec<Request>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// This mock as a shareable transport.
    pub fn shared(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    /// Expects a request with `method` to `url`.
    pub fn expect(&self, method: Method, url: impl Into<String>) -> ExpectationBuilder {
        ExpectationBuilder {
            method,
            url: url.into(),
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_get(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Get, url)
    }

    pub fn expect_post(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Post, url)
    }

    pub fn expect_put(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Put, url)
    }

    pub fn expect_patch(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Patch, url)
    }

    pub fn expect_delete(&self, url: impl Into<String>) -> ExpectationBuilder {
        self.expect(Method::Delete, url)
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap_or_else(PoisonError::into_inner);
        if !exps.is_empty() {
            let pending: Vec<String> = exps.iter().map(|e| format!("{} {}", e.method, e.url)).collect();
            panic!("Not all expectations were met. {} remaining: {:?}", exps.len(), pending);
        }
    }
}

/// Builder returned by [`MockTransport::expect`].
pub struct ExpectationBuilder {
    method: Method,
    url: String,
    expectations: Arc<Mutex<VecDeque<Expectation>>>,
}

impl ExpectationBuilder {
    fn push(self, response: Canned) {
        let mut exps = self.expectations.lock().unwrap_or_else(PoisonError::into_inner);
        exps.push_back(Expectation {
            method: self.method,
            url: self.url,
            response,
        });
    }

    /// Respond with `data`.
    pub fn return_ok(self, data: Value) {
        self.push(Canned::Ready(Ok(data)));
    }

    /// Fail with `error`.
    pub fn return_err(self, error: TransportError) {
        self.push(Canned::Ready(Err(error)));
    }

    /// Keep the request in flight until the returned sender is used.
    pub fn respond_later(self) -> oneshot::Sender<Reply> {
        let (sender, receiver) = oneshot::channel();
        self.push(Canned::Later(receiver));
        sender
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(&self, request: Request) -> Result<Response, TransportError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        let expectation = self
            .expectations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        let Some(expectation) = expectation else {
            return Err(TransportError::Unexpected(format!(
                "{} {} (no expectation left)",
                request.method, request.url
            )));
        };
        if expectation.method != request.method || expectation.url != request.url {
            return Err(TransportError::Unexpected(format!(
                "expected {} {}, got {} {}",
                expectation.method, expectation.url, request.method, request.url
            )));
        }

        let reply = match expectation.response {
            Canned::Ready(reply) => reply,
            Canned::Later(receiver) => receiver
                .await
                .unwrap_or_else(|_| Err(TransportError::Network("response sender dropped".into()))),
        };
        reply.map(Response::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_transport_with_expectations() {
        let mock = MockTransport::new();
        mock.expect_get("/api/users/").return_ok(json!([]));
        mock.expect_delete("/api/users/1/").return_err(TransportError::status(404, "not found"));

        let ok = mock.get("/api/users/", Default::default()).await.unwrap();
        assert_eq!(ok.data, json!([]));
        let err = mock.delete("/api/users/1/", Default::default()).await.unwrap_err();
        assert_eq!(err, TransportError::status(404, "not found"));

        assert_eq!(mock.call_count(), 2);
        mock.verify();
    }

    #[tokio::test]
    async fn test_mismatch_is_reported() {
        let mock = MockTransport::new();
        mock.expect_get("/api/users/").return_ok(json!([]));

        let result = mock.post("/api/users/", json!({}), Default::default()).await;
        assert!(matches!(result, Err(TransportError::Unexpected(_))));
        let unexpected = mock.get("/api/users/", Default::default()).await;
        assert!(matches!(unexpected, Err(TransportError::Unexpected(_))));
    }

    #[tokio::test]
    #[should_panic(expected = "Not all expectations were met")]
    async fn test_verify_panics_on_leftovers() {
        let mock = MockTransport::new();
        mock.expect_get("/api/users/").return_ok(json!([]));
        mock.verify();
    }
}
