//! Runtime environment of the application.
//!
//! - [`setup_tracing`] - Initializes the tracing/logging infrastructure
//!
//! The catalog itself is started by [`CatalogSystem`](crate::lifecycle::CatalogSystem).

pub mod tracing;

pub use self::tracing::*;
