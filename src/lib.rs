#![doc(html_logo_url = "https://www.rust-lang.org/logos/rust-logo-128x128.png")]
#![doc(html_favicon_url = "https://www.rust-lang.org/favicon.ico")]
//! # CRUD Recipe
//!
//! > **A Recipe for configuration-driven REST state in Rust.**
//!
//! This crate demonstrates the [`crud_framework`] on a small catalog of users,
//! categories and items. Each resource is described once in [`catalog`]; the
//! framework generates its action types, reducer, async operations and
//! selectors, all backed by a single store actor.
//!
//! ## 🏗️ Design Philosophy
//!
//! ### Why Configuration over Code?
//!
//! Every REST resource needs the same plumbing: fetch a list, cache it by key,
//! track `isLoading` and `error` per request, keep a selection, patch entries
//! after create/update/delete. Writing that by hand per resource is where the
//! bugs live. Here it is written **once** and each resource only says what is
//! different about it (route, key field, parent, extra actions).
//!
//! ### Why a Store Actor?
//!
//! - **Single writer**: one task owns the state; operations send events to it.
//! - **Duplicate-call guard**: "is this already loading?" and "mark it loading"
//!   happen in one turn of the actor.
//! - **Snapshots**: readers get immutable `Arc` snapshots over a `watch` channel.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine ([`crud_framework`])
//! - **Role**: Generic resource factory, reducer, store actor and selectors.
//! - **Key items**: [`CrudFactory`](crud_framework::CrudFactory),
//!   [`ResourceHandle`](crud_framework::ResourceHandle).
//!
//! ### 2. The Configuration ([`catalog`])
//! - **Role**: One `ResourceConfig` per resource, plus the cross-resource
//!   callbacks (creating an item refreshes its category).
//!
//! ### 3. The Orchestrator ([`lifecycle`])
//! - **Role**: Builds the factory, spawns the store, hands out clients.
//! - **Key items**: [`CatalogSystem`](lifecycle::CatalogSystem),
//!   [`shutdown`](lifecycle::CatalogSystem::shutdown).
//!
//! ### 4. The Interface ([`clients`])
//! - **Role**: Typed wrappers converting between [`model`] structs and JSON.
//!
//! ### 5. The Backend ([`backend`])
//! - **Role**: An in-memory REST API implementing the framework's `Transport`.
//!
//! ## 🚀 Quick Start
//!
//! ### Running the Demo
//!
//! ```bash
//! # Run with info logs
//! RUST_LOG=info cargo run
//! ```
//!
//! ### Running Tests
//!
//! ```bash
//! cargo test --workspace
//! ```

pub mod backend;
pub mod catalog;
pub mod clients;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod runtime;
