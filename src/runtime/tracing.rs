//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`. Module paths are hidden; the structured fields (`resource`,
//! `action`, `action_type`, `parent`) identify where a line comes from.
//!
//! ## What Gets Traced
//!
//! - **Store lifecycle**: `Store started` / `Store shutdown` at `info`
//! - **Events**: every dispatched event with the resources it changed, at `debug`
//! - **Operations**: an `info` line per successful request inside a span named
//!   after the operation; transport failures at `warn`
//! - **Configuration**: rejected configs and malformed events at `warn`/`error`
//!
//! ## Usage Examples
//!
//! ```bash
//! # Operations and lifecycle
//! RUST_LOG=info cargo run
//!
//! # Every event and request
//! RUST_LOG=debug cargo run
//!
//! # Only the framework's reducer decisions
//! RUST_LOG=crud_framework::reducer=debug cargo run
//! ```
//!
//! With `RUST_LOG=debug` a `getList` reads like:
//!
//! ```text
//! DEBUG run{resource="items" action="getList"}: Dispatch action_type=GET_ITEMS_LIST_IS_LOADING parent=Some(null) changed=["items"]
//! DEBUG run{resource="items" action="getList"}: Request method=GET url=/api/items/
//! DEBUG run{resource="items" action="getList"}: Dispatch action_type=SET_ITEMS_LIST parent=Some(null) changed=["items"]
//!  INFO run{resource="items" action="getList"}: Succeeded
//! ```

/// Initializes structured logging.
///
/// Set `RUST_LOG` to control verbosity, e.g. `RUST_LOG=crud_recipe=debug`.
/// Call once per process.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
