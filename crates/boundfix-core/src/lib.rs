//! Reactive state engine between `boundfix-api` and an operator front end.
//!
//! This crate owns all server-derived state for resolving missing
//! administrative boundaries, decides when to fetch what, and evaluates the
//! rule set that disables boundary suggestions:
//!
//! - **[`Store`]** — Central facade and the only integration point for the
//!   presentation layer. [`start()`](Store::start) spawns the status poller,
//!   [`shutdown()`](Store::shutdown) tears it down. Operator gestures map to
//!   [`select()`](Store::select), [`save()`](Store::save),
//!   [`delete_current()`](Store::delete_current) and
//!   [`hover_feature()`](Store::hover_feature).
//!
//! - **[`StoreState`]** — One immutable snapshot published through a
//!   `tokio::sync::watch` channel. Every mutation runs in a single
//!   synchronous commit, so observers never see half-applied updates.
//!
//! - **Dependency graph** — Derived computations declare the [`Fields`]
//!   they read and re-run inside the commit that changed them: the
//!   [`RuleEngine`] recomputes disabled suggestions, the load trigger fetches
//!   the next work item when one is pending.
//!
//! - **[`StateStream`]** — Subscription handle with `current()` / `latest()` /
//!   `changed()` / `wait_for()` for reactive rendering.
//!
//! - **Domain model** ([`model`]) — `Status`, `Config`, `MissingCoordinate`,
//!   `Suggestion`, `Topology` and the operator's [`SelectionMap`].

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod rules;
pub mod state;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::StoreConfig;
pub use error::CoreError;
pub use rules::RuleEngine;
pub use state::{Epoch, Fields, StoreState};
pub use store::{BackgroundFailure, Store};
pub use stream::StateStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    BoundingBox, Config, Coordinate, ExportStatus, FeatureId, FeatureRef, Layer, MatchRule,
    MissingCoordinate, SelectionMap, Status, Suggestion, Topology,
};
