//! # safelabs-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Model the hierarchical value tree (`devices/{id}/latest`, `labs/{id}/ac`)
//!   as a `nodes` table keyed by path
//! - Implement the telemetry, actuator and event-store ports from
//!   `safelabs-app::ports`
//! - Keep the audit log append-only with per-device monotonic timestamps
//! - Manage the connection pool and run embedded migrations
//!
//! ## Dependency rule
//! Depends on `safelabs-app` (for port traits) and `safelabs-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod actuator_repo;
pub mod error;
pub mod event_store;
pub mod nodes;
pub mod pool;
mod telemetry_repo;

pub use error::StorageError;
pub use event_store::SqliteEventStore;
pub use nodes::SqliteNodeStore;
pub use pool::{Config, Database};
