//! Staleness-driven regeneration engine for persisted derived tables (PDTs).
//!
//! Given a set of view declarations, the engine discovers the dependency
//! graph between their SQL templates, linearizes it, and regenerates each
//! persisted derived table whose trigger query reports a new value, one
//! warehouse transaction per view, in dependency order.

pub mod context;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod graph;
pub mod model;
pub mod store;
pub mod template;
pub mod warehouse;

pub use context::RunContext;
pub use dialect::Dialect;
pub use driver::{Regenerator, RunSummary, ViewOutcome};
pub use error::{Error, Result};
pub use model::{View, ViewDeclaration, SCRATCH_SCHEMA};
pub use store::{FileTriggerValueStore, TriggerValue, TriggerValueStore};
pub use warehouse::{PostgresWarehouse, Warehouse, WarehouseError};
