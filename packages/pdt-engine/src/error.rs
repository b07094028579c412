use thiserror::Error;

use crate::warehouse::WarehouseError;

/// The error type for a regeneration run.
///
/// None of these are recovered locally; they propagate to the run boundary,
/// which logs them and exits non-zero. Views regenerated before the failure
/// stay committed.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or unresolvable view declaration. Raised at load or
    /// graph-build time, before any SQL executes.
    #[error("invalid view configuration: {0}")]
    Config(String),

    /// The dependency graph contains a back edge.
    #[error("views contain a circular dependency involving '{0}'")]
    CyclicDependency(String),

    /// A trigger query or existence probe returned an unexpected shape.
    #[error("query for view '{view}' failed: {message}")]
    Query { view: String, message: String },

    /// Rendering or executing regeneration SQL failed.
    #[error("failed to regenerate view '{view}'")]
    Regeneration {
        view: String,
        #[source]
        source: WarehouseError,
    },

    /// Transport-level failure not tied to a single view (schema creation,
    /// transaction boundaries).
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    /// The trigger value store could not be read or written.
    #[error("trigger value store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
