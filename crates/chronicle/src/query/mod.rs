//! Module: query
//! Responsibility: historical query construction, compilation and result
//! post-processing.
//! Does not own: running the compiled query (see `AuditQueryExecutor`).
//! Boundary: `AuditQuery` to `CompiledAuditQuery` to materialized results.

pub mod association;
pub mod builder;
pub mod compiled;
pub mod criteria;
pub mod execute;
pub mod options;
pub mod order;
pub mod projection;
pub mod property;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

// re-exports
pub use association::AssociationQuery;
pub use builder::{AuditQuery, QueryKind};
pub use compiled::{
    CompiledJoin, CompiledOrder, CompiledPredicate, CompiledProjection, CompiledQuery,
    PropertyPath, RevisionBound,
};
pub use criteria::{AuditCriterion, AuditEntity, CompareOp, PropertyRef};
pub use execute::{AuditQueryExecutor, CompiledAuditQuery, ExecutorError};
pub use options::{CacheMode, FlushMode, LockMode, QueryOptions};
pub use order::{AuditOrder, OrderDirection};
pub use projection::{AuditProjection, ProjectionFunction};
pub use property::{AuditProperty, resolve_property};

///
/// JoinKind
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
}

///
/// QueryError
///
/// Construction-time failures. These are configuration problems and are
/// never retried internally.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error("{entity} is not versioned")]
    NotVersioned { entity: String },

    #[error("entity '{entity}' has no audited property '{property}'")]
    UnknownProperty { entity: String, property: String },

    #[error("entity '{entity}' has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    #[error("relation '{entity}.{relation}' cannot be traversed: {reason}")]
    UnsupportedTraversal {
        entity: String,
        relation: String,
        reason: &'static str,
    },

    #[error("entity '{entity}' has a composite identifier; name the id field explicitly")]
    CompositeIdentifier { entity: String },
}
