//! Core audit-trail runtime for Chronicle: collection change diffs,
//! modified flags, lazy historical collections and historical queries.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod collection;
pub mod config;
pub mod error;
pub mod materialize;
pub mod model;
pub mod obs;
pub mod query;
pub mod reader;
pub mod response;
pub mod value;

pub use error::Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, executors or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        collection::{CollectionSnapshot, RelationValue},
        config::AuditConfiguration,
        materialize::HistoricalEntity,
        model::{EntityModel, RelationDescriptor, RelationKind},
        query::{AuditEntity, JoinKind},
        reader::AuditReader,
        response::QueryResult,
        value::{Revision, RevisionType, Value},
    };
}
