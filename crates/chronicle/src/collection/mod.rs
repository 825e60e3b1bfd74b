//! Module: collection
//! Responsibility: to-many relation snapshots, change diffs, modified flags
//! and lazily materialized historical collections.
//! Does not own: row storage or query execution.

pub mod diff;
pub mod lazy;
pub mod modified;
pub mod record;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use diff::{CollectionChangeMapper, CollectionChanges};
pub use lazy::{CollectionInitializer, HistoricalCollection, build_historical_collection};
pub use modified::ModifiedFlagEvaluator;
pub use record::{AuditRow, ChangeRecord};
pub use snapshot::{CollectionSnapshot, Element, RelationValue, extract};
