use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// AuditMetrics
/// Ephemeral, in-memory counters for diff and query activity.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AuditMetrics {
    pub ops: AuditOps,
    pub relations: BTreeMap<String, RelationCounters>,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// AuditOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct AuditOps {
    // Diff engine
    pub diff_calls: u64,
    pub diff_not_applicable: u64,
    pub records_added: u64,
    pub records_deleted: u64,

    // Query pipeline
    pub queries_compiled: u64,
    pub queries_executed: u64,
    pub rows_materialized: u64,

    // Lazy collections
    pub collections_initialized: u64,
}

///
/// RelationCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct RelationCounters {
    pub diff_calls: u64,
    pub records_added: u64,
    pub records_deleted: u64,
    pub collections_initialized: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityCounters {
    pub queries_compiled: u64,
    pub queries_executed: u64,
    pub rows_materialized: u64,
}

thread_local! {
    static AUDIT_METRICS: RefCell<AuditMetrics> = RefCell::new(AuditMetrics::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&AuditMetrics) -> R) -> R {
    AUDIT_METRICS.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut AuditMetrics) -> R) -> R {
    AUDIT_METRICS.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters (useful in tests).
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = AuditMetrics::default());
}

/// Snapshot the current counters.
pub(crate) fn report() -> AuditMetrics {
    with_state(Clone::clone)
}
