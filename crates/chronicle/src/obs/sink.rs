//! Audit event sink boundary.
//!
//! Core logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through AuditEvent and AuditSink.
use crate::obs::metrics::{self, AuditMetrics};
use std::{cell::RefCell, rc::Rc};
use tracing::{debug, trace};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn AuditSink>>> = RefCell::new(None);
}

///
/// AuditEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuditEvent<'a> {
    ChangesComputed {
        owner_entity: &'a str,
        relation: &'a str,
        added: u64,
        deleted: u64,
    },
    RelationNotApplicable {
        relation: &'a str,
        requested: &'a str,
    },
    QueryCompiled {
        entity: &'a str,
        criteria: u64,
        joins: u64,
        projections: u64,
    },
    QueryExecuted {
        entity: &'a str,
        rows: u64,
    },
    CollectionInitialized {
        relation: &'a str,
        elements: u64,
    },
}

///
/// AuditSink
///

pub trait AuditSink {
    fn record(&self, event: AuditEvent<'_>);
}

/// GlobalAuditSink
/// Default sink: updates thread-local counters and emits a tracing event.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalAuditSink;

impl AuditSink for GlobalAuditSink {
    fn record(&self, event: AuditEvent<'_>) {
        match event {
            AuditEvent::ChangesComputed {
                owner_entity,
                relation,
                added,
                deleted,
            } => {
                debug!(owner_entity, relation, added, deleted, "collection changes computed");
                metrics::with_state_mut(|m| {
                    m.ops.diff_calls = m.ops.diff_calls.saturating_add(1);
                    m.ops.records_added = m.ops.records_added.saturating_add(added);
                    m.ops.records_deleted = m.ops.records_deleted.saturating_add(deleted);

                    let entry = m
                        .relations
                        .entry(format!("{owner_entity}.{relation}"))
                        .or_default();
                    entry.diff_calls = entry.diff_calls.saturating_add(1);
                    entry.records_added = entry.records_added.saturating_add(added);
                    entry.records_deleted = entry.records_deleted.saturating_add(deleted);
                });
            }

            AuditEvent::RelationNotApplicable {
                relation,
                requested,
            } => {
                trace!(relation, requested, "diff skipped for foreign relation");
                metrics::with_state_mut(|m| {
                    m.ops.diff_not_applicable = m.ops.diff_not_applicable.saturating_add(1);
                });
            }

            AuditEvent::QueryCompiled {
                entity,
                criteria,
                joins,
                projections,
            } => {
                debug!(entity, criteria, joins, projections, "audit query compiled");
                metrics::with_state_mut(|m| {
                    m.ops.queries_compiled = m.ops.queries_compiled.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.queries_compiled = entry.queries_compiled.saturating_add(1);
                });
            }

            AuditEvent::QueryExecuted { entity, rows } => {
                debug!(entity, rows, "audit query executed");
                metrics::with_state_mut(|m| {
                    m.ops.queries_executed = m.ops.queries_executed.saturating_add(1);
                    m.ops.rows_materialized = m.ops.rows_materialized.saturating_add(rows);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.queries_executed = entry.queries_executed.saturating_add(1);
                    entry.rows_materialized = entry.rows_materialized.saturating_add(rows);
                });
            }

            AuditEvent::CollectionInitialized { relation, elements } => {
                trace!(relation, elements, "historical collection initialized");
                metrics::with_state_mut(|m| {
                    m.ops.collections_initialized = m.ops.collections_initialized.saturating_add(1);
                    let entry = m.relations.entry(relation.to_string()).or_default();
                    entry.collections_initialized = entry.collections_initialized.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_AUDIT_SINK: GlobalAuditSink = GlobalAuditSink;

pub(crate) fn record(event: AuditEvent<'_>) {
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_AUDIT_SINK.record(event),
    }
}

/// Snapshot the current counters for diagnostics and tests.
#[must_use]
pub fn metrics_report() -> AuditMetrics {
    metrics::report()
}

/// Reset all counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary sink override on the current thread.
pub fn with_audit_sink<T>(sink: Rc<dyn AuditSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn AuditSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}

///
/// TESTS
///
