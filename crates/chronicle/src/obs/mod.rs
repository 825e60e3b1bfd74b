//! Observability: in-process audit counters and the event sink boundary.
//!
//! Diff and query code never touch counters or the tracing subscriber
//! directly; everything flows through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{AuditMetrics, AuditOps, EntityCounters, RelationCounters};
pub use sink::{AuditEvent, AuditSink, metrics_report, metrics_reset_all, with_audit_sink};
