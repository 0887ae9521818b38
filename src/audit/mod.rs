//! Structured audit logging.
//!
//! Batch and target lifecycle events are emitted through `tracing` under the
//! `scanfleet::audit` target, so any subscriber (JSON lines, log shipping)
//! can capture them separately from diagnostic logs.

mod events;

pub use events::{
    emit_batch_completed, emit_batch_started, emit_target_completed, emit_target_started,
    AuditEvent, BatchAuditEvent, TargetAuditEvent,
};
