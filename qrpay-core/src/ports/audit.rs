//! Audit sink port

use crate::domain::result::Result;
use crate::domain::AuditEvent;

/// Destination for request/response trails
///
/// Events arrive already redacted. Implementations decide where they go
/// (DuckDB store, memory, nowhere).
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<()>;
}

/// Record an event, logging instead of failing when the sink errors
///
/// A broken audit store must not abort a payment call.
pub fn record_quietly(sink: &dyn AuditSink, event: &AuditEvent) {
    if let Err(e) = sink.record(event) {
        tracing::warn!(leg = %event.leg, error = %e, "failed to record audit event");
    }
}
