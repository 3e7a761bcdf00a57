//! In-process audit sinks

use std::sync::{Mutex, PoisonError};

use crate::domain::result::Result;
use crate::domain::{AuditEvent, GatewayLeg};
use crate::ports::AuditSink;

/// Keeps audit events in memory
///
/// Handy for tests and for embedding the client where no audit store exists.
#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded legs in order
    pub fn legs(&self) -> Vec<GatewayLeg> {
        self.events().iter().map(|e| e.leg).collect()
    }

    /// All events serialized to JSON text, for scanning for leaked values
    pub fn dump(&self) -> String {
        self.events()
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl AuditSink for MemoryAuditLog {
    fn record(&self, event: &AuditEvent) -> Result<()> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditLog;

impl AuditSink for NullAuditLog {
    fn record(&self, _event: &AuditEvent) -> Result<()> {
        Ok(())
    }
}
