//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest blocking client for GatewayTransport
//! - in-memory and no-op sinks for AuditSink (the DuckDB store is a service)
//! - a mock gateway server for testing

pub mod http_gateway;
pub mod memory_audit;

#[cfg(test)]
pub mod gateway_mock;

pub use http_gateway::HttpGateway;
pub use memory_audit::{MemoryAuditLog, NullAuditLog};
