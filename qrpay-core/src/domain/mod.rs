//! Core domain types
//!
//! Pure data structures with validation logic. Nothing in here performs I/O.

pub mod audit;
mod identity;
pub mod qr;
pub mod redaction;
pub mod result;
mod session;

pub use audit::{AuditEvent, GatewayLeg};
pub use identity::ClientIdentity;
pub use qr::{Currency, QrOptions, QrRequest, QrResponse};
pub use session::{ReauthPolicy, Session, SessionState};
