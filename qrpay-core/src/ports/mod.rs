//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The services depend
//! only on these traits, not on concrete implementations.

mod audit;
mod gateway;
pub mod operations;

pub use audit::{record_quietly, AuditSink};
pub use gateway::{
    GatewayReply, GatewayTransport, AUTHENTICATE_PATH, DECRYPT_PATH, ENCRYPT_PATH,
    GENERATE_QR_PATH,
};
pub use operations::OperationsConsole;
