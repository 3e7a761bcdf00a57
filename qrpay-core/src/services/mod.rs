//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. The gateway
//! services share one transport and one audit sink.

mod audit;
pub mod cipher;
pub mod export;
pub mod issuance;
pub mod session;

pub use audit::{AuditEntry, AuditLogService, AUDIT_DB_FILENAME};
pub use cipher::CredentialCipher;
pub use export::{ExportSummary, IssuanceExporter};
pub use issuance::{default_due_date, QrIssuanceService};
pub use session::SessionManager;
