//! CLI command implementations

pub mod audit;
pub mod cipher;
pub mod config;
pub mod generate;

use std::path::PathBuf;

use anyhow::{Context, Result};
use qrpay_core::services::AuditLogService;
use qrpay_core::QrPayContext;

/// Environment variable overriding the qrpay directory
const DIR_ENV: &str = "QRPAY_DIR";

/// Get the qrpay directory from environment or default
pub fn get_qrpay_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".qrpay"))
        .context("Could not find home directory; set QRPAY_DIR")
}

/// Get or create the qrpay context
pub fn get_context() -> Result<QrPayContext> {
    let qrpay_dir = get_qrpay_dir()?;

    std::fs::create_dir_all(&qrpay_dir)
        .with_context(|| format!("Failed to create qrpay directory: {:?}", qrpay_dir))?;

    QrPayContext::new(&qrpay_dir).context("Failed to initialize qrpay context")
}

/// Open the audit store without needing gateway credentials
pub fn get_audit_service() -> Result<AuditLogService> {
    let qrpay_dir = get_qrpay_dir()?;
    std::fs::create_dir_all(&qrpay_dir)
        .with_context(|| format!("Failed to create qrpay directory: {:?}", qrpay_dir))?;
    AuditLogService::new(&qrpay_dir, env!("CARGO_PKG_VERSION"))
}
