//! QrPay Core - Client library for a bank QR payment gateway
//!
//! This crate implements the gateway client following hexagonal architecture:
//!
//! - **domain**: Core types (identity, session, QR request/response, audit events)
//! - **ports**: Trait definitions for external dependencies (GatewayTransport, AuditSink)
//! - **services**: Credential cipher, session manager, QR issuance, audit store
//! - **adapters**: Concrete implementations (reqwest gateway, in-memory audit)

pub mod adapters;
pub mod audit_migrations;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::HttpGateway;
use config::Config;
use ports::{AuditSink, GatewayTransport};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{
    AuditEvent, ClientIdentity, Currency, GatewayLeg, QrOptions, QrResponse, ReauthPolicy,
    SessionState,
};

/// Main context for qrpay operations
///
/// Wires one gateway transport, one session and the persistent audit store
/// together from the settings in a qrpay directory.
pub struct QrPayContext {
    pub config: Config,
    pub audit: Arc<AuditLogService>,
    pub session: Arc<SessionManager>,
    pub issuance: QrIssuanceService,
    pub exporter: IssuanceExporter,
}

impl QrPayContext {
    /// Create a context talking to the configured gateway over HTTP
    pub fn new(qrpay_dir: &Path) -> Result<Self> {
        let config = Config::load(qrpay_dir)?;
        let identity = config.identity()?;
        let transport: Arc<dyn GatewayTransport> = Arc::new(HttpGateway::with_timeout(
            identity.base_url(),
            Duration::from_secs(config.timeout_secs()),
        )?);
        Self::with_transport(qrpay_dir, config, transport)
    }

    /// Create a context over an existing transport
    pub fn with_transport(
        qrpay_dir: &Path,
        config: Config,
        transport: Arc<dyn GatewayTransport>,
    ) -> Result<Self> {
        let identity = config.identity()?;

        std::fs::create_dir_all(qrpay_dir)?;
        let audit = Arc::new(AuditLogService::new(qrpay_dir, env!("CARGO_PKG_VERSION"))?);
        let sink: Arc<dyn AuditSink> = audit.clone();

        let session = Arc::new(SessionManager::new(identity, Arc::clone(&transport), Arc::clone(&sink)));
        let issuance = QrIssuanceService::new(Arc::clone(&session), transport, sink)
            .with_reauth_policy(config.reauth_policy)
            .with_due_in_days(config.defaults.due_in_days);
        let exporter = IssuanceExporter::new(config.output_dir.clone());

        Ok(Self {
            config,
            audit,
            session,
            issuance,
            exporter,
        })
    }

    /// Cipher bound to this context's transport and audit store
    pub fn cipher(&self) -> &CredentialCipher {
        self.session.cipher()
    }
}
