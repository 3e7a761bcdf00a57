//! QR issuance service - builds and sends generateQR requests

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Local, NaiveDate};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use super::cipher::elapsed_ms;
use super::session::SessionManager;
use crate::domain::qr::{DEFAULT_DUE_IN_DAYS, DUE_DATE_FORMAT};
use crate::domain::redaction;
use crate::domain::result::{Error, Result};
use crate::domain::{AuditEvent, GatewayLeg, QrOptions, QrRequest, QrResponse, ReauthPolicy};
use crate::ports::{record_quietly, AuditSink, GatewayTransport, GENERATE_QR_PATH};

/// Issues payment QR codes using a [`SessionManager`]'s token and account
pub struct QrIssuanceService {
    session: Arc<SessionManager>,
    transport: Arc<dyn GatewayTransport>,
    audit: Arc<dyn AuditSink>,
    reauth_policy: ReauthPolicy,
    due_in_days: i64,
}

/// Due date used when the caller does not supply one
pub fn default_due_date(today: NaiveDate, due_in_days: i64) -> NaiveDate {
    today + Duration::days(due_in_days)
}

impl QrIssuanceService {
    pub fn new(
        session: Arc<SessionManager>,
        transport: Arc<dyn GatewayTransport>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            session,
            transport,
            audit,
            reauth_policy: ReauthPolicy::default(),
            due_in_days: DEFAULT_DUE_IN_DAYS,
        }
    }

    pub fn with_reauth_policy(mut self, policy: ReauthPolicy) -> Self {
        self.reauth_policy = policy;
        self
    }

    pub fn with_due_in_days(mut self, days: i64) -> Self {
        self.due_in_days = days;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Issue a QR code
    ///
    /// Authenticates and encrypts the account on first use, then posts the
    /// request with the cached bearer token. The transaction ID is passed
    /// through as given; the gateway decides what a duplicate means.
    ///
    /// A rejected issuance leaves the token cached. With
    /// [`ReauthPolicy::OnUnauthorized`] a 401 drops the token, authenticates
    /// again and retries once.
    pub fn generate(
        &self,
        transaction_id: &str,
        amount: Decimal,
        description: &str,
        options: &QrOptions,
    ) -> Result<QrResponse> {
        if transaction_id.trim().is_empty() {
            return Err(Error::validation("Transaction ID cannot be empty"));
        }
        if amount <= Decimal::ZERO {
            return Err(Error::validation(format!("Amount must be positive, got {}", amount)));
        }

        match self.issue(transaction_id, amount, description, options) {
            Err(e) if e.is_unauthorized() && self.reauth_policy == ReauthPolicy::OnUnauthorized => {
                warn!(transaction_id, "gateway rejected token, re-authenticating once");
                self.session.invalidate_token();
                self.issue(transaction_id, amount, description, options)
            }
            result => result,
        }
    }

    fn issue(
        &self,
        transaction_id: &str,
        amount: Decimal,
        description: &str,
        options: &QrOptions,
    ) -> Result<QrResponse> {
        let token = self.session.ensure_authenticated()?;
        let account_credit = self.session.ensure_account_encrypted()?;

        let due_date = match options.due_date {
            Some(date) => date,
            None => {
                let date = default_due_date(Local::now().date_naive(), self.due_in_days);
                debug!(due_date = %date.format(DUE_DATE_FORMAT), "no due date provided, using default");
                date
            }
        };

        let request = QrRequest {
            transaction_id: transaction_id.to_string(),
            account_credit,
            currency: options.currency,
            amount,
            description: description.to_string(),
            due_date,
            single_use: options.single_use,
            modify_amount: options.modify_amount,
            branch_code: options.branch_code.clone(),
        };

        self.send(&token, &request)
    }

    fn send(&self, token: &str, request: &QrRequest) -> Result<QrResponse> {
        let body = serde_json::to_value(request)?;
        let url = self.transport.url_for(GENERATE_QR_PATH);
        let event = AuditEvent::new(GatewayLeg::GenerateQr, "POST", &url)
            .with_transaction(&request.transaction_id)
            .with_request(&body);

        info!(
            transaction_id = %request.transaction_id,
            amount = %request.amount,
            currency = %request.currency,
            due_date = %request.due_date.format(DUE_DATE_FORMAT),
            "generating QR"
        );

        let started = Instant::now();
        let reply = match self.transport.post_json(GENERATE_QR_PATH, Some(token), &body) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(transaction_id = %request.transaction_id, error = %e, "QR request failed");
                record_quietly(
                    self.audit.as_ref(),
                    &event.with_error(e.to_string()).with_duration_ms(elapsed_ms(started)),
                );
                return Err(e);
            }
        };
        let event = event
            .with_status(reply.status)
            .with_duration_ms(elapsed_ms(started));

        if !reply.is_success() {
            warn!(
                transaction_id = %request.transaction_id,
                status = reply.status,
                "gateway rejected QR request"
            );
            let err = Error::QrGeneration {
                status: reply.status,
                body: reply.body,
            };
            record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
            return Err(err);
        }

        let parsed: JsonValue = match reply.json() {
            Ok(value) => value,
            Err(e) => {
                let err = Error::QrGeneration {
                    status: reply.status,
                    body: format!("unexpected response body: {}", e),
                };
                record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
                return Err(err);
            }
        };

        let JsonValue::Object(map) = parsed else {
            let err = Error::QrGeneration {
                status: reply.status,
                body: "response is not a JSON object".to_string(),
            };
            record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
            return Err(err);
        };
        let response = QrResponse::new(map);

        record_quietly(self.audit.as_ref(), &event.with_response(&response.to_value()));

        let qr_id = response.qr_id().unwrap_or_else(|| "-".to_string());
        let image = response
            .qr_image()
            .map(|image| redaction::image_marker(image.len()))
            .unwrap_or_else(|| "none".to_string());
        info!(
            transaction_id = %request.transaction_id,
            qr_id = %qr_id,
            image = %image,
            "QR generation successful"
        );

        Ok(response)
    }
}
