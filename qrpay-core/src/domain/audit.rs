//! Audit trail events for gateway calls

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::redaction;

/// One of the gateway's network legs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayLeg {
    Encrypt,
    Decrypt,
    Authenticate,
    GenerateQr,
}

impl GatewayLeg {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayLeg::Encrypt => "encrypt",
            GatewayLeg::Decrypt => "decrypt",
            GatewayLeg::Authenticate => "authenticate",
            GatewayLeg::GenerateQr => "generate_qr",
        }
    }
}

impl std::fmt::Display for GatewayLeg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request/response trail
///
/// Payloads can only be attached through [`AuditEvent::with_request`] and
/// [`AuditEvent::with_response`], which redact a copy first. Raw secrets
/// therefore never reach an audit sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub leg: GatewayLeg,
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub request: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl AuditEvent {
    pub fn new(leg: GatewayLeg, method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            leg,
            method: method.into(),
            url: url.into(),
            transaction_id: None,
            request: JsonValue::Null,
            status: None,
            response: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn with_transaction(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Attach the redacted form of an outgoing payload
    pub fn with_request(mut self, payload: &JsonValue) -> Self {
        self.request = redaction::redact_request(self.leg, payload);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Attach the redacted form of a gateway response
    pub fn with_response(mut self, payload: &JsonValue) -> Self {
        self.response = Some(redaction::redact_response(self.leg, payload));
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}
