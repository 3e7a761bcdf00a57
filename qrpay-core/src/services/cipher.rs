//! Credential cipher - encryption round-trips through the gateway
//!
//! The bank does not publish its cipher; every value it wants encrypted
//! (password, destination account) is sent to its encryption endpoint and
//! the returned ciphertext is used verbatim.

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::redaction;
use crate::domain::result::{Error, Result};
use crate::domain::{AuditEvent, GatewayLeg};
use crate::ports::{record_quietly, AuditSink, GatewayTransport, DECRYPT_PATH, ENCRYPT_PATH};

/// Encrypts and decrypts opaque strings via the gateway
#[derive(Clone)]
pub struct CredentialCipher {
    transport: Arc<dyn GatewayTransport>,
    audit: Arc<dyn AuditSink>,
}

impl CredentialCipher {
    pub fn new(transport: Arc<dyn GatewayTransport>, audit: Arc<dyn AuditSink>) -> Self {
        Self { transport, audit }
    }

    /// Encrypt `plaintext` with the merchant's AES key
    ///
    /// One GET round-trip. Fails with [`Error::Encryption`] on a non-2xx
    /// status or a body that is not a JSON string.
    pub fn encrypt(&self, plaintext: &str, aes_key: &str) -> Result<String> {
        self.round_trip(GatewayLeg::Encrypt, ENCRYPT_PATH, plaintext, aes_key)
    }

    /// Decrypt a ciphertext previously produced by [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, ciphertext: &str, aes_key: &str) -> Result<String> {
        self.round_trip(GatewayLeg::Decrypt, DECRYPT_PATH, ciphertext, aes_key)
    }

    fn round_trip(&self, leg: GatewayLeg, path: &str, text: &str, aes_key: &str) -> Result<String> {
        if text.is_empty() {
            return Err(Error::validation(format!("Text to {} cannot be empty", leg)));
        }
        if aes_key.is_empty() {
            return Err(Error::validation("AES key cannot be empty"));
        }

        let url = self.transport.url_for(path);
        let event = AuditEvent::new(leg, "GET", &url)
            .with_request(&json!({"text": text, "aesKey": aes_key}));

        debug!(
            leg = %leg,
            url = %url,
            key_fingerprint = %redaction::key_fingerprint(aes_key),
            "gateway cipher request"
        );

        let started = Instant::now();
        let reply = match self.transport.get(path, &[("text", text), ("aesKey", aes_key)]) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(leg = %leg, error = %e, "gateway cipher request failed");
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
            warn!(leg = %leg, status = reply.status, "gateway rejected cipher request");
            let err = Error::Encryption {
                status: reply.status,
                body: reply.body,
            };
            record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
            return Err(err);
        }

        let output: String = match reply.json() {
            Ok(output) => output,
            Err(e) => {
                let err = Error::Encryption {
                    status: reply.status,
                    body: format!("unexpected response body: {}", e),
                };
                record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
                return Err(err);
            }
        };

        record_quietly(self.audit.as_ref(), &event.with_response(&json!(output)));
        info!(leg = %leg, status = reply.status, "gateway cipher request succeeded");

        Ok(output)
    }
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
