//! Session manager - token and ciphertext cache for one merchant
//!
//! Holds the [`Session`] behind a mutex. The password encrypt, authenticate
//! and cache sequence runs with the lock held, so concurrent callers never
//! encrypt the password twice or authenticate twice at the same time. Once
//! the token is cached, callers only take the lock long enough to clone it.
//!
//! Account encryption is serialized by its own guard instead, and the session
//! lock is only taken to read or store the ciphertext. A slow account encrypt
//! never blocks a token read.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, info, warn};

use super::cipher::{elapsed_ms, CredentialCipher};
use crate::domain::redaction;
use crate::domain::result::{Error, Result};
use crate::domain::{AuditEvent, ClientIdentity, GatewayLeg, Session, SessionState};
use crate::ports::{record_quietly, AuditSink, GatewayTransport, AUTHENTICATE_PATH};

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Owns the gateway session for one [`ClientIdentity`]
pub struct SessionManager {
    identity: ClientIdentity,
    cipher: CredentialCipher,
    transport: Arc<dyn GatewayTransport>,
    audit: Arc<dyn AuditSink>,
    session: Mutex<Session>,
    account_guard: Mutex<()>,
    authenticating: AtomicBool,
}

impl SessionManager {
    pub fn new(
        identity: ClientIdentity,
        transport: Arc<dyn GatewayTransport>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        info!(
            base_url = %identity.base_url(),
            username = %identity.username(),
            account = %redaction::mask_tail(identity.account()),
            "gateway session created"
        );

        Self {
            cipher: CredentialCipher::new(transport.clone(), audit.clone()),
            identity,
            transport,
            audit,
            session: Mutex::new(Session::default()),
            account_guard: Mutex::new(()),
            authenticating: AtomicBool::new(false),
        }
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn cipher(&self) -> &CredentialCipher {
        &self.cipher
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        if self.authenticating.load(Ordering::SeqCst) {
            return SessionState::Authenticating;
        }
        if self.lock().is_authenticated() {
            SessionState::Authenticated
        } else {
            SessionState::Unauthenticated
        }
    }

    /// Cached token, if authenticated
    pub fn token(&self) -> Option<String> {
        self.lock().token.clone().filter(|t| !t.is_empty())
    }

    /// Copy of the session cache
    pub fn snapshot(&self) -> Session {
        self.lock().clone()
    }

    /// Make sure a token is held, authenticating if needed
    ///
    /// Encrypts the password at most once per manager. If authentication
    /// fails the encrypted password stays cached, so a retry goes straight
    /// to the authenticate call.
    pub fn ensure_authenticated(&self) -> Result<String> {
        let mut session = self.lock();
        if let Some(token) = session.token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(token.clone());
        }

        self.authenticating.store(true, Ordering::SeqCst);
        let result = self.authenticate_locked(&mut session);
        self.authenticating.store(false, Ordering::SeqCst);
        result
    }

    /// Make sure the destination account has been encrypted
    ///
    /// The ciphertext is cached for the life of the manager.
    pub fn ensure_account_encrypted(&self) -> Result<String> {
        if let Some(account) = self.lock().account_encrypted.clone() {
            return Ok(account);
        }

        let _guard = self.account_guard.lock().unwrap_or_else(PoisonError::into_inner);
        // another caller may have finished while we waited
        if let Some(account) = self.lock().account_encrypted.clone() {
            return Ok(account);
        }

        debug!("account not encrypted yet, encrypting");
        let encrypted = self
            .cipher
            .encrypt(self.identity.account(), self.identity.aes_key())?;
        self.lock().account_encrypted = Some(encrypted.clone());
        Ok(encrypted)
    }

    /// Forget the token; the next call re-authenticates
    ///
    /// Cached ciphertexts are kept.
    pub fn invalidate_token(&self) {
        self.lock().clear_token();
        info!("gateway token invalidated");
    }

    fn authenticate_locked(&self, session: &mut Session) -> Result<String> {
        let password_encrypted = match &session.password_encrypted {
            Some(encrypted) => encrypted.clone(),
            None => {
                debug!("password not encrypted yet, encrypting");
                let encrypted = self
                    .cipher
                    .encrypt(self.identity.password(), self.identity.aes_key())?;
                session.password_encrypted = Some(encrypted.clone());
                encrypted
            }
        };

        let token = self.authenticate(&password_encrypted)?;
        session.token = Some(token.clone());
        Ok(token)
    }

    fn authenticate(&self, password_encrypted: &str) -> Result<String> {
        let body = json!({
            "userName": self.identity.username(),
            "password": password_encrypted,
        });
        let url = self.transport.url_for(AUTHENTICATE_PATH);
        let event = AuditEvent::new(GatewayLeg::Authenticate, "POST", &url).with_request(&body);

        info!(url = %url, username = %self.identity.username(), "authenticating with gateway");

        let started = Instant::now();
        let reply = match self.transport.post_json(AUTHENTICATE_PATH, None, &body) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "authentication request failed");
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
            warn!(status = reply.status, "gateway rejected authentication");
            let err = Error::Authentication {
                status: reply.status,
                body: reply.body,
            };
            record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
            return Err(err);
        }

        let parsed: std::result::Result<JsonValue, _> = reply.json();
        let token = parsed
            .as_ref()
            .ok()
            .and_then(|value| AuthenticateResponse::deserialize(value).ok())
            .and_then(|r| r.token)
            .filter(|t| !t.is_empty());

        let event = match &parsed {
            Ok(value) => event.with_response(value),
            Err(_) => event,
        };

        match token {
            Some(token) => {
                record_quietly(self.audit.as_ref(), &event);
                info!(status = reply.status, "authentication successful");
                Ok(token)
            }
            None => {
                warn!(status = reply.status, "no token received in authentication response");
                let err = Error::Authentication {
                    status: reply.status,
                    body: "no token received in response".to_string(),
                };
                record_quietly(self.audit.as_ref(), &event.with_error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Session data is only written after a successful step, so a poisoned
    /// lock still holds a consistent value.
    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateway_mock::{MockConfig, MockGatewayServer};
    use crate::adapters::{HttpGateway, MemoryAuditLog};

    fn manager_for(server: &MockGatewayServer) -> (SessionManager, Arc<MemoryAuditLog>) {
        let identity = ClientIdentity::new(&server.base_url(), "1649710", "1234", "KEY", "1041070599").unwrap();
        let transport = Arc::new(HttpGateway::new(&server.base_url()).unwrap());
        let audit = Arc::new(MemoryAuditLog::new());
        (SessionManager::new(identity, transport, audit.clone()), audit)
    }

    #[test]
    fn test_authenticates_once_against_mock() {
        let server = MockGatewayServer::start(MockConfig::default()).unwrap();
        let (manager, audit) = manager_for(&server);
        assert_eq!(manager.state(), SessionState::Unauthenticated);

        let first = manager.ensure_authenticated().unwrap();
        let second = manager.ensure_authenticated().unwrap();

        assert_eq!(first, second);
        assert_eq!(manager.state(), SessionState::Authenticated);
        assert_eq!(audit.legs(), vec![GatewayLeg::Encrypt, GatewayLeg::Authenticate]);
        assert_eq!(manager.snapshot().password_encrypted.as_deref(), Some("enc(1234)"));
    }

    #[test]
    fn test_missing_token_is_authentication_failure() {
        let server = MockGatewayServer::start(MockConfig {
            omit_token: true,
            ..Default::default()
        })
        .unwrap();
        let (manager, _audit) = manager_for(&server);

        match manager.ensure_authenticated() {
            Err(Error::Authentication { status, body }) => {
                assert_eq!(status, 200);
                assert!(body.contains("no token"));
            }
            other => panic!("expected authentication failure, got {:?}", other),
        }
        assert_eq!(manager.state(), SessionState::Unauthenticated);
    }

    #[test]
    fn test_rejected_credentials_keep_password_cache() {
        let server = MockGatewayServer::start(MockConfig {
            fail_auth: true,
            ..Default::default()
        })
        .unwrap();
        let (manager, _audit) = manager_for(&server);

        assert!(matches!(
            manager.ensure_authenticated(),
            Err(Error::Authentication { status: 401, .. })
        ));
        let session = manager.snapshot();
        assert!(session.token.is_none());
        assert!(session.password_encrypted.is_some());
    }

    #[test]
    fn test_account_encrypted_once() {
        let server = MockGatewayServer::start(MockConfig::default()).unwrap();
        let (manager, audit) = manager_for(&server);

        assert_eq!(manager.ensure_account_encrypted().unwrap(), "enc(1041070599)");
        assert_eq!(manager.ensure_account_encrypted().unwrap(), "enc(1041070599)");
        assert_eq!(audit.legs(), vec![GatewayLeg::Encrypt]);
    }

    #[test]
    fn test_invalidate_token_forces_reauthentication_only() {
        let server = MockGatewayServer::start(MockConfig::default()).unwrap();
        let (manager, audit) = manager_for(&server);

        let first = manager.ensure_authenticated().unwrap();
        manager.invalidate_token();
        assert_eq!(manager.state(), SessionState::Unauthenticated);
        let second = manager.ensure_authenticated().unwrap();

        assert_ne!(first, second);
        assert_eq!(
            audit.legs(),
            vec![GatewayLeg::Encrypt, GatewayLeg::Authenticate, GatewayLeg::Authenticate]
        );
    }
}
