//! Merchant identity used to talk to the gateway

use std::fmt;

use url::Url;

use super::redaction;
use super::result::{Error, Result};

/// Credentials and destination account for one merchant
///
/// Fixed for the life of a client. Everything here except the base URL and
/// username is secret, so `Debug` masks it.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    base_url: String,
    username: String,
    password: String,
    aes_key: String,
    account: String,
}

impl ClientIdentity {
    /// Build an identity, validating the base URL and rejecting empty fields
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        aes_key: impl Into<String>,
        account: impl Into<String>,
    ) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid gateway base URL '{}': {}", base_url, e)))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(Error::config("Gateway base URL must use http or https"));
        }

        let identity = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            aes_key: aes_key.into(),
            account: account.into(),
        };

        for (field, value) in [
            ("username", &identity.username),
            ("password", &identity.password),
            ("aesKey", &identity.aes_key),
            ("account", &identity.account),
        ] {
            if value.is_empty() {
                return Err(Error::config(format!("Gateway {} cannot be empty", field)));
            }
        }

        Ok(identity)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn aes_key(&self) -> &str {
        &self.aes_key
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

impl fmt::Debug for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientIdentity")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &redaction::REDACTED)
            .field("aes_key", &redaction::key_fingerprint(&self.aes_key))
            .field("account", &redaction::mask_tail(&self.account))
            .finish()
    }
}
