//! Session state held between gateway calls

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::result::Error;

/// Lifecycle of a gateway session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No token yet
    Unauthenticated,
    /// Password encryption or authentication in flight
    Authenticating,
    /// Token held and reused for issuance
    Authenticated,
}

/// What to do when the gateway rejects a cached token during issuance
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReauthPolicy {
    /// Surface the 401 as a QR generation failure and keep the token
    #[default]
    Never,
    /// Drop the token, authenticate again and retry the issuance once
    OnUnauthorized,
}

impl FromStr for ReauthPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "never" => Ok(ReauthPolicy::Never),
            "onunauthorized" => Ok(ReauthPolicy::OnUnauthorized),
            other => Err(Error::config(format!(
                "Unknown reauth policy '{}', expected never or onUnauthorized",
                other
            ))),
        }
    }
}

/// Cached token and ciphertexts
///
/// The encrypted password and account are filled at most once and kept for
/// the life of the session. Only the token can be cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub password_encrypted: Option<String>,
    pub account_encrypted: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Drop the token, keeping the cached ciphertexts
    pub fn clear_token(&mut self) {
        self.token = None;
    }
}
