//! Gateway transport port
//!
//! The transport only moves bytes: it reports the HTTP status and body and
//! leaves interpreting them to the services. Connection-level problems come
//! back as [`Error::Transport`](crate::domain::result::Error::Transport).

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;

/// Encryption endpoint (GET, query `text` and `aesKey`)
pub const ENCRYPT_PATH: &str = "/api/authentication/encrypt";

/// Decryption endpoint (GET, query `text` and `aesKey`)
pub const DECRYPT_PATH: &str = "/api/authentication/decrypt";

/// Authentication endpoint (POST, body `{userName, password}`)
pub const AUTHENTICATE_PATH: &str = "/api/authentication/authenticate";

/// QR issuance endpoint (POST with bearer token)
pub const GENERATE_QR_PATH: &str = "/api/qrsimple/generateQR";

/// Raw reply from the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayReply {
    pub status: u16,
    pub body: String,
}

impl GatewayReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Any 2xx status
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.body)
    }
}

/// HTTP capability the services need from the outside world
pub trait GatewayTransport: Send + Sync {
    /// Base URL requests are made against, without trailing slash
    fn base_url(&self) -> &str;

    /// Issue a GET with query parameters
    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<GatewayReply>;

    /// Issue a POST with a JSON body and an optional bearer token
    fn post_json(&self, path: &str, bearer: Option<&str>, body: &JsonValue) -> Result<GatewayReply>;

    /// Full URL for a path, used for logging
    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}
