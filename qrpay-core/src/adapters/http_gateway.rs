//! Bank gateway HTTP client
//!
//! Blocking reqwest transport for the gateway's encryption, authentication
//! and QR endpoints. It reports status and body as-is; the services decide
//! what a non-2xx status means for each leg.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::{GatewayReply, GatewayTransport};

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Gateway transport backed by `reqwest::blocking`
#[derive(Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpGateway {
    /// Create a client with the default timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| Error::config(format!("Invalid gateway base URL '{}': {}", base_url, e)))?;
        if parsed.scheme() != "https" && parsed.scheme() != "http" {
            return Err(Error::config("Gateway base URL must use http or https"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Read status and body, turning body read failures into transport errors
    fn into_reply(&self, response: Response) -> Result<GatewayReply> {
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| self.map_request_error(e))?;
        Ok(GatewayReply { status, body })
    }

    /// Map request errors to user-friendly messages
    ///
    /// The URL is stripped first: cipher legs carry the plaintext and the
    /// AES key in the query string.
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        let error = error.without_url();
        if error.is_timeout() {
            Error::Transport(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::Transport("Unable to connect to the bank gateway".to_string())
        } else {
            Error::Transport(format!("Gateway request failed: {}", error))
        }
    }
}

impl GatewayTransport for HttpGateway {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<GatewayReply> {
        let response = self
            .client
            .get(self.url_for(path))
            .query(query)
            .send()
            .map_err(|e| self.map_request_error(e))?;

        self.into_reply(response)
    }

    fn post_json(&self, path: &str, bearer: Option<&str>, body: &JsonValue) -> Result<GatewayReply> {
        let mut request = self.client.post(self.url_for(path)).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| self.map_request_error(e))?;

        self.into_reply(response)
    }
}
