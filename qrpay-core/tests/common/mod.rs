//! Shared fixtures for gateway integration tests
//!
//! `FakeGateway` answers the four gateway endpoints in-process and records
//! every call so tests can assert on exact request shapes and call order.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value as JsonValue};

use qrpay_core::domain::result::{Error, Result};
use qrpay_core::ports::{
    GatewayReply, GatewayTransport, AUTHENTICATE_PATH, DECRYPT_PATH, ENCRYPT_PATH,
    GENERATE_QR_PATH,
};
use qrpay_core::ClientIdentity;

pub const BASE_URL: &str = "https://gateway.test/ApiGateway";
pub const USERNAME: &str = "1649710";
pub const PASSWORD: &str = "s3cret-pass";
pub const AES_KEY: &str = "AES-KEY-0001";
pub const ACCOUNT: &str = "1041070599";

/// Small valid base64 payload standing in for a PNG
pub const QR_IMAGE: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk";

pub fn identity() -> ClientIdentity {
    ClientIdentity::new(BASE_URL, USERNAME, PASSWORD, AES_KEY, ACCOUNT).unwrap()
}

/// Ciphertext the fake returns for a plaintext
pub fn cipher_of(text: &str) -> String {
    format!("ENC({})", text)
}

/// One recorded gateway call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<JsonValue>,
}

impl RecordedCall {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// In-process gateway double
#[derive(Default)]
pub struct FakeGateway {
    calls: Mutex<Vec<RecordedCall>>,
    tokens_issued: AtomicUsize,
    qr_issued: AtomicUsize,
    /// Replies returned by generateQR before falling back to success
    pub generate_replies: Mutex<VecDeque<GatewayReply>>,
    /// Replies returned by authenticate before falling back to success
    pub auth_replies: Mutex<VecDeque<GatewayReply>>,
    /// Replies returned by encrypt before falling back to success
    pub encrypt_replies: Mutex<VecDeque<GatewayReply>>,
    /// Fail every request at the connection level
    pub unreachable: bool,
    /// Delay applied to authenticate, to widen race windows
    pub auth_delay: Option<Duration>,
    /// Delay applied when encrypting [`ACCOUNT`]
    pub account_encrypt_delay: Option<Duration>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_auth_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            auth_delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn with_account_encrypt_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            account_encrypt_delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            unreachable: true,
            ..Default::default()
        })
    }

    pub fn push_generate_reply(&self, reply: GatewayReply) {
        self.generate_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_auth_reply(&self, reply: GatewayReply) {
        self.auth_replies.lock().unwrap().push_back(reply);
    }

    pub fn push_encrypt_reply(&self, reply: GatewayReply) {
        self.encrypt_replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.path).collect()
    }

    pub fn count(&self, path: &str) -> usize {
        self.calls().iter().filter(|c| c.path == path).count()
    }

    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn encrypt(&self, query: &[(&str, &str)]) -> GatewayReply {
        if let Some(reply) = self.encrypt_replies.lock().unwrap().pop_front() {
            return reply;
        }
        let text = query.iter().find(|(k, _)| *k == "text").map(|(_, v)| *v).unwrap_or("");
        if let Some(delay) = self.account_encrypt_delay.filter(|_| text == ACCOUNT) {
            std::thread::sleep(delay);
        }
        GatewayReply::new(200, json!(cipher_of(text)).to_string())
    }

    fn decrypt(&self, query: &[(&str, &str)]) -> GatewayReply {
        let text = query.iter().find(|(k, _)| *k == "text").map(|(_, v)| *v).unwrap_or("");
        match text.strip_prefix("ENC(").and_then(|t| t.strip_suffix(')')) {
            Some(plain) => GatewayReply::new(200, json!(plain).to_string()),
            None => GatewayReply::new(400, "invalid ciphertext"),
        }
    }

    fn authenticate(&self, body: &JsonValue) -> GatewayReply {
        if let Some(delay) = self.auth_delay {
            std::thread::sleep(delay);
        }
        if let Some(reply) = self.auth_replies.lock().unwrap().pop_front() {
            return reply;
        }
        if body["password"] != json!(cipher_of(PASSWORD)) {
            return GatewayReply::new(401, "invalid credentials");
        }
        let n = self.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
        GatewayReply::new(
            200,
            json!({"token": format!("tok-{}", n), "responseCode": 0, "message": "OK"}).to_string(),
        )
    }

    fn generate(&self, bearer: Option<&str>, body: &JsonValue) -> GatewayReply {
        if let Some(reply) = self.generate_replies.lock().unwrap().pop_front() {
            return reply;
        }
        if !bearer.map_or(false, |b| b.starts_with("tok-")) {
            return GatewayReply::new(401, "missing bearer token");
        }
        let n = self.qr_issued.fetch_add(1, Ordering::SeqCst) + 1;
        GatewayReply::new(
            200,
            json!({
                "responseCode": 0,
                "message": "QR generated",
                "qrId": format!("QR-{:04}", n),
                "qrImage": QR_IMAGE,
                "transactionId": body["transactionId"],
            })
            .to_string(),
        )
    }
}

impl GatewayTransport for FakeGateway {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<GatewayReply> {
        self.record(RecordedCall {
            method: "GET",
            path: path.to_string(),
            query: query.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            bearer: None,
            body: None,
        });
        if self.unreachable {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(match path {
            ENCRYPT_PATH => self.encrypt(query),
            DECRYPT_PATH => self.decrypt(query),
            _ => GatewayReply::new(404, "not found"),
        })
    }

    fn post_json(&self, path: &str, bearer: Option<&str>, body: &JsonValue) -> Result<GatewayReply> {
        self.record(RecordedCall {
            method: "POST",
            path: path.to_string(),
            query: Vec::new(),
            bearer: bearer.map(str::to_string),
            body: Some(body.clone()),
        });
        if self.unreachable {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(match path {
            AUTHENTICATE_PATH => self.authenticate(body),
            GENERATE_QR_PATH => self.generate(bearer, body),
            _ => GatewayReply::new(404, "not found"),
        })
    }
}
