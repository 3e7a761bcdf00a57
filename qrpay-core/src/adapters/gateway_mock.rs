//! Mock bank gateway for testing
//!
//! A small HTTP server that answers the four gateway legs with the same
//! shapes as the real gateway:
//! - GET /api/authentication/encrypt returns a JSON string `"enc(<text>)"`
//! - GET /api/authentication/decrypt strips the `enc(...)` wrapper
//! - POST /api/authentication/authenticate returns `{ token, responseCode }`
//! - POST /api/qrsimple/generateQR returns `{ qrId, qrImage, transactionId, ... }`

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use base64::Engine;
use serde_json::{json, Value as JsonValue};
use url::Url;

use crate::ports::{AUTHENTICATE_PATH, DECRYPT_PATH, ENCRYPT_PATH, GENERATE_QR_PATH};

/// Token prefix handed out by the mock
const TOKEN_PREFIX: &str = "mock-token-";

/// Mock gateway server for testing
pub struct MockGatewayServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

/// Failure switches for the mock
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Encryption endpoint answers 500
    pub fail_encrypt: bool,
    /// Authentication endpoint answers 401
    pub fail_auth: bool,
    /// Authentication succeeds but the body has no token
    pub omit_token: bool,
    /// Issuance endpoint answers 400
    pub fail_generate: bool,
}

impl MockGatewayServer {
    /// Start a new mock server on a random available port
    pub fn start(config: MockConfig) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        let counter = Arc::new(AtomicU64::new(0));

        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let cfg = config.clone();
                        let counter = counter.clone();
                        thread::spawn(move || {
                            handle_connection(stream, &cfg, &counter);
                        });
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    /// Get the base URL for this mock server
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockGatewayServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Server that reads each request and hangs up without answering
///
/// Makes the client fail after the request (URL and query included) has
/// been sent.
pub struct DroppingServer {
    port: u16,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl DroppingServer {
    pub fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        listener.set_nonblocking(true)?;

        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let _ = read_request(&stream);
                        let _ = stream.shutdown(std::net::Shutdown::Both);
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        Ok(Self {
            port,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

impl Drop for DroppingServer {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

struct MockRequest {
    method: String,
    target: String,
    authorization: Option<String>,
    body: String,
}

fn read_request(stream: &TcpStream) -> Option<MockRequest> {
    stream.set_nonblocking(false).ok()?;
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            } else if name == "authorization" {
                authorization = Some(value.to_string());
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    Some(MockRequest {
        method,
        target,
        authorization,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn handle_connection(mut stream: TcpStream, config: &MockConfig, counter: &AtomicU64) {
    let Some(request) = read_request(&stream) else {
        send_response(&mut stream, 400, &json!({"message": "Invalid request"}));
        return;
    };

    let Ok(url) = Url::parse(&format!("http://mock{}", request.target)) else {
        send_response(&mut stream, 400, &json!({"message": "Invalid target"}));
        return;
    };
    let query = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default()
    };

    let (status, body) = match (request.method.as_str(), url.path()) {
        ("GET", ENCRYPT_PATH) => {
            if config.fail_encrypt {
                (500, json!({"message": "encryption unavailable"}))
            } else if query("aesKey").is_empty() {
                (400, json!({"message": "aesKey required"}))
            } else {
                (200, json!(format!("enc({})", query("text"))))
            }
        }
        ("GET", DECRYPT_PATH) => {
            let text = query("text");
            match text.strip_prefix("enc(").and_then(|t| t.strip_suffix(')')) {
                Some(plain) => (200, json!(plain)),
                None => (400, json!({"message": "not a ciphertext"})),
            }
        }
        ("POST", AUTHENTICATE_PATH) => {
            let body: JsonValue = serde_json::from_str(&request.body).unwrap_or_default();
            let password = body["password"].as_str().unwrap_or("");
            if config.fail_auth || !password.starts_with("enc(") {
                (401, json!({"message": "invalid credentials"}))
            } else if config.omit_token {
                (200, json!({"responseCode": 0}))
            } else {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                (200, json!({"token": format!("{}{}", TOKEN_PREFIX, n), "responseCode": 0}))
            }
        }
        ("POST", GENERATE_QR_PATH) => {
            let authorized = request
                .authorization
                .as_deref()
                .is_some_and(|a| a.starts_with(&format!("Bearer {}", TOKEN_PREFIX)));
            let body: JsonValue = serde_json::from_str(&request.body).unwrap_or_default();
            if !authorized {
                (401, json!({"message": "invalid token"}))
            } else if config.fail_generate {
                (400, json!({"message": "transaction rejected"}))
            } else {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let image = base64::engine::general_purpose::STANDARD.encode(b"\x89PNG\r\n\x1a\nmock");
                (
                    200,
                    json!({
                        "responseCode": 0,
                        "message": "OK",
                        "qrId": format!("QR-{:06}", n),
                        "qrImage": image,
                        "transactionId": body["transactionId"],
                    }),
                )
            }
        }
        _ => (404, json!({"message": "Not found"})),
    };

    send_response(&mut stream, status, &body);
}

fn send_response(stream: &mut TcpStream, status: u16, body: &JsonValue) {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let payload = body.to_string();
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
