//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// The first four variants are the gateway failure taxonomy. Each aborts the
/// current call and carries whatever the gateway said back, so callers can
/// tell a rejected request from a network problem.
#[derive(Error, Debug)]
pub enum Error {
    /// Encryption or decryption endpoint rejected the request
    #[error("Encryption failed: HTTP {status} - {body}")]
    Encryption { status: u16, body: String },

    /// Authentication endpoint rejected the credentials or returned no token
    #[error("Authentication failed: HTTP {status} - {body}")]
    Authentication { status: u16, body: String },

    /// QR issuance endpoint rejected the request
    #[error("QR generation failed: HTTP {status} - {body}")]
    QrGeneration { status: u16, body: String },

    /// Network or connection level failure, no gateway response
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status reported by the gateway, if this error came from one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Encryption { status, .. }
            | Self::Authentication { status, .. }
            | Self::QrGeneration { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the gateway rejected the bearer token
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::QrGeneration { status: 401, .. })
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Create a failed result with context
    pub fn fail_with_context(
        error: impl Into<String>,
        context: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: Some(context),
        }
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let mut context = HashMap::new();
                if let Some(status) = e.status() {
                    context.insert("status".to_string(), serde_json::json!(status));
                }
                if context.is_empty() {
                    Self::fail(e.to_string())
                } else {
                    Self::fail_with_context(e.to_string(), context)
                }
            }
        }
    }
}
