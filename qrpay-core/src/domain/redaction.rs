//! Redaction of gateway payloads before they are logged
//!
//! Every payload headed for the audit trail goes through [`redact_request`] or
//! [`redact_response`]. Both work on a copy, so the caller's value is left
//! intact for the actual request.

use serde_json::{Map, Value as JsonValue};
use sha2::{Digest, Sha256};

use super::audit::GatewayLeg;

/// Placeholder for values that must never be logged
pub const REDACTED: &str = "***REDACTED***";

/// Keys whose values are secrets wherever they appear
const SENSITIVE_KEYS: &[&str] = &["password", "text", "accountCredit", "token", "aesKey"];

/// Key holding the base64 QR image in issuance responses
const IMAGE_KEY: &str = "qrImage";

/// Visible prefix length for ciphertexts
const CIPHERTEXT_PREFIX: usize = 8;

/// Redact an outgoing request payload for the given leg
pub fn redact_request(_leg: GatewayLeg, payload: &JsonValue) -> JsonValue {
    redact_value(payload)
}

/// Redact a gateway response for the given leg
///
/// Encrypt returns a bare ciphertext, shown truncated. Decrypt returns
/// plaintext, hidden completely. Object responses have their sensitive keys
/// replaced and the QR image reduced to a size marker.
pub fn redact_response(leg: GatewayLeg, payload: &JsonValue) -> JsonValue {
    match (leg, payload) {
        (GatewayLeg::Encrypt, JsonValue::String(ciphertext)) => {
            JsonValue::String(truncate_ciphertext(ciphertext))
        }
        (GatewayLeg::Decrypt, JsonValue::String(_)) => JsonValue::String(REDACTED.to_string()),
        _ => redact_value(payload),
    }
}

fn redact_value(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => {
            let redacted: Map<String, JsonValue> = map
                .iter()
                .map(|(key, v)| (key.clone(), redact_field(key, v)))
                .collect();
            JsonValue::Object(redacted)
        }
        JsonValue::Array(items) => JsonValue::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

fn redact_field(key: &str, value: &JsonValue) -> JsonValue {
    if key == IMAGE_KEY {
        return match value {
            JsonValue::String(image) => JsonValue::String(image_marker(image.len())),
            JsonValue::Null => JsonValue::Null,
            _ => JsonValue::String(REDACTED.to_string()),
        };
    }
    if SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key)) {
        return match value {
            JsonValue::Null => JsonValue::Null,
            _ => JsonValue::String(REDACTED.to_string()),
        };
    }
    redact_value(value)
}

/// Size marker standing in for a base64 image
pub fn image_marker(len: usize) -> String {
    format!("<{} bytes>", len)
}

/// Show only the first few characters of a ciphertext
pub fn truncate_ciphertext(ciphertext: &str) -> String {
    let total = ciphertext.chars().count();
    let visible = CIPHERTEXT_PREFIX.min(total / 2);
    let prefix: String = ciphertext.chars().take(visible).collect();
    format!("{}…", prefix)
}

/// Short SHA-256 fingerprint of a key, safe to log
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("sha256:{}", &hex::encode(digest)[..12])
}

/// Mask all but the last four characters
pub fn mask_tail(value: &str) -> String {
    let total = value.chars().count();
    if total <= 4 {
        return "*".repeat(total);
    }
    let tail: String = value.chars().skip(total - 4).collect();
    format!("{}{}", "*".repeat(total - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_authenticate_request_hides_password() {
        let payload = json!({"userName": "1649710", "password": "Zm9vYmFyYmF6cXV4"});
        let redacted = redact_request(GatewayLeg::Authenticate, &payload);
        assert_eq!(redacted["userName"], "1649710");
        assert_eq!(redacted["password"], REDACTED);
        // the original is untouched
        assert_eq!(payload["password"], "Zm9vYmFyYmF6cXV4");
    }

    #[test]
    fn test_qr_response_image_becomes_marker() {
        let payload = json!({"qrId": "QR-1", "qrImage": "iVBORw0KGgoAAAANSUhEUg=="});
        let redacted = redact_response(GatewayLeg::GenerateQr, &payload);
        assert_eq!(redacted["qrId"], "QR-1");
        assert_eq!(redacted["qrImage"], "<24 bytes>");
    }

    #[test]
    fn test_nested_sensitive_keys() {
        let payload = json!({"data": [{"token": "abc"}], "responseCode": 0});
        let redacted = redact_response(GatewayLeg::Authenticate, &payload);
        assert_eq!(redacted["data"][0]["token"], REDACTED);
        assert_eq!(redacted["responseCode"], 0);
    }

    #[test]
    fn test_encrypt_and_decrypt_responses() {
        let cipher = json!("q1w2e3r4t5y6u7i8o9p0");
        assert_eq!(redact_response(GatewayLeg::Encrypt, &cipher), json!("q1w2e3r4…"));

        let plain = json!("1041070599");
        assert_eq!(redact_response(GatewayLeg::Decrypt, &plain), json!(REDACTED));
    }

    #[test]
    fn test_short_ciphertext_never_shown_whole() {
        assert_eq!(truncate_ciphertext("abcd"), "ab…");
        assert_eq!(truncate_ciphertext(""), "…");
    }

    #[test]
    fn test_mask_tail() {
        assert_eq!(mask_tail("1041070599"), "******0599");
        assert_eq!(mask_tail("123"), "***");
    }

    #[test]
    fn test_key_fingerprint_is_stable_and_hides_key() {
        let key = "6F09E3167E1D40829207B01041A65B12";
        let fp = key_fingerprint(key);
        assert_eq!(fp, key_fingerprint(key));
        assert!(fp.starts_with("sha256:"));
        assert_eq!(fp.len(), "sha256:".len() + 12);
        assert!(!fp.contains(key));
    }
}
