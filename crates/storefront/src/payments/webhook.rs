//! Webhook signature verification and event decoding.
//!
//! The payment processor signs each webhook delivery with a header of the
//! form `t=<unix-seconds>,v1=<hex hmac>`, where the HMAC-SHA256 is computed
//! over `"{t}.{payload}"` with the endpoint's signing secret. Events are only
//! decoded after the signature and timestamp tolerance check pass.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::PaymentError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum allowed age (or clock skew) of a signed delivery, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event id (e.g., `evt_...`).
    pub id: Option<String>,
    /// Event type (e.g., `checkout.session.completed`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub data: WebhookData,
}

/// The object a webhook event describes.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

/// Verify a delivery's signature and decode the event.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` when the header is malformed,
/// the timestamp is outside tolerance, or no signature matches; returns
/// `PaymentError::Parse` when the verified payload is not a valid event.
pub fn construct_event(
    payload: &str,
    signature_header: &str,
    secret: &str,
) -> Result<WebhookEvent, PaymentError> {
    verify_signature(
        payload,
        signature_header,
        secret,
        Utc::now().timestamp(),
        SIGNATURE_TOLERANCE_SECS,
    )?;
    serde_json::from_str(payload).map_err(|e| PaymentError::Parse(e.to_string()))
}

/// Verify the signature header against the payload.
fn verify_signature(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), PaymentError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".to_string()))?;
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature(
            "missing v1 signature".to_string(),
        ));
    }

    // checked_sub: an adversarial timestamp must not overflow the skew math.
    let skew = now
        .checked_sub(timestamp)
        .map(i64::saturating_abs)
        .unwrap_or(i64::MAX);
    if skew > tolerance_secs {
        return Err(PaymentError::InvalidSignature(
            "timestamp outside tolerance".to_string(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if signatures.iter().any(|s| constant_time_compare(s, &expected)) {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature(
            "no matching signature".to_string(),
        ))
    }
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_9Xk2mQ7vL4pR8nT3";

    fn sign(payload: &str, timestamp: i64, secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(format!("{timestamp}.{payload}").as_bytes());
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn test_valid_signature_accepted() {
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;
        let header = sign(payload, 1_766_000_000, SECRET);
        assert!(verify_signature(payload, &header, SECRET, 1_766_000_000, 300).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let payload = r#"{"amount_total": 158603}"#;
        let header = sign(payload, 1_766_000_000, SECRET);
        let tampered = r#"{"amount_total": 1}"#;
        assert!(verify_signature(tampered, &header, SECRET, 1_766_000_000, 300).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, 1_766_000_000, "whsec_other_4Fq8wZ1j");
        assert!(verify_signature(payload, &header, SECRET, 1_766_000_000, 300).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        let header = sign(payload, 1_766_000_000, SECRET);
        let result = verify_signature(payload, &header, SECRET, 1_766_000_000 + 301, 300);
        assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
    }

    #[test]
    fn test_malformed_header_rejected() {
        let payload = r#"{"id":"evt_1"}"#;
        assert!(verify_signature(payload, "not-a-header", SECRET, 0, 300).is_err());
        assert!(verify_signature(payload, "t=123", SECRET, 123, 300).is_err());
        assert!(verify_signature(payload, "v1=abcd", SECRET, 0, 300).is_err());
    }

    #[test]
    fn test_extreme_timestamp_rejected_without_overflow() {
        let payload = r#"{"id":"evt_1"}"#;
        for t in [i64::MIN, i64::MAX] {
            let header = format!("t={t},v1=abcd");
            let result = verify_signature(payload, &header, SECRET, 1_766_000_000, 300);
            assert!(matches!(result, Err(PaymentError::InvalidSignature(_))));
        }
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc123", "abc123"));
        assert!(!constant_time_compare("abc123", "abc124"));
        assert!(!constant_time_compare("abc123", "abc12"));
        assert!(!constant_time_compare("", "a"));
    }

    #[test]
    fn test_event_decodes_after_verification() {
        let payload = r#"{"id":"evt_42","type":"identity.verification_session.verified","data":{"object":{"metadata":{"user_email":"buyer@example.net"}}}}"#;
        let now = Utc::now().timestamp();
        let header = sign(payload, now, SECRET);
        let event = construct_event(payload, &header, SECRET).expect("event");
        assert_eq!(event.event_type, "identity.verification_session.verified");
        assert_eq!(event.id.as_deref(), Some("evt_42"));
    }
}
