//! # Webhook signatures
//!
//! The payment gateway signs every webhook body with a shared secret. The signature is an HMAC-SHA256 over the raw
//! request body, base64-encoded, and is sent in a request header.
//!
//! The check must run against the *raw* bytes. Re-serialising the parsed JSON would change whitespace and key order
//! and break the signature.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookSignatureError {
    #[error("No signature was provided")]
    Missing,
    #[error("The signature is not valid base64")]
    Malformed,
    #[error("The signature does not match the payload")]
    Mismatch,
    #[error("The signing secret is not usable: {0}")]
    BadSecret(String),
}

/// Calculates the base64-encoded HMAC-SHA256 of `payload`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, WebhookSignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookSignatureError::BadSecret(e.to_string()))?;
    mac.update(payload);
    Ok(base64::encode(mac.finalize().into_bytes()))
}

/// Checks `signature` against `payload`. The comparison is constant-time.
///
/// An empty secret never verifies anything, since anyone can compute an HMAC with an empty key.
pub fn verify_signature(secret: &str, payload: &[u8], signature: Option<&str>) -> Result<(), WebhookSignatureError> {
    if secret.trim().is_empty() {
        return Err(WebhookSignatureError::BadSecret("no webhook secret is configured".into()));
    }
    let signature = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or(WebhookSignatureError::Missing)?;
    let expected = base64::decode(signature).map_err(|_| WebhookSignatureError::Malformed)?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookSignatureError::BadSecret(e.to_string()))?;
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| WebhookSignatureError::Mismatch)
}
