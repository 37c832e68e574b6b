//! GitHub webhook signature verification using HMAC-SHA1.
//!
//! GitHub signs webhook payloads with the shared secret configured on the hook.
//! The signature arrives in the `X-Hub-Signature` header as `sha1=<hex>`.
//!
//! Verification runs on the raw buffered body before anything is parsed; the
//! same bytes are then handed to the event router.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use thiserror::Error;

type HmacSha1 = Hmac<Sha1>;

/// Length in bytes of an HMAC-SHA1 digest.
pub const SIGNATURE_LEN: usize = 20;

/// Why a delivery failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// A secret is configured but the request carried no signature header.
    #[error("missing signature header")]
    Missing,

    /// The header was malformed or the digest did not match.
    #[error("signature mismatch")]
    Mismatch,
}

/// Result of checking a delivery whose signature was not rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The signature matched the configured secret.
    Verified,
    /// No secret is configured, so nothing was checked.
    Skipped,
}

/// Parses a signature header (e.g. "sha1=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers (missing prefix, invalid hex, etc.).
///
/// # Examples
///
/// ```
/// use review_relay::webhooks::parse_signature_header;
///
/// assert!(parse_signature_header("sha1=abcd1234").is_some());
/// assert!(parse_signature_header("abcd1234").is_none());
/// assert!(parse_signature_header("sha256=abcd1234").is_none());
/// assert!(parse_signature_header("sha1=xyz").is_none());
/// ```
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha1=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA1 signature of a payload using the given secret.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    match HmacSha1::new_from_slice(secret) {
        Ok(mut mac) => {
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
        // HMAC takes keys of any length
        Err(_) => Vec::new(),
    }
}

/// Formats a signature as a header value, `sha1=<hex>`.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha1={}", hex::encode(signature))
}

/// Verifies a webhook signature against the payload and secret.
///
/// Uses constant-time comparison via [`Mac::verify_slice`].
///
/// # Examples
///
/// ```
/// use review_relay::webhooks::{compute_signature, format_signature_header, verify_signature};
///
/// let payload = b"Hello, World!";
/// let header = format_signature_header(&compute_signature(payload, b"my-secret-key"));
///
/// assert!(verify_signature(payload, &header, b"my-secret-key"));
/// assert!(!verify_signature(payload, &header, b"wrong-secret"));
/// ```
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected_signature = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha1::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&expected_signature).is_ok()
}

/// Checks a delivery against an optional secret.
///
/// With no secret configured every delivery is accepted as [`Verification::Skipped`];
/// the missing secret is reported once at startup rather than per request.
pub fn check_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&[u8]>,
) -> Result<Verification, SignatureError> {
    let Some(secret) = secret else {
        return Ok(Verification::Skipped);
    };
    let header = signature_header.ok_or(SignatureError::Missing)?;
    if verify_signature(payload, header, secret) {
        Ok(Verification::Verified)
    } else {
        Err(SignatureError::Mismatch)
    }
}
