//! Webhook signature verification for payment processor callbacks.
//!
//! Both supported processors sign the raw request body with HMAC-SHA256.
//! Stripe signs `"{timestamp}.{body}"` and sends `t=...,v1=...` in the
//! `Stripe-Signature` header; Razorpay signs the body alone and sends the
//! hex digest in `X-Razorpay-Signature`.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::CoreError;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a Stripe signature timestamp, in seconds.
pub const STRIPE_TOLERANCE_SECS: i64 = 300;

/// Compute the lowercase hex HMAC-SHA256 of `payload` under `secret`.
pub fn compute_hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex HMAC-SHA256 signature in constant time.
fn verify_hmac_hex(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Some(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Verify a Razorpay `X-Razorpay-Signature` header.
pub fn verify_razorpay_signature(
    secret: &str,
    body: &[u8],
    signature: &str,
) -> Result<(), CoreError> {
    if verify_hmac_hex(secret, body, signature.trim()) {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("Invalid webhook signature".into()))
    }
}

/// Verify a Stripe `Stripe-Signature` header against the raw body.
///
/// Any of the `v1` entries may match. The timestamp must be within
/// [`STRIPE_TOLERANCE_SECS`] of `now_unix`.
pub fn verify_stripe_signature(
    secret: &str,
    body: &[u8],
    header: &str,
    now_unix: i64,
) -> Result<(), CoreError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| CoreError::Unauthorized("Missing timestamp in signature header".into()))?;

    if now_unix.abs_diff(timestamp) > STRIPE_TOLERANCE_SECS.unsigned_abs() {
        return Err(CoreError::Unauthorized(
            "Webhook signature timestamp outside tolerance".into(),
        ));
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(body);

    if candidates
        .iter()
        .any(|sig| verify_hmac_hex(secret, &signed, sig))
    {
        Ok(())
    } else {
        Err(CoreError::Unauthorized("Invalid webhook signature".into()))
    }
}

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string; `None` on odd length or non-hex characters.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    #[test]
    fn razorpay_signature_round_trip() {
        let body = br#"{"event":"payment.captured"}"#;
        let sig = compute_hmac_hex(SECRET, body);
        assert!(verify_razorpay_signature(SECRET, body, &sig).is_ok());
    }

    #[test]
    fn razorpay_signature_rejects_tampered_body() {
        let sig = compute_hmac_hex(SECRET, b"original");
        assert!(verify_razorpay_signature(SECRET, b"tampered", &sig).is_err());
        assert!(verify_razorpay_signature(SECRET, b"original", "zz").is_err());
    }

    #[test]
    fn stripe_signature_accepts_valid_header() {
        let body = br#"{"type":"payment_intent.succeeded"}"#;
        let now = 1_770_000_000;
        let mut signed = format!("{now}.").into_bytes();
        signed.extend_from_slice(body);
        let sig = compute_hmac_hex(SECRET, &signed);
        let header = format!("t={now},v1=deadbeef,v1={sig}");
        assert!(verify_stripe_signature(SECRET, body, &header, now + 10).is_ok());
    }

    #[test]
    fn stripe_signature_rejects_stale_timestamp() {
        let body = b"{}";
        let ts = 1_770_000_000;
        let mut signed = format!("{ts}.").into_bytes();
        signed.extend_from_slice(body);
        let header = format!("t={ts},v1={}", compute_hmac_hex(SECRET, &signed));
        assert!(
            verify_stripe_signature(SECRET, body, &header, ts + STRIPE_TOLERANCE_SECS + 1)
                .is_err()
        );
    }

    #[test]
    fn stripe_signature_requires_timestamp() {
        assert!(verify_stripe_signature(SECRET, b"{}", "v1=abcd", 0).is_err());
    }

    #[test]
    fn stripe_signature_rejects_extreme_timestamps() {
        let now = 1_700_000_000;
        for ts in [i64::MIN, i64::MAX] {
            let header = format!("t={ts},v1=00");
            assert!(matches!(
                verify_stripe_signature(SECRET, b"{}", &header, now),
                Err(CoreError::Unauthorized(msg)) if msg.contains("tolerance")
            ));
        }
    }

    #[test]
    fn hex_decode_rejects_garbage() {
        assert_eq!(hex::decode("0aff"), Some(vec![0x0a, 0xff]));
        assert_eq!(hex::decode("abc"), None);
        assert_eq!(hex::decode("zz"), None);
    }
}
