//! Webhook signature verification.

use {
    base64::{Engine as _, engine::general_purpose::STANDARD as BASE64},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::warn,
};

type HmacSha256 = Hmac<Sha256>;

/// Verify the `X-Line-Signature` header against the raw request body.
///
/// The platform signs the exact body bytes with HMAC-SHA256 keyed by the
/// channel secret and sends the base64 digest in the header. Every failure
/// path collapses to `false`; this function never panics.
pub fn verify_signature(body: &[u8], signature_header: &str, channel_secret: &str) -> bool {
    if signature_header.is_empty() || channel_secret.is_empty() {
        return false;
    }

    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to create HMAC from channel secret");
            return false;
        },
    };

    mac.update(body);
    let computed = BASE64.encode(mac.finalize().into_bytes());

    // Constant-time comparison to prevent timing attacks.
    constant_time_eq(&computed, signature_header)
}

/// Compute the signature the platform would send for `body`.
///
/// Returns `None` when the secret cannot be used as an HMAC key.
pub fn sign(body: &[u8], channel_secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes()).ok()?;
    mac.update(body);
    Some(BASE64.encode(mac.finalize().into_bytes()))
}

/// Constant-time string comparison.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}
