//! Cryptographic utilities for Telegram init data verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute raw HMAC-SHA256 of `message` under `key`.
///
/// # Panics
///
/// Never in practice: HMAC accepts keys of any size (RFC 2104).
#[must_use]
pub fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; 32] {
    // INVARIANT: `new_from_slice` only fails for fixed-size-key MACs.
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key size");
    mac.update(message);

    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

/// Compute HMAC-SHA256 and return the hex-encoded result (64 characters).
#[must_use]
pub fn hmac_sha256_hex(key: &[u8], message: &str) -> String {
    hex::encode(hmac_sha256(key, message.as_bytes()))
}

/// Constant-time string comparison to prevent timing attacks.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}
