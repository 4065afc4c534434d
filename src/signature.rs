//! Webhook signature verification (`X-Hub-Signature-256`).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Computes the raw HMAC-SHA256 of `payload` keyed with `secret`.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a header value: `sha256=<lowercase hex>`.
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(signature))
}

/// Verifies `signature_header` against the HMAC-SHA256 of `payload`.
///
/// The header must be exactly `sha256=` followed by the lowercase hex digest,
/// so any change to the header text fails. Never panics; a key the MAC
/// rejects is logged and treated as a failed validation.
pub fn verify_signature(secret: &str, payload: &[u8], signature_header: &str) -> bool {
    let Some(received_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    if !received_hex
        .bytes()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
    {
        return false;
    }

    let received = match hex::decode(received_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(e) => {
            error!("Signature validation failure: {}", e);
            return false;
        }
    };
    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&received).is_ok()
}
