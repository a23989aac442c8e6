//! # Envelope Signing
//!
//! HMAC-SHA256 over the UTF-8 string `"{id}:{source}:{target}"`.
//!
//! ## Scope
//!
//! The signature deliberately covers only the envelope triple, not the
//! payload: it authenticates who a message is from and where it is going,
//! and tampering with content after signing is NOT detectable.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn envelope_string(id: Uuid, source: &str, target: &str) -> String {
    format!("{id}:{source}:{target}")
}

/// Sign an envelope triple, returning the hex signature string.
#[must_use]
pub fn sign_envelope(secret: &[u8], id: Uuid, source: &str, target: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(envelope_string(id, source, target).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify an envelope signature.
///
/// Recomputes the MAC and compares in constant time via `Mac::verify_slice`.
/// Returns `false` for a mismatch or a malformed signature string; never
/// errors.
#[must_use]
pub fn verify_envelope(secret: &[u8], id: Uuid, source: &str, target: &str, signature: &str) -> bool {
    let Ok(signature_bytes) = hex::decode(signature) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(envelope_string(id, source, target).as_bytes());
    mac.verify_slice(&signature_bytes).is_ok()
}
