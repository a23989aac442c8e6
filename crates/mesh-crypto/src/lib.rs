//! # Mesh Crypto Crate
//!
//! Envelope signing for routed messages.
//!
//! The router signs every message that clears the gate with HMAC-SHA256 over
//! the triple `(id, source, target)`, keyed with the configured mesh secret.
//! Verification recomputes the MAC and compares in constant time.

pub mod signing;

pub use signing::{sign_envelope, verify_envelope};
