// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Green Karma

//! Email canonicalization, key derivation and password hashing.
//!
//! The account document key is the UUIDv5 of the canonicalized email, so
//! registration is idempotent per email address regardless of casing or
//! Unicode presentation, and the store's existence-guarded write is the
//! only duplicate check needed.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// NFKC-normalize, trim and lowercase an email address.
pub fn canonicalize_email(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}

/// Derive the stable account key from a canonical email.
pub fn user_key_for_email(canonical_email: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, canonical_email.as_bytes()).to_string()
}

/// Random per-account salt.
pub fn generate_salt() -> String {
    Uuid::new_v4().to_string()
}

/// Salted HMAC-SHA256 password hash, base64-encoded.
pub fn hash_password(salt: &str, password: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(password.as_bytes());
    Base64::encode_string(&mac.finalize().into_bytes())
}

/// Constant-time password check against the stored hash.
pub fn verify_password(salt: &str, password: &str, stored_hash: &str) -> bool {
    let Ok(expected) = Base64::decode_vec(stored_hash) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(salt.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(password.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
