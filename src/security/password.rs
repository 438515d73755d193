//! Password key derivation and secret generation.
//!
//! Credentials are stored as a fixed-length Argon2id derived key, computed
//! from the password concatenated with a process-wide pepper and a per-user
//! random salt. Verification is always recompute-and-compare.

use anyhow::Result;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::config::SecurityConfig;

/// Length of the derived key in bytes (hex-encoded to 64 chars for storage).
pub const DERIVED_KEY_LEN: usize = 32;

/// Length of the generated recovery password.
pub const RECOVERY_PASSWORD_LEN: usize = 16;

/// Derive the storable key for a password.
///
/// Deterministic for the same `(password, salt, pepper, params)` tuple. The
/// salt is the user's stored hex string; its bytes are fed to the KDF as-is.
pub fn derive_key(
    password: &str,
    salt: &str,
    pepper: &str,
    config: &SecurityConfig,
) -> Result<String> {
    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        Some(DERIVED_KEY_LEN),
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let peppered = format!("{password}{pepper}");
    let mut out = [0u8; DERIVED_KEY_LEN];
    argon2
        .hash_password_into(peppered.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| anyhow::anyhow!("Key derivation failed: {e}"))?;

    Ok(hex_encode(&out))
}

/// Constant-time equality for derived keys and session tokens. Never use
/// `==` on secrets in request guards.
#[must_use]
pub fn secrets_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Random per-user salt (16 bytes, hex-encoded).
#[must_use]
pub fn generate_salt() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    hex_encode(&bytes)
}

/// Random alphanumeric recovery password issued at registration and rotated
/// on every reset.
#[must_use]
pub fn generate_recovery_password() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(RECOVERY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Opaque per-session action token (64-char hex string) issued at login.
#[must_use]
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex_encode(&bytes)
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes
        .iter()
        .fold(String::with_capacity(bytes.len() * 2), |mut acc, b| {
            use std::fmt::Write;
            let _ = write!(acc, "{b:02x}");
            acc
        })
}
