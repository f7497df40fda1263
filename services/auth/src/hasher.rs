//! Password hashing and verification
//!
//! New hashes are bcrypt texts (`$2b$<cost>$<salt+digest>`) wrapped in
//! base64 so they fit the binary hash column. Verification accepts either
//! the wrapped form or the raw text, and also understands Argon2 PHC strings
//! left behind by the previous hashing scheme.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use base64ct::{Base64, Encoding};
use std::sync::Arc;
use thiserror::Error;
use tracing::error;

/// Work factor used when none is configured
pub const DEFAULT_WORK_FACTOR: u32 = 10;

/// Lowest and highest costs bcrypt accepts
pub const MIN_WORK_FACTOR: u32 = 4;
pub const MAX_WORK_FACTOR: u32 = 31;

#[derive(Error, Debug)]
pub enum HashError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("Hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way password hashing contract
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hash `plaintext` and return it in the storage encoding
    fn hash(&self, plaintext: &str, work_factor: u32) -> Result<String, HashError>;

    /// Check `plaintext` against a stored value. Malformed values yield `false`.
    fn verify(&self, plaintext: &str, stored: &str) -> bool;
}

/// bcrypt-backed [`PasswordHasher`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BcryptHasher;

impl BcryptHasher {
    /// Raw bcrypt text, without the storage wrapping
    pub fn hash_text(plaintext: &str, work_factor: u32) -> Result<String, HashError> {
        if plaintext.is_empty() {
            return Err(HashError::InvalidInput("password must not be empty".to_string()));
        }
        if !(MIN_WORK_FACTOR..=MAX_WORK_FACTOR).contains(&work_factor) {
            return Err(HashError::InvalidInput(format!(
                "work factor {} outside {}..={}",
                work_factor, MIN_WORK_FACTOR, MAX_WORK_FACTOR
            )));
        }

        Ok(bcrypt::hash(plaintext, work_factor)?)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str, work_factor: u32) -> Result<String, HashError> {
        let text = Self::hash_text(plaintext, work_factor)?;
        Ok(encode_for_storage(&text))
    }

    fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let stored = stored.trim();
        if stored.is_empty() {
            return false;
        }

        let text = decode_stored(stored);
        if text.starts_with("$argon2") {
            return PasswordHash::new(&text)
                .map(|parsed| {
                    Argon2::default()
                        .verify_password(plaintext.as_bytes(), &parsed)
                        .is_ok()
                })
                .unwrap_or(false);
        }

        bcrypt::verify(plaintext, &text).unwrap_or(false)
    }
}

/// Base64 of the UTF-8 bytes of a hash text
pub fn encode_for_storage(hash_text: &str) -> String {
    Base64::encode_string(hash_text.as_bytes())
}

/// Unwrap the storage encoding, falling back to the input when it is not
/// base64 of valid UTF-8.
pub fn decode_stored(stored: &str) -> String {
    Base64::decode_vec(stored)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| stored.to_string())
}

/// Salt and digest of a well-formed bcrypt text no account is stored with
const DECOY_SALT_AND_DIGEST: &str = "N9qo8uLOickgx2ZMRZoMyeIjZAgcfl7p92ldGxad68LJZdL17lhWy";

/// Storage-encoded bcrypt value at `work_factor`, verified in place of a
/// missing account so unknown usernames cost as much as known ones.
pub fn decoy_hash(work_factor: u32) -> String {
    encode_for_storage(&format!(
        "$2b${:02}${}",
        work_factor, DECOY_SALT_AND_DIGEST
    ))
}

/// Hash on the blocking pool, for callers on an async worker
pub async fn hash_blocking(
    hasher: Arc<dyn PasswordHasher>,
    plaintext: String,
    work_factor: u32,
) -> Result<String, HashError> {
    tokio::task::spawn_blocking(move || hasher.hash(&plaintext, work_factor)).await?
}

/// Run verification on the blocking pool; bcrypt at realistic costs takes
/// tens of milliseconds and must not stall the async workers.
pub async fn verify_blocking(
    hasher: Arc<dyn PasswordHasher>,
    plaintext: String,
    stored: String,
) -> bool {
    match tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &stored)).await {
        Ok(matched) => matched,
        Err(e) => {
            error!("Password verification task failed: {}", e);
            false
        }
    }
}
