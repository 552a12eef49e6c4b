//! Password hashing and verification.
//!
//! New hashes are Argon2id PHC strings. Stored bcrypt hashes (`$2a$`, `$2b$`,
//! `$2y$`) written by older tooling are still accepted on verification.

use std::sync::OnceLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{AuthError, AuthResult};

/// Hash format of a stored password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2,
    Bcrypt,
    Unknown,
}

impl HashScheme {
    pub fn detect(hash: &str) -> Self {
        if hash.starts_with("$argon2") {
            Self::Argon2
        } else if ["$2a$", "$2b$", "$2y$"].iter().any(|p| hash.starts_with(p)) {
            Self::Bcrypt
        } else {
            Self::Unknown
        }
    }
}

/// Hashes a password with Argon2id and a random salt.
pub fn hash_password(password: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::internal(format!("failed to hash password: {e}")))
}

/// Checks a password against a stored hash. Malformed or unrecognised hashes never match.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match HashScheme::detect(stored) {
        HashScheme::Argon2 => PasswordHash::new(stored)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false),
        HashScheme::Bcrypt => bcrypt::verify(password, stored).unwrap_or(false),
        HashScheme::Unknown => {
            tracing::warn!("stored password hash has an unrecognised format");
            false
        }
    }
}

/// Verifies on the blocking pool; hashing is CPU-bound.
pub async fn verify_password_blocking(password: String, stored: String) -> AuthResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| AuthError::internal(format!("password verification task failed: {e}")))
}

/// A real Argon2id hash of a throwaway secret.
///
/// Verified against when the identifier is unknown so that branch costs the
/// same as a wrong password.
pub fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password("tumiki-dummy-password")
            .unwrap_or_else(|_| "$argon2id$v=19$m=19456,t=2,p=1$invalid".to_string())
    })
}
