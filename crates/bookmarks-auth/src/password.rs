//! Password hashing

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use tracing::debug;

use crate::error::AuthError;

/// Default Argon2 time cost (iterations)
pub const DEFAULT_HASH_COST: u32 = 2;

/// One-way adaptive hashing of plaintext passwords (Argon2id)
///
/// Every call to [`CredentialHasher::hash`] embeds a fresh random salt, so two
/// hashes of the same password differ while both still verify.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hash of a throwaway password, verified against when the account is unknown
    dummy_hash: String,
}

impl CredentialHasher {
    /// Build a hasher with the given time cost
    ///
    /// Fails with [`AuthError::Configuration`] when the primitive rejects the
    /// cost, so a bad value is caught at startup rather than on a request.
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        let params = Params::new(Params::DEFAULT_M_COST, cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| AuthError::Configuration(format!("invalid hash cost {}: {}", cost, e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut hasher = Self {
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher
            .hash("timing-equalization-placeholder")
            .map_err(|e| AuthError::Configuration(e.to_string()))?;

        debug!("Credential hasher ready (argon2id, t_cost={})", cost);
        Ok(hasher)
    }

    /// Hash a plaintext password
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::PasswordHash(e.to_string()))
    }

    /// Check a plaintext password against a stored hash
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, plaintext: &str, hashed: &str) -> bool {
        PasswordHash::new(hashed)
            .map(|hash| self.argon2.verify_password(plaintext.as_bytes(), &hash).is_ok())
            .unwrap_or(false)
    }

    /// Spend the same work as a real verification and report failure
    ///
    /// Used when no account matches, so response time does not reveal
    /// whether an email is registered.
    pub fn verify_absent(&self, plaintext: &str) -> bool {
        let _ = self.verify(plaintext, &self.dummy_hash);
        false
    }
}
