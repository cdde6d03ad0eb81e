//! Credential primitives: password hashing and API-key generation.
//!
//! Both are pluggable so the algorithm can be upgraded without changing the
//! shape of [`crate::User`].

use argon2::password_hash::rand_core::OsRng as SaltRng;
use argon2::password_hash::{PasswordHash as PhcString, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use gatehouse_core::{AccessError, AccessResult};

/// Salted password hash in an encoded (PHC) form. Never holds clear text.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_encoded(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Password hashing primitive.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> AccessResult<PasswordHash>;

    /// Must compare in constant time with respect to the candidate.
    fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool;
}

/// Argon2id hasher with a random per-password salt.
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Minimal work factor. Only meant for tests and simulations.
    pub fn low_cost() -> Self {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap_or_default();
        Self::new(params)
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> AccessResult<PasswordHash> {
        let salt = SaltString::generate(&mut SaltRng);
        let encoded = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| AccessError::storage(format!("password hashing failed: {e}")))?
            .to_string();
        Ok(PasswordHash(encoded))
    }

    fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        let Ok(parsed) = PhcString::new(hash.as_encoded()) else {
            tracing::warn!("stored password hash is not a valid PHC string");
            return false;
        };
        self.argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Opaque bearer token owned by exactly one user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against a presented token.
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

impl core::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Source of API-key tokens.
pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> ApiKey;
}

/// 256-bit tokens from the operating system CSPRNG, upper-case hex.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRngTokenGenerator;

impl TokenGenerator for OsRngTokenGenerator {
    fn generate(&self) -> ApiKey {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        ApiKey(hex::encode_upper(bytes))
    }
}

/// Length leaks; content does not.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
