use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::config::PasswordSettings;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("salt generation failed: {0}")]
    Salt(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Argon2id password hashing + verification.
///
/// Cheap to clone so it can be moved into `spawn_blocking`.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    // Verified against when the user does not exist, so that an unknown
    // username costs the same as a wrong password.
    dummy_hash: String,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl PasswordHasher {
    pub fn new(settings: &PasswordSettings) -> Result<Self, PasswordError> {
        let params = Params::new(
            settings.memory_kib,
            settings.iterations,
            settings.parallelism,
            None,
        )
        .map_err(|e| PasswordError::Params(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("dummy password for unknown users")?;

        Ok(hasher)
    }

    /// Hash a raw password into a PHC string (`$argon2id$v=19$...`).
    ///
    /// Every call uses a fresh random salt.
    pub fn hash(&self, raw_password: &str) -> Result<String, PasswordError> {
        let salt = generate_salt()?;

        self.argon2
            .hash_password(raw_password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| {
                error!(error = %e, "failed to hash password");
                PasswordError::Hash(e.to_string())
            })
    }

    /// Check `raw_password` against a stored PHC string.
    ///
    /// The parameters encoded in `stored_hash` are used, so hashes survive
    /// cost changes. Digest comparison is constant-time (`password_hash::Output`).
    pub fn verify(&self, raw_password: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "stored password hash is not a valid PHC string");
                return false;
            }
        };

        self.argon2
            .verify_password(raw_password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Burn one verification for a login attempt against an unknown user.
    pub fn verify_dummy(&self, raw_password: &str) {
        let _ = self.verify(raw_password, &self.dummy_hash);
    }
}

fn generate_salt() -> Result<SaltString, PasswordError> {
    // 16 bytes of entropy, recommended salt length for Argon2.
    let mut bytes = [0u8; 16];
    getrandom::fill(&mut bytes).map_err(|e| PasswordError::Salt(e.to_string()))?;

    SaltString::encode_b64(&bytes).map_err(|e| PasswordError::Salt(e.to_string()))
}
