use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString},
};
use rand::{RngCore, rngs::OsRng};

use crate::config::HashingParams;
use crate::error::{AppError, Result};
use crate::models::user::HashedPassword;

/// The salt length in bytes.
const SALT_LEN: usize = 16;

/// One-way Argon2id hashing for passwords.
///
/// Hashes are self-describing PHC strings, so verification always uses the
/// parameters a hash was created with, even after the configured cost changes.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    #[cfg(test)]
    verifications: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl PasswordHasher {
    /// Creates a hasher with the given cost.
    ///
    /// # Arguments
    ///
    /// * `params` - Memory, iteration and parallelism cost.
    ///
    /// # Returns
    ///
    /// A `Result` containing the hasher, or `HashingFailure` when Argon2
    /// rejects the parameters.
    pub fn new(params: &HashingParams) -> Result<Self> {
        let params = Params::new(params.memory_kib, params.iterations, params.parallelism, None)
            .map_err(|e| AppError::HashingFailure(format!("Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            #[cfg(test)]
            verifications: Default::default(),
        })
    }

    /// Hashes a password with a fresh random salt.
    ///
    /// # Arguments
    ///
    /// * `password` - The password to hash.
    ///
    /// # Returns
    ///
    /// A `Result` containing the hashed password.
    pub fn hash(&self, password: &str) -> Result<HashedPassword> {
        let mut salt_bytes = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|e| AppError::HashingFailure(format!("Failed to generate salt: {}", e)))?;

        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::HashingFailure(format!("Salt encoding error: {}", e)))?;

        let phc = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::HashingFailure(format!("Argon2 hash error: {}", e)))?
            .to_string();

        tracing::debug!("Password hashed successfully with Argon2");
        Ok(HashedPassword::from_phc(phc))
    }

    /// Verifies a password against a stored hash.
    ///
    /// A malformed hash never matches.
    pub fn verify(&self, password: &str, hash: &HashedPassword) -> bool {
        let parsed = match PasswordHash::new(hash.as_phc()) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        #[cfg(test)]
        self.verifications
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        self.argon2
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// How many Argon2 verifications this hasher and its clones have run.
    #[cfg(test)]
    pub(crate) fn verification_count(&self) -> usize {
        self.verifications.load(std::sync::atomic::Ordering::SeqCst)
    }
}
