use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto::password::PasswordHasher;
use crate::error::{AppError, Result};
use crate::models::user::{HashedPassword, Identity};

/// Registered identities, keyed by username.
///
/// Cheap to clone; clones share the same map.
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<RwLock<HashMap<String, Identity>>>,
    hasher: PasswordHasher,
    /// Verified against when the username is unknown, so both failure paths
    /// cost one Argon2 run.
    dummy_hash: HashedPassword,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new(hasher: PasswordHasher) -> Result<Self> {
        Self::with_identities(hasher, HashMap::new())
    }

    /// Creates a store seeded with previously persisted identities.
    pub fn with_identities(
        hasher: PasswordHasher,
        identities: HashMap<String, Identity>,
    ) -> Result<Self> {
        let dummy_hash = hasher.hash(&Uuid::new_v4().to_string())?;

        Ok(Self {
            users: Arc::new(RwLock::new(identities)),
            hasher,
            dummy_hash,
        })
    }

    /// Registers a new identity.
    ///
    /// # Arguments
    ///
    /// * `username` - The unique username.
    /// * `first` - The user's first name.
    /// * `last` - The user's last name.
    /// * `password` - The plaintext password; only its hash is kept.
    ///
    /// # Returns
    ///
    /// A `Result` containing the created `Identity`, `DuplicateUsername` if
    /// the name is taken, or `HashingFailure`.
    pub async fn create(
        &self,
        username: &str,
        first: &str,
        last: &str,
        password: &str,
    ) -> Result<Identity> {
        tracing::debug!("🔐 Creating user: {}", username);

        // Skip the expensive hash when the name is obviously taken.
        if self.exists(username) {
            return Err(AppError::DuplicateUsername);
        }

        let password_hash = self.hash_blocking(password).await?;
        let identity = Identity {
            first: first.to_string(),
            last: last.to_string(),
            username: username.to_string(),
            password_hash,
        };

        match self.users.write().entry(identity.username.clone()) {
            Entry::Occupied(_) => return Err(AppError::DuplicateUsername),
            Entry::Vacant(slot) => {
                slot.insert(identity.clone());
            }
        }

        tracing::info!("✅ User created: {}", identity.username);
        Ok(identity)
    }

    /// Checks a username/password pair.
    ///
    /// # Returns
    ///
    /// The matching `Identity`, `UnknownUsername` when no such user exists, or
    /// `InvalidCredentials` when the password is wrong. Callers facing the
    /// network must not tell the two failures apart.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Identity> {
        tracing::debug!("🔐 Authenticating user: {}", username);

        let found = self.find(username);
        let hash = found
            .as_ref()
            .map(|identity| identity.password_hash.clone())
            .unwrap_or_else(|| self.dummy_hash.clone());

        let matches = self.verify_blocking(password, hash).await?;

        match found {
            None => Err(AppError::UnknownUsername),
            Some(_) if !matches => Err(AppError::InvalidCredentials),
            Some(identity) => {
                tracing::info!("✅ User authenticated: {}", identity.username);
                Ok(identity)
            }
        }
    }

    /// Looks up an identity by username.
    pub fn find(&self, username: &str) -> Option<Identity> {
        self.users.read().get(username).cloned()
    }

    pub fn exists(&self, username: &str) -> bool {
        self.users.read().contains_key(username)
    }

    /// Copy of every identity, for persisting.
    pub fn snapshot(&self) -> HashMap<String, Identity> {
        self.users.read().clone()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    async fn hash_blocking(&self, password: &str) -> Result<HashedPassword> {
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::HashingFailure(format!("Hashing task failed: {}", e)))?
    }

    async fn verify_blocking(&self, password: &str, hash: HashedPassword) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = Zeroizing::new(password.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::HashingFailure(format!("Verification task failed: {}", e)))
    }
}
