use std::collections::HashMap;

use crate::config::Config;
use crate::crypto::password::PasswordHasher;
use crate::error::Result;
use crate::models::user::Identity;
use crate::repositories::session::SessionStore;
use crate::repositories::user::CredentialStore;
use crate::services::auth::SessionManager;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Config,
    /// Signup, login and session resolution.
    pub auth: SessionManager,
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    /// * `identities` - Previously persisted users, keyed by username.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub fn new(config: &Config, identities: HashMap<String, Identity>) -> Result<Self> {
        let hasher = PasswordHasher::new(&config.hashing)?;
        tracing::info!(
            "✅ Argon2id hasher ready (m={} KiB, t={}, p={})",
            config.hashing.memory_kib,
            config.hashing.iterations,
            config.hashing.parallelism
        );

        let credentials = CredentialStore::with_identities(hasher, identities)?;
        tracing::info!("✅ Credential store initialized with {} users", credentials.len());

        let sessions = SessionStore::new(config.session.clone());
        tracing::info!(
            "✅ Session store initialized (idle timeout {}s, lifetime {}s)",
            config.session.idle_timeout.num_seconds(),
            config.session.max_lifetime.num_seconds()
        );

        Ok(AppState {
            config: config.clone(),
            auth: SessionManager::new(credentials, sessions),
        })
    }
}
