use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::SessionPolicy;
use crate::error::{AppError, Result};
use crate::models::session::{Session, SessionToken};

/// How many fresh tokens `issue` tries before giving up.
const MAX_ISSUE_ATTEMPTS: usize = 8;

/// Produces candidate session tokens.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> SessionToken;
}

/// Random UUID v4 tokens from the OS RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTokenSource;

impl TokenSource for UuidTokenSource {
    fn next_token(&self) -> SessionToken {
        SessionToken::random()
    }
}

/// Live sessions, keyed by token.
///
/// Owns the expiration policy. Every mutation is a single map operation under
/// one write-lock acquisition, so dropping a caller mid-request never leaves a
/// half-written session behind.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<SessionToken, Session>>>,
    tokens: Arc<dyn TokenSource>,
    policy: SessionPolicy,
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        Self::with_token_source(policy, Arc::new(UuidTokenSource))
    }

    pub fn with_token_source(policy: SessionPolicy, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            tokens,
            policy,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Starts a session for `username` and returns its token.
    pub fn issue(&self, username: &str) -> Result<SessionToken> {
        self.issue_at(username, Utc::now())
    }

    /// Like [`SessionStore::issue`], with an explicit clock reading.
    ///
    /// A candidate token that is already live is discarded and a new one
    /// drawn; an existing session is never overwritten.
    pub fn issue_at(&self, username: &str, now: DateTime<Utc>) -> Result<SessionToken> {
        let expires_at = now
            .checked_add_signed(self.policy.max_lifetime)
            .ok_or_else(|| {
                AppError::Internal("Session lifetime overflows the expiry timestamp".to_string())
            })?;

        for attempt in 1..=MAX_ISSUE_ATTEMPTS {
            let token = self.tokens.next_token();
            let session = Session {
                token,
                username: username.to_string(),
                created_at: now,
                last_access: now,
                expires_at,
            };

            match self.insert_new(session) {
                Ok(()) => {
                    tracing::info!("✅ Session issued for {}: {:?}", username, token);
                    return Ok(token);
                }
                Err(AppError::TokenGenerationCollision) => {
                    tracing::warn!("Session token collision on attempt {}, retrying", attempt);
                }
                Err(other) => return Err(other),
            }
        }

        Err(AppError::Internal(format!(
            "No unique session token after {} attempts",
            MAX_ISSUE_ATTEMPTS
        )))
    }

    /// Looks up a live session and refreshes its last-access time.
    pub fn resolve(&self, token: &SessionToken) -> Result<Session> {
        self.resolve_at(token, Utc::now())
    }

    /// Like [`SessionStore::resolve`], with an explicit clock reading.
    ///
    /// An expired session is removed on the spot.
    pub fn resolve_at(&self, token: &SessionToken, now: DateTime<Utc>) -> Result<Session> {
        let mut sessions = self.sessions.write();

        let Some(session) = sessions.get_mut(token) else {
            tracing::debug!("No session for {:?}", token);
            return Err(AppError::NoSuchSession);
        };

        if session.is_expired_at(now, self.policy.idle_timeout) {
            tracing::debug!("Session expired for {}: {:?}", session.username, token);
            sessions.remove(token);
            return Err(AppError::SessionExpired);
        }

        session.last_access = now;
        Ok(session.clone())
    }

    /// Ends a session. Revoking an unknown token is not an error.
    pub fn revoke(&self, token: &SessionToken) {
        if let Some(session) = self.sessions.write().remove(token) {
            tracing::info!("✅ Session revoked for {}: {:?}", session.username, token);
        }
    }

    /// Drops every session that is expired at `now`.
    ///
    /// # Returns
    ///
    /// The number of sessions removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let idle_timeout = self.policy.idle_timeout;
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired_at(now, idle_timeout));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn insert_new(&self, session: Session) -> Result<()> {
        match self.sessions.write().entry(session.token) {
            Entry::Occupied(_) => Err(AppError::TokenGenerationCollision),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }
}
