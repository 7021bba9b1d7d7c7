use chrono::Utc;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::session::SessionToken;
use crate::models::user::{CurrentUser, Identity, Profile};
use crate::repositories::session::SessionStore;
use crate::repositories::user::CredentialStore;

/// A freshly minted session, ready for the transport to put in a cookie.
#[derive(Debug, Clone, Copy)]
pub struct IssuedSession {
    pub token: SessionToken,
    /// How long the cookie should live.
    pub ttl: chrono::Duration,
}

/// Data submitted by the signup form.
pub struct NewAccount<'a> {
    pub first: &'a str,
    pub last: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub password_confirmation: &'a str,
}

/// Runs signup, login, logout and per-request session resolution.
///
/// Works on plain tokens only: extracting them from requests and writing
/// cookies is the transport's job.
#[derive(Clone)]
pub struct SessionManager {
    credentials: CredentialStore,
    sessions: SessionStore,
}

impl SessionManager {
    pub fn new(credentials: CredentialStore, sessions: SessionStore) -> Self {
        Self {
            credentials,
            sessions,
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Registers a new identity and logs it in.
    ///
    /// # Returns
    ///
    /// The issued session, or `PasswordMismatch`, `DuplicateUsername` or
    /// `HashingFailure`.
    pub async fn signup(&self, account: NewAccount<'_>) -> Result<IssuedSession> {
        let same = account
            .password
            .as_bytes()
            .ct_eq(account.password_confirmation.as_bytes());
        if !bool::from(same) {
            return Err(AppError::PasswordMismatch);
        }

        let identity = self
            .credentials
            .create(account.username, account.first, account.last, account.password)
            .await?;

        tracing::info!("✅ User registered: {}", identity.username);
        self.start_session(&identity)
    }

    /// Checks credentials and starts a session.
    ///
    /// Unknown usernames and wrong passwords both come back as
    /// `InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession> {
        let identity = match self.credentials.verify(username, password).await {
            Ok(identity) => identity,
            Err(AppError::UnknownUsername | AppError::InvalidCredentials) => {
                tracing::warn!("❌ Login failed for: {}", username);
                return Err(AppError::InvalidCredentials);
            }
            Err(other) => return Err(other),
        };

        tracing::info!("✅ User logged in: {}", identity.username);
        self.start_session(&identity)
    }

    /// Ends the caller's session, if there is one.
    pub fn logout(&self, token: Option<&SessionToken>) {
        match token {
            Some(token) => self.sessions.revoke(token),
            None => tracing::debug!("Logout without a session cookie"),
        }
    }

    /// Works out who is making the request.
    ///
    /// Missing, unknown and expired sessions all resolve to
    /// [`CurrentUser::Anonymous`].
    pub fn resolve_current_user(&self, token: Option<&SessionToken>) -> CurrentUser {
        match self.require_user(token) {
            Ok(profile) => CurrentUser::Authenticated(profile),
            Err(_) => CurrentUser::Anonymous,
        }
    }

    /// Like [`SessionManager::resolve_current_user`], but keeps the reason a
    /// caller is anonymous so protected routes can redirect.
    pub fn require_user(&self, token: Option<&SessionToken>) -> Result<Profile> {
        let token = token.ok_or(AppError::NoSuchSession)?;
        let session = self.sessions.resolve(token)?;

        match self.credentials.find(&session.username) {
            Some(identity) => Ok(identity.profile()),
            None => {
                tracing::warn!(
                    "Session {:?} points at missing user {}, revoking",
                    token,
                    session.username
                );
                self.sessions.revoke(token);
                Err(AppError::NoSuchSession)
            }
        }
    }

    /// Drops expired sessions. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.sessions.sweep(Utc::now())
    }

    fn start_session(&self, identity: &Identity) -> Result<IssuedSession> {
        let token = self.sessions.issue(&identity.username)?;
        Ok(IssuedSession {
            token,
            ttl: self.sessions.policy().max_lifetime,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HashingParams, SessionPolicy};
    use crate::crypto::password::PasswordHasher;

    fn manager() -> SessionManager {
        let hasher = PasswordHasher::new(&HashingParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        SessionManager::new(
            CredentialStore::new(hasher).unwrap(),
            SessionStore::new(SessionPolicy::default()),
        )
    }

    fn ann<'a>(password: &'a str, confirmation: &'a str) -> NewAccount<'a> {
        NewAccount {
            first: "Ann",
            last: "Lee",
            username: "ann",
            password,
            password_confirmation: confirmation,
        }
    }

    #[tokio::test]
    async fn signup_login_logout_round() {
        let manager = manager();

        let t1 = manager.signup(ann("p1", "p1")).await.unwrap().token;
        let current = manager.resolve_current_user(Some(&t1));
        assert_eq!(current.profile().unwrap().username, "ann");
        assert_eq!(current.profile().unwrap().first, "Ann");

        manager.logout(Some(&t1));
        assert!(matches!(
            manager.sessions().resolve(&t1),
            Err(AppError::NoSuchSession)
        ));

        let t2 = manager.login("ann", "p1").await.unwrap().token;
        assert_ne!(t1, t2);

        assert!(matches!(
            manager.login("ann", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn mismatched_confirmation_creates_nothing() {
        let manager = manager();

        let err = manager.signup(ann("p1", "p2")).await.unwrap_err();
        assert!(matches!(err, AppError::PasswordMismatch));
        assert!(!manager.credentials().exists("ann"));
        assert!(manager.sessions().is_empty());
    }

    #[tokio::test]
    async fn second_signup_is_a_duplicate() {
        let manager = manager();
        manager.signup(ann("p1", "p1")).await.unwrap();

        let err = manager.signup(ann("p3", "p3")).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateUsername));
        assert_eq!(manager.sessions().len(), 1);
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let manager = manager();
        manager.signup(ann("p1", "p1")).await.unwrap();

        let wrong = manager.login("ann", "nope").await.unwrap_err();
        let unknown = manager.login("nobody", "p1").await.unwrap_err();

        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn missing_or_unknown_token_is_anonymous() {
        let manager = manager();

        assert_eq!(manager.resolve_current_user(None), CurrentUser::Anonymous);
        assert_eq!(
            manager.resolve_current_user(Some(&SessionToken::random())),
            CurrentUser::Anonymous
        );
        assert!(matches!(
            manager.require_user(None),
            Err(AppError::NoSuchSession)
        ));
    }

    #[tokio::test]
    async fn logout_without_session_is_fine() {
        let manager = manager();
        manager.logout(None);
        manager.logout(Some(&SessionToken::random()));
    }

    #[tokio::test]
    async fn issued_ttl_is_the_session_lifetime() {
        let manager = manager();
        let issued = manager.signup(ann("p1", "p1")).await.unwrap();
        assert_eq!(issued.ttl, SessionPolicy::default().max_lifetime);
    }

    #[tokio::test]
    async fn session_of_a_vanished_user_is_revoked() {
        let manager = manager();
        let orphan = manager.sessions().issue("ghost").unwrap();

        assert!(matches!(
            manager.require_user(Some(&orphan)),
            Err(AppError::NoSuchSession)
        ));
        assert!(manager.sessions().is_empty());
    }
}
