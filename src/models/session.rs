use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// An opaque session token.
///
/// Backed by a random UUID v4 (122 bits of entropy). `Debug` prints only a
/// short prefix; use [`SessionToken::to_cookie_value`] to get the full value.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionToken(Uuid);

impl SessionToken {
    /// Generates a new random token.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The value placed in the session cookie.
    pub fn to_cookie_value(&self) -> String {
        self.0.to_string()
    }
}

impl FromStr for SessionToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let simple = self.0.simple().to_string();
        write!(f, "SessionToken({}…)", &simple[..8])
    }
}

/// A live binding between a token and a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The token this session is keyed by.
    pub token: SessionToken,
    /// The username of the owning identity.
    pub username: String,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp of the last request that resolved this session.
    pub last_access: DateTime<Utc>,
    /// The timestamp after which the session expires regardless of activity.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is dead at `now`, either from idling past
    /// `idle_timeout` or from reaching `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, idle_timeout: chrono::Duration) -> bool {
        now >= self.expires_at || now - self.last_access > idle_timeout
    }
}
