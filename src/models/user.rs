use std::fmt;

use serde::{Deserialize, Serialize};

/// A PHC-format password hash.
///
/// `Debug` is redacted so the value never ends up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Wraps an already computed PHC string.
    pub fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    /// The PHC string, for handing to the verifier.
    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(<redacted>)")
    }
}

/// A registered user.
///
/// Serialized as `{first, last, username, passwordHash}`, which is also the
/// on-disk shape of each entry in the users file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// The user's first name.
    pub first: String,
    /// The user's last name.
    pub last: String,
    /// The unique, immutable username.
    pub username: String,
    /// The user's hashed password.
    pub password_hash: HashedPassword,
}

impl Identity {
    /// The public view of this identity.
    pub fn profile(&self) -> Profile {
        Profile {
            username: self.username.clone(),
            first: self.first.clone(),
            last: self.last.clone(),
        }
    }
}

/// What the rendering layer gets to see of a user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    pub first: String,
    pub last: String,
}

/// The outcome of resolving the caller's session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurrentUser {
    Authenticated(Profile),
    Anonymous,
}

impl CurrentUser {
    /// The profile, if the caller is logged in.
    pub fn profile(&self) -> Option<&Profile> {
        match self {
            CurrentUser::Authenticated(profile) => Some(profile),
            CurrentUser::Anonymous => None,
        }
    }
}
