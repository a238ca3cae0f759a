use std::fmt;

use crate::error::ProgressionError;

/// Opaque identifier of a signed-in user, as issued by the auth provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Returns `None` for blank identifiers.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity an operation acts as. Passed explicitly to every mutating call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthSession {
    Anonymous,
    SignedIn(UserId),
}

impl AuthSession {
    /// Session for a raw identifier; blank or missing ids are anonymous.
    pub fn from_user_id(raw: Option<&str>) -> Self {
        match raw.and_then(|raw| UserId::new(raw)) {
            Some(user_id) => AuthSession::SignedIn(user_id),
            None => AuthSession::Anonymous,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            AuthSession::SignedIn(user_id) => Some(user_id),
            AuthSession::Anonymous => None,
        }
    }

    /// The acting user, or [`ProgressionError::Unauthenticated`].
    pub fn require_user(&self) -> Result<&UserId, ProgressionError> {
        self.user_id().ok_or(ProgressionError::Unauthenticated)
    }
}
