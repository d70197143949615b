use std::fmt;

use serde::{Deserialize, Serialize};

/// Fallback shown when the identity provider supplies no display name.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// An authenticated identity as reported by the session provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Bearer token the record store authorizes this user's requests with.
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            name: None,
            access_token: None,
        }
    }

    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Returns `full_name`, then `name`, then [`DEFAULT_DISPLAY_NAME`].
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.name.as_deref().filter(|n| !n.trim().is_empty()))
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("full_name", &self.full_name)
            .field("name", &self.name)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Explicit per-session context handed to the bookmark view at construction.
///
/// A session context never changes identity: a different user means a new
/// context and a new view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    user: User,
}

impl SessionContext {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    /// The `owner_id` every query and subscription of this session is scoped to.
    pub fn owner_id(&self) -> &str {
        &self.user.id
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user.access_token.as_deref()
    }
}
