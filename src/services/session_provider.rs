//! Session provider boundary.
//!
//! The identity service is external; the client only needs the current user
//! and a stream of sign-in/sign-out transitions. [`LocalSessionProvider`]
//! publishes transitions over a `tokio::sync::watch` channel.

use tokio::sync::watch;
use tracing::info;

use crate::types::errors::SessionError;
use crate::types::session::User;

/// Source of the authenticated identity.
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;
    /// Receiver that observes every later sign-in/sign-out transition.
    fn subscribe(&self) -> watch::Receiver<Option<User>>;
    fn sign_in(&self, user: User) -> Result<(), SessionError>;
    fn sign_out(&self) -> Result<(), SessionError>;
}

/// In-process session provider.
///
/// Repeating a sign-in for the user already signed in with the same token, or
/// signing out twice, publishes nothing.
pub struct LocalSessionProvider {
    tx: watch::Sender<Option<User>>,
}

impl LocalSessionProvider {
    pub fn new(initial: Option<User>) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }
}

impl Default for LocalSessionProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SessionProvider for LocalSessionProvider {
    fn current_user(&self) -> Option<User> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.tx.subscribe()
    }

    fn sign_in(&self, user: User) -> Result<(), SessionError> {
        if user.id.trim().is_empty() {
            return Err(SessionError::InvalidUser("empty user id".to_string()));
        }
        let user_id = user.id.clone();
        let changed = self.tx.send_if_modified(|current| {
            if let Some(signed_in) = current.as_ref() {
                if signed_in.id == user.id && signed_in.access_token == user.access_token {
                    return false;
                }
            }
            *current = Some(user);
            true
        });
        if changed {
            info!(user = %user_id, "Signed in");
        }
        Ok(())
    }

    fn sign_out(&self) -> Result<(), SessionError> {
        let changed = self.tx.send_if_modified(|current| current.take().is_some());
        if changed {
            info!("Signed out");
        }
        Ok(())
    }
}
