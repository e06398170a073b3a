//! Session access and expiry recovery.
//!
//! The engine never owns credentials. It reads them through [`SessionStore`]
//! and, when the server rejects them, runs the same recovery the HTTP layer
//! runs on a 401: clear the session and send the user to the login view.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::types::UserIdentity;

/// Message shown on the login view after a rejected credential.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Read access to the locally stored session.
pub trait SessionStore: Send + Sync {
    /// Returns the current credential token.
    fn token(&self) -> Option<String>;

    /// Returns the signed-in user.
    fn current_user(&self) -> Option<UserIdentity>;

    /// Clears the stored credential and role.
    fn logout(&self);
}

/// Navigation to the login view.
pub trait Navigator: Send + Sync {
    /// Navigates to the login view carrying a user-facing message.
    fn redirect_to_login(&self, message: &str);
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct MemorySession {
    inner: RwLock<Option<StoredSession>>,
}

#[derive(Debug, Clone)]
struct StoredSession {
    token: String,
    user: UserIdentity,
}

impl MemorySession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session that is already signed in.
    #[must_use]
    pub fn signed_in(token: impl Into<String>, user: UserIdentity) -> Self {
        let session = Self::new();
        session.sign_in(token, user);
        session
    }

    /// Stores a credential and identity.
    pub fn sign_in(&self, token: impl Into<String>, user: UserIdentity) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(StoredSession {
            token: token.into(),
            user,
        });
    }

    /// Returns true if a credential is stored.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.token.clone())
    }

    fn current_user(&self) -> Option<UserIdentity> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.user.clone())
    }

    fn logout(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Navigator for headless processes: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNavigator;

impl Navigator for LoggingNavigator {
    fn redirect_to_login(&self, message: &str) {
        warn!(message, "redirecting to login");
    }
}

/// Shared session-expiry recovery.
#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn SessionStore>,
    navigator: Arc<dyn Navigator>,
}

impl std::fmt::Debug for SessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionGuard").finish_non_exhaustive()
    }
}

impl SessionGuard {
    /// Creates a guard over a store and navigator.
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>, navigator: Arc<dyn Navigator>) -> Self {
        Self { store, navigator }
    }

    /// Returns the underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Returns the current credential token.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.store.token()
    }

    /// Returns the signed-in user.
    #[must_use]
    pub fn current_user(&self) -> Option<UserIdentity> {
        self.store.current_user()
    }

    /// Clears the session and redirects to login with the expiry message.
    pub fn expire(&self) {
        info!("session expired, clearing stored credential");
        self.store.logout();
        self.navigator.redirect_to_login(SESSION_EXPIRED_MESSAGE);
    }
}
