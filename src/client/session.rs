use std::sync::{PoisonError, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the credentials of whoever is using the client and gets told when they stop working
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// The bearer token to send with requests, if logged in
    fn token(&self) -> Option<String>;
    /// Forgets the stored token
    fn clear_token(&self);
    /// Signals that the user has to log in again before making more requests
    fn login_required(&self);
}

/// A [SessionStore] which keeps everything in process memory
#[derive(Debug, Default)]
pub struct InMemorySession {
    token: RwLock<Option<String>>,
    login_required: AtomicBool,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        InMemorySession {
            token: RwLock::new(Some(token.into())),
            login_required: AtomicBool::new(false),
        }
    }

    /// Stores a fresh token and clears any pending login request
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
        self.login_required.store(false, Ordering::SeqCst);
    }

    /// Whether the server rejected the session since the last [InMemorySession::set_token]
    pub fn needs_login(&self) -> bool {
        self.login_required.load(Ordering::SeqCst)
    }
}

impl SessionStore for InMemorySession {
    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_token(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn login_required(&self) {
        self.login_required.store(true, Ordering::SeqCst);
    }
}
