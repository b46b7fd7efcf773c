//! Session lock port - mutual exclusion per wizard session.
//!
//! Holding the guard is holding the lock. Dropping the guard releases it, so
//! every exit path from the pipeline (including `?` and panics) releases.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::foundation::SessionToken;

#[async_trait]
pub trait SessionLock: Send + Sync {
    /// Waits up to `max_wait` for the lock on `token`.
    async fn acquire(
        &self,
        token: &SessionToken,
        max_wait: Duration,
    ) -> Result<SessionLockGuard, LockError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("lock for session {0} is held by another submission")]
    Timeout(String),

    #[error("lock backend unavailable: {0}")]
    Unavailable(String),
}

/// Releases its lock on drop.
#[must_use = "the session lock is released as soon as the guard is dropped"]
pub struct SessionLockGuard {
    token: SessionToken,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl SessionLockGuard {
    pub fn new(token: SessionToken, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            token,
            release: Some(Box::new(release)),
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(session_token = %self.token, "Session lock released");
        }
    }
}

impl std::fmt::Debug for SessionLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionLockGuard")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}
