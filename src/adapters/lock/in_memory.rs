//! In-process session lock for single-server deployments and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::SessionToken;
use crate::ports::{LockError, SessionLock, SessionLockGuard};

type Slots = Arc<StdMutex<HashMap<SessionToken, Arc<Mutex<()>>>>>;

/// One tokio mutex per session token.
///
/// Entries exist only while someone holds or waits for the token, so the map
/// does not grow with the number of sessions ever seen.
#[derive(Debug, Default, Clone)]
pub struct InMemorySessionLock {
    slots: Slots,
}

impl InMemorySessionLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tokens currently locked or contended.
    pub fn active_count(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    fn slot(&self, token: &SessionToken) -> Result<Arc<Mutex<()>>, LockError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| LockError::Unavailable("lock table poisoned".to_string()))?;
        Ok(slots.entry(*token).or_default().clone())
    }

    fn remove_if_idle(&self, token: &SessionToken) {
        if let Ok(mut slots) = self.slots.lock() {
            if let Some(slot) = slots.get(token) {
                if Arc::strong_count(slot) == 1 && slot.try_lock().is_ok() {
                    slots.remove(token);
                }
            }
        }
    }
}

fn release(slots: Slots, token: SessionToken, slot: Arc<Mutex<()>>, held: OwnedMutexGuard<()>) {
    let Ok(mut table) = slots.lock() else {
        return;
    };
    drop(held);
    // The map entry and `slot` are the only references left when nobody waits.
    if Arc::strong_count(&slot) <= 2 {
        table.remove(&token);
    }
}

#[async_trait]
impl SessionLock for InMemorySessionLock {
    async fn acquire(
        &self,
        token: &SessionToken,
        max_wait: Duration,
    ) -> Result<SessionLockGuard, LockError> {
        let slot = self.slot(token)?;

        let held = match tokio::time::timeout(max_wait, slot.clone().lock_owned()).await {
            Ok(held) => held,
            Err(_) => {
                drop(slot);
                self.remove_if_idle(token);
                tracing::warn!(session_token = %token, "Timed out waiting for session lock");
                return Err(LockError::Timeout(token.to_string()));
            }
        };

        tracing::debug!(session_token = %token, "Session lock acquired");
        let slots = self.slots.clone();
        let token = *token;
        Ok(SessionLockGuard::new(token, move || {
            release(slots, token, slot, held)
        }))
    }
}
