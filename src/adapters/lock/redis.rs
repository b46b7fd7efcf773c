//! Redis-backed session lock for multi-server deployments.
//!
//! Acquire is `SET key holder NX PX ttl`, polled until `max_wait` elapses.
//! While the guard is alive a background task re-extends the TTL every third
//! of its length, so a slow join keeps its lock. The TTL then only bounds a
//! crashed holder. Release deletes the key only if it still holds our holder
//! value, so a holder whose TTL lapsed cannot release someone else's lock.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use redis::aio::MultiplexedConnection;

use crate::domain::foundation::SessionToken;
use crate::ports::{LockError, SessionLock, SessionLockGuard};

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const EXTEND_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

#[derive(Clone)]
pub struct RedisSessionLock {
    conn: MultiplexedConnection,
    key_prefix: String,
    ttl: Duration,
    poll_interval: Duration,
}

impl RedisSessionLock {
    pub fn new(conn: MultiplexedConnection, ttl: Duration, poll_interval: Duration) -> Self {
        Self {
            conn,
            key_prefix: "join-flow:lock".to_string(),
            ttl,
            poll_interval,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    fn key(&self, token: &SessionToken) -> String {
        lock_key(&self.key_prefix, token)
    }

    async fn try_set(&self, key: &str, holder: &str) -> Result<bool, LockError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(holder)
            .arg("NX")
            .arg("PX")
            .arg(self.ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| LockError::Unavailable(e.to_string()))?;
        Ok(reply.is_some())
    }
}

fn lock_key(prefix: &str, token: &SessionToken) -> String {
    format!("{}:{}", prefix, token)
}

fn holder_value() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

#[async_trait]
impl SessionLock for RedisSessionLock {
    async fn acquire(
        &self,
        token: &SessionToken,
        max_wait: Duration,
    ) -> Result<SessionLockGuard, LockError> {
        let key = self.key(token);
        let holder = holder_value();
        let deadline = tokio::time::Instant::now() + max_wait;

        loop {
            if self.try_set(&key, &holder).await? {
                break;
            }
            if tokio::time::Instant::now() + self.poll_interval > deadline {
                tracing::warn!(session_token = %token, "Timed out waiting for session lock");
                return Err(LockError::Timeout(token.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        tracing::debug!(session_token = %token, "Session lock acquired");
        let renewal = tokio::spawn(keep_alive(renew_interval(self.ttl), {
            let conn = self.conn.clone();
            let key = key.clone();
            let holder = holder.clone();
            let ttl_ms = self.ttl.as_millis() as u64;
            move || extend(conn.clone(), key.clone(), holder.clone(), ttl_ms)
        }));
        let conn = self.conn.clone();
        Ok(SessionLockGuard::new(*token, move || {
            renewal.abort();
            release_in_background(conn, key, holder)
        }))
    }
}

fn renew_interval(ttl: Duration) -> Duration {
    (ttl / 3).max(Duration::from_millis(10))
}

async fn extend(
    mut conn: MultiplexedConnection,
    key: String,
    holder: String,
    ttl_ms: u64,
) -> Result<bool, redis::RedisError> {
    let extended: i32 = redis::Script::new(EXTEND_SCRIPT)
        .key(&key)
        .arg(&holder)
        .arg(ttl_ms)
        .invoke_async(&mut conn)
        .await?;
    Ok(extended == 1)
}

/// Extends the lock every `interval` until the key is no longer ours.
async fn keep_alive<F, Fut>(interval: Duration, mut extend: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, redis::RedisError>>,
{
    loop {
        tokio::time::sleep(interval).await;
        match extend().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("Session lock lost before the join finished");
                return;
            }
            // Transient; the TTL still covers the next attempt.
            Err(e) => tracing::warn!(error = %e, "Failed to extend session lock"),
        }
    }
}

fn release_in_background(mut conn: MultiplexedConnection, key: String, holder: String) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!(key = %key, "No runtime to release session lock; it will expire");
        return;
    };
    handle.spawn(async move {
        let result: Result<i32, redis::RedisError> = redis::Script::new(RELEASE_SCRIPT)
            .key(&key)
            .arg(&holder)
            .invoke_async(&mut conn)
            .await;
        match result {
            Ok(0) => tracing::warn!(key = %key, "Session lock expired before release"),
            Ok(_) => {}
            Err(e) => tracing::error!(key = %key, error = %e, "Failed to release session lock"),
        }
    });
}

impl std::fmt::Debug for RedisSessionLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionLock")
            .field("key_prefix", &self.key_prefix)
            .field("ttl", &self.ttl)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn lock_key_is_prefixed_by_session() {
        let token = SessionToken::parse("6f1c7d3e-2b4a-4f1e-9c3d-1a2b3c4d5e6f").unwrap();
        assert_eq!(
            lock_key("join-flow:lock", &token),
            "join-flow:lock:6f1c7d3e-2b4a-4f1e-9c3d-1a2b3c4d5e6f"
        );
    }

    #[test]
    fn holder_values_are_random() {
        let a = holder_value();
        assert_eq!(a.len(), 32);
        assert_ne!(a, holder_value());
    }

    #[test]
    fn renewal_runs_well_inside_the_ttl() {
        assert_eq!(renew_interval(Duration::from_secs(120)), Duration::from_secs(40));
        assert_eq!(renew_interval(Duration::ZERO), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn keep_alive_extends_until_ownership_is_lost() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();

        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            keep_alive(Duration::from_millis(5), move || {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n == 2 {
                        Err(redis::RedisError::from((redis::ErrorKind::IoError, "blip")))
                    } else {
                        Ok(n < 4)
                    }
                }
            }),
        )
        .await;

        assert!(finished.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    // Acquire/release against a live server run with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn redis_lock_excludes_second_holder() {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let conn = client.get_multiplexed_tokio_connection().await.unwrap();
        let lock = RedisSessionLock::new(conn, Duration::from_secs(5), Duration::from_millis(10));
        let token = SessionToken::new();

        let _guard = lock.acquire(&token, Duration::from_millis(50)).await.unwrap();
        assert!(lock.acquire(&token, Duration::from_millis(50)).await.is_err());
    }

    #[tokio::test]
    #[ignore]
    async fn redis_lock_outlives_its_ttl_while_held() {
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let conn = client.get_multiplexed_tokio_connection().await.unwrap();
        let lock = RedisSessionLock::new(conn, Duration::from_millis(300), Duration::from_millis(10));
        let token = SessionToken::new();

        let guard = lock.acquire(&token, Duration::from_millis(50)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(lock.acquire(&token, Duration::from_millis(50)).await.is_err());

        drop(guard);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(lock.acquire(&token, Duration::from_millis(200)).await.is_ok());
    }
}
