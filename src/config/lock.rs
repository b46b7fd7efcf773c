//! Session lock configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockBackend {
    /// Single process only
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    #[serde(default)]
    pub backend: LockBackend,

    pub redis_url: Option<String>,

    /// Key prefix for Redis lock keys
    pub key_prefix: Option<String>,

    /// Redis lock expiry; renewed while held, so it only bounds a crashed holder
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// How long a submission waits for the same session to finish
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl LockConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.backend == LockBackend::Redis {
            let url = self
                .redis_url
                .as_deref()
                .ok_or(ValidationError::MissingRequired("LOCK__REDIS_URL"))?;
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                return Err(ValidationError::InvalidRedisUrl);
            }
            if self.max_wait_secs >= self.ttl_secs {
                return Err(ValidationError::InvalidLockTimings);
            }
        }
        if self.poll_interval_ms == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            backend: LockBackend::Memory,
            redis_url: None,
            key_prefix: None,
            ttl_secs: default_ttl(),
            max_wait_secs: default_max_wait(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_ttl() -> u64 {
    120
}

fn default_max_wait() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    100
}
