//! Mock signup adapter for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::join::JoinRequest;
use crate::ports::{SignupAdapter, SignupError};

#[derive(Debug, Clone)]
pub struct MockSignupAdapter {
    name: &'static str,
    blocking: bool,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockSignupAdapter {
    pub fn succeeding(name: &'static str, blocking: bool) -> Self {
        Self {
            name,
            blocking,
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(name: &'static str, blocking: bool) -> Self {
        Self {
            fail: true,
            ..Self::succeeding(name, blocking)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignupAdapter for MockSignupAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    async fn signup(&self, _request: &JoinRequest) -> Result<(), SignupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SignupError::Rejected {
                status: 500,
                body: "mock failure".to_string(),
            });
        }
        Ok(())
    }
}
