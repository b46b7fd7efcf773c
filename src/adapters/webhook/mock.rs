//! Recording webhook dispatcher for tests.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::join::JoinRequest;
use crate::ports::{WebhookDispatcher, WebhookError};

#[derive(Debug, Default)]
pub struct MockWebhookDispatcher {
    delivered: Mutex<Vec<Value>>,
    fail: bool,
}

impl MockWebhookDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Bodies delivered so far, as JSON.
    pub fn delivered(&self) -> Vec<Value> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl WebhookDispatcher for MockWebhookDispatcher {
    async fn dispatch(&self, request: &JoinRequest) -> Result<(), WebhookError> {
        if self.fail {
            return Err(WebhookError::Rejected { status: 500 });
        }
        let body =
            serde_json::to_value(request).map_err(|e| WebhookError::Encoding(e.to_string()))?;
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(body);
        Ok(())
    }
}
