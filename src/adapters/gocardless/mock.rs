//! In-memory mandate provider for tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::ports::{MandateError, MandateProvider, MandateRecord, MandateRequest};

#[derive(Default, Clone)]
pub struct MockMandateProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    mandates: Vec<StoredMandate>,
    create_error: Option<MandateError>,
    create_calls: usize,
    search_calls: usize,
}

struct StoredMandate {
    email: String,
    created_at: DateTime<Utc>,
    record: MandateRecord,
}

impl MockMandateProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seeds a mandate as if it had been created at `created_at`.
    pub fn add_mandate(&self, email: &str, created_at: DateTime<Utc>, id: &str) {
        self.state().mandates.push(StoredMandate {
            email: email.to_string(),
            created_at,
            record: MandateRecord {
                id: id.to_string(),
                reference: Some(format!("REF-{}", id)),
                customer_id: format!("CU-{}", id),
            },
        });
    }

    pub fn fail_create(&self, error: MandateError) {
        self.state().create_error = Some(error);
    }

    pub fn create_calls(&self) -> usize {
        self.state().create_calls
    }

    pub fn search_calls(&self) -> usize {
        self.state().search_calls
    }
}

#[async_trait]
impl MandateProvider for MockMandateProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn find_recent_mandate(
        &self,
        email: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<MandateRecord>, MandateError> {
        let mut state = self.state();
        state.search_calls += 1;
        Ok(state
            .mandates
            .iter()
            .filter(|m| m.created_at >= since && m.email.eq_ignore_ascii_case(email))
            .map(|m| m.record.clone())
            .next())
    }

    async fn create_mandate(&self, request: MandateRequest) -> Result<MandateRecord, MandateError> {
        let mut state = self.state();
        state.create_calls += 1;
        if let Some(err) = state.create_error.clone() {
            return Err(err);
        }
        let id = format!("MD{:04}", state.mandates.len() + 1);
        let record = MandateRecord {
            reference: Some(format!("REF-{}", id)),
            customer_id: format!("CU-{}", id),
            id,
        };
        state.mandates.push(StoredMandate {
            email: request.email,
            created_at: Utc::now(),
            record: record.clone(),
        });
        Ok(record)
    }
}
