//! Mock billing provider for testing.
//!
//! Provides a configurable in-memory `BillingProvider`. Supports:
//! - Seeded customers and subscriptions
//! - Error injection per method
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::ports::{
    BillingError, BillingProvider, CustomerRecord, NewCustomer, NewSubscription, PaymentSource,
    SubscriptionRecord, SubscriptionStatus,
};

/// Mock billing provider for testing.
///
/// # Example
///
/// ```ignore
/// let billing = MockBillingProvider::new();
/// let customer_id = billing.add_customer("ada@example.com");
/// billing.add_subscription(&customer_id, "membership-standard", SubscriptionStatus::Active);
///
/// billing.fail_on("create_subscription", BillingError::payment("Insufficient funds"));
/// ```
#[derive(Default, Clone)]
pub struct MockBillingProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    customers: Vec<CustomerRecord>,
    subscriptions: Vec<SubscriptionRecord>,
    payment_sources: HashMap<String, PaymentSource>,
    method_errors: HashMap<&'static str, BillingError>,
    call_log: Vec<MethodCall>,
    next_id: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: &'static str,
    pub args: Vec<String>,
}

impl MockState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn record(&mut self, method: &'static str, args: Vec<String>) -> Result<(), BillingError> {
        self.call_log.push(MethodCall { method, args });
        match self.method_errors.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl MockBillingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Seeds an existing customer and returns its id.
    pub fn add_customer(&self, email: &str) -> String {
        let mut state = self.state();
        let id = state.next_id("cus");
        state.customers.push(CustomerRecord {
            id: id.clone(),
            email: email.to_string(),
        });
        id
    }

    /// Seeds a subscription for an existing customer.
    pub fn add_subscription(&self, customer_id: &str, plan_id: &str, status: SubscriptionStatus) {
        let mut state = self.state();
        let id = state.next_id("sub");
        state.subscriptions.push(SubscriptionRecord {
            id,
            customer_id: customer_id.to_string(),
            plan_id: plan_id.to_string(),
            status,
            line_items: Vec::new(),
        });
    }

    /// Makes every call to `method` fail with `error`.
    pub fn fail_on(&self, method: &'static str, error: BillingError) {
        self.state().method_errors.insert(method, error);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Assertion Helpers
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Number of calls that would have written to the provider.
    pub fn write_count(&self) -> usize {
        self.call_count("create_customer") + self.call_count("create_subscription")
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionRecord> {
        self.state().subscriptions.clone()
    }

    pub fn payment_source(&self, customer_id: &str) -> Option<PaymentSource> {
        self.state().payment_sources.get(customer_id).cloned()
    }
}

#[async_trait]
impl BillingProvider for MockBillingProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn find_customers_by_email(
        &self,
        email: &str,
    ) -> Result<Vec<CustomerRecord>, BillingError> {
        let mut state = self.state();
        state.record("find_customers_by_email", vec![email.to_string()])?;
        Ok(state
            .customers
            .iter()
            .filter(|c| c.email.eq_ignore_ascii_case(email))
            .cloned()
            .collect())
    }

    async fn has_active_membership_subscription(
        &self,
        customer_id: &str,
        plan_ids: &[String],
    ) -> Result<bool, BillingError> {
        let mut state = self.state();
        state.record(
            "has_active_membership_subscription",
            vec![customer_id.to_string()],
        )?;
        Ok(state.subscriptions.iter().any(|s| {
            s.customer_id == customer_id && s.status.is_active() && plan_ids.contains(&s.plan_id)
        }))
    }

    async fn create_customer(&self, request: NewCustomer) -> Result<CustomerRecord, BillingError> {
        let mut state = self.state();
        state.record("create_customer", vec![request.email.clone()])?;
        let customer = CustomerRecord {
            id: state.next_id("cus"),
            email: request.email,
        };
        state.customers.push(customer.clone());
        state
            .payment_sources
            .insert(customer.id.clone(), request.payment_source);
        Ok(customer)
    }

    async fn create_subscription(
        &self,
        request: NewSubscription,
    ) -> Result<SubscriptionRecord, BillingError> {
        let mut state = self.state();
        state.record(
            "create_subscription",
            vec![request.customer_id.clone(), request.plan_id.clone()],
        )?;
        let subscription = SubscriptionRecord {
            id: state.next_id("sub"),
            customer_id: request.customer_id,
            plan_id: request.plan_id,
            status: SubscriptionStatus::Active,
            line_items: request.line_items,
        };
        state.subscriptions.push(subscription.clone());
        Ok(subscription)
    }
}
