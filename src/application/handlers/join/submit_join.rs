//! SubmitJoinHandler - drives one membership application through every provider.
//!
//! The pipeline runs under the session lock, one step at a time:
//!
//! 1. Billing check (duplicate active membership guard)
//! 2. Mandate (direct debit only, reused inside the idempotency window)
//! 3. Billing customer
//! 4. Subscription
//! 5. Identity account
//! 6. CRM / mailing list signups
//! 7. Operator webhook
//!
//! Nothing is rolled back on failure. The saga ledger of created resources is
//! logged and handed to the configured `Compensator`.

use std::sync::Arc;
use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::SecretString;

use crate::domain::foundation::ValidationError;
use crate::domain::join::{
    CreatedResource, JoinError, JoinRequest, JoinSaga, JoinState, PaymentMethod, PlanCatalog,
    SubscriptionPlan, ValidatedJoin,
};
use crate::ports::{
    BillingProvider, Compensator, CustomerRecord, IdentityProvider, MandateProvider,
    MandateRecord, NewCustomer, NewIdentityAccount, NewSubscription, NoCompensation,
    PaymentSource, SessionLock, SignupAdapter, SubscriptionRecord, WebhookDispatcher,
};

use super::ensure_mandate::{ensure_mandate, MandateOutcome};

const GENERATED_PASSWORD_LEN: usize = 20;

/// Settings the pipeline reads on every submission.
#[derive(Debug, Clone)]
pub struct JoinPipelineConfig {
    pub catalog: PlanCatalog,
    /// ISO currency code for subscriptions.
    pub currency: String,
    /// How long a submission waits for another holder of its session token.
    pub lock_max_wait: Duration,
    /// Trailing window in which a mandate for the same email is reused.
    pub mandate_window: chrono::Duration,
}

impl Default for JoinPipelineConfig {
    fn default() -> Self {
        Self {
            catalog: PlanCatalog::default(),
            currency: "GBP".to_string(),
            lock_max_wait: Duration::from_secs(10),
            mandate_window: chrono::Duration::seconds(300),
        }
    }
}

/// Result of a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    /// Absent only when billing is disabled.
    pub customer: Option<CustomerRecord>,
    pub subscription: Option<SubscriptionRecord>,
    pub mandate: Option<MandateRecord>,
    /// Set when this join created the identity account.
    pub identity_user_id: Option<String>,
    pub saga: JoinSaga,
}

#[derive(Debug, Default)]
struct Progress {
    customer: Option<CustomerRecord>,
    subscription: Option<SubscriptionRecord>,
    mandate: Option<MandateRecord>,
    identity_user_id: Option<String>,
}

/// Handler for join submissions.
///
/// Providers are optional; a missing provider skips its steps. Direct debit
/// submissions are rejected when no mandate provider is configured.
pub struct SubmitJoinHandler {
    config: JoinPipelineConfig,
    lock: Arc<dyn SessionLock>,
    billing: Option<Arc<dyn BillingProvider>>,
    mandate: Option<Arc<dyn MandateProvider>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    signups: Vec<Arc<dyn SignupAdapter>>,
    webhook: Option<Arc<dyn WebhookDispatcher>>,
    compensator: Arc<dyn Compensator>,
}

impl SubmitJoinHandler {
    pub fn new(config: JoinPipelineConfig, lock: Arc<dyn SessionLock>) -> Self {
        Self {
            config,
            lock,
            billing: None,
            mandate: None,
            identity: None,
            signups: Vec::new(),
            webhook: None,
            compensator: Arc::new(NoCompensation),
        }
    }

    pub fn with_billing(mut self, billing: Arc<dyn BillingProvider>) -> Self {
        self.billing = Some(billing);
        self
    }

    pub fn with_mandate(mut self, mandate: Arc<dyn MandateProvider>) -> Self {
        self.mandate = Some(mandate);
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_signup(mut self, adapter: Arc<dyn SignupAdapter>) -> Self {
        self.signups.push(adapter);
        self
    }

    pub fn with_webhook(mut self, webhook: Arc<dyn WebhookDispatcher>) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn with_compensator(mut self, compensator: Arc<dyn Compensator>) -> Self {
        self.compensator = compensator;
        self
    }

    pub async fn handle(&self, request: JoinRequest) -> Result<JoinOutcome, JoinError> {
        let validated = request.validate()?;
        let plan = self.plan_for(&request, &validated)?;
        if request.payment_method == PaymentMethod::DirectDebit && self.mandate.is_none() {
            return Err(ValidationError::unsupported(
                "paymentMethod",
                "direct debit is not available",
            )
            .into());
        }

        let token = validated.session_token;
        let _guard = self
            .lock
            .acquire(&token, self.config.lock_max_wait)
            .await
            .map_err(|e| {
                tracing::warn!(session_token = %token, error = %e, "Session lock not acquired");
                JoinError::from(e)
            })?;

        let mut saga = JoinSaga::new(token);
        let mut progress = Progress::default();

        match self
            .run(&request, plan.as_ref(), &mut saga, &mut progress)
            .await
        {
            Ok(()) => {
                saga.finish()?;
                tracing::info!(
                    session_token = %token,
                    customer_id = progress.customer.as_ref().map(|c| c.id.as_str()),
                    steps = saga.completed().len(),
                    "Join completed"
                );
                Ok(JoinOutcome {
                    customer: progress.customer,
                    subscription: progress.subscription,
                    mandate: progress.mandate,
                    identity_user_id: progress.identity_user_id,
                    saga,
                })
            }
            Err(err) => {
                let step = saga.state();
                saga.fail();
                tracing::error!(
                    session_token = %token,
                    step = %step,
                    error_code = err.error_code(),
                    error = %err,
                    created = ?saga.created_resources(),
                    "Join failed"
                );
                self.compensate(&saga).await;
                Err(err)
            }
        }
    }

    fn plan_for(
        &self,
        request: &JoinRequest,
        validated: &ValidatedJoin,
    ) -> Result<Option<SubscriptionPlan>, JoinError> {
        if self.billing.is_none() {
            return Ok(None);
        }
        let plan = self.config.catalog.compose(&request.membership, validated)?;
        Ok(Some(plan))
    }

    async fn run(
        &self,
        request: &JoinRequest,
        plan: Option<&SubscriptionPlan>,
        saga: &mut JoinSaga,
        progress: &mut Progress,
    ) -> Result<(), JoinError> {
        let mut existing_customer = None;

        if let Some(billing) = &self.billing {
            saga.begin(JoinState::BillingCheck)?;
            existing_customer = self.billing_check(billing.as_ref(), request).await?;
            saga.complete(None);
        }

        if let (PaymentMethod::DirectDebit, Some(mandates)) = (request.payment_method, &self.mandate)
        {
            saga.begin(JoinState::MandateCreate)?;
            let outcome =
                ensure_mandate(mandates.as_ref(), request, self.config.mandate_window).await?;
            let created = match &outcome {
                MandateOutcome::Created(record) => Some(CreatedResource::Mandate(record.id.clone())),
                MandateOutcome::Reused(record) => {
                    tracing::info!(mandate_id = %record.id, "Reusing mandate from a recent attempt");
                    None
                }
            };
            saga.complete(created);
            progress.mandate = Some(outcome.record().clone());
        }

        if let (Some(billing), Some(plan)) = (&self.billing, plan) {
            saga.begin(JoinState::CustomerCreate)?;
            let customer = match existing_customer {
                Some(customer) => {
                    tracing::info!(customer_id = %customer.id, "Update flow, reusing customer");
                    saga.complete(None);
                    customer
                }
                None => {
                    let new_customer = new_customer(request, progress.mandate.as_ref())?;
                    let customer = billing.create_customer(new_customer).await?;
                    saga.complete(Some(CreatedResource::Customer(customer.id.clone())));
                    customer
                }
            };
            progress.customer = Some(customer.clone());

            saga.begin(JoinState::SubscriptionCreate)?;
            let subscription = billing
                .create_subscription(NewSubscription {
                    customer_id: customer.id,
                    plan_id: plan.plan_id.clone(),
                    line_items: plan.line_items.clone(),
                    currency: self.config.currency.clone(),
                })
                .await?;
            saga.complete(Some(CreatedResource::Subscription(subscription.id.clone())));
            progress.subscription = Some(subscription);
        }

        if let Some(identity) = &self.identity {
            saga.begin(JoinState::IdentityProvision)?;
            let user_id = provision_identity(
                identity.as_ref(),
                request,
                plan,
                progress.customer.as_ref(),
            )
            .await?;
            saga.complete(user_id.clone().map(CreatedResource::IdentityAccount));
            progress.identity_user_id = user_id;
        }

        saga.begin(JoinState::SignupFanout)?;
        self.signup_fanout(request).await?;
        saga.complete(None);

        if let Some(webhook) = &self.webhook {
            saga.begin(JoinState::WebhookDispatch)?;
            webhook.dispatch(request).await?;
            saga.complete(None);
        }

        Ok(())
    }

    /// Returns the customer to reuse in the update flow.
    async fn billing_check(
        &self,
        billing: &dyn BillingProvider,
        request: &JoinRequest,
    ) -> Result<Option<CustomerRecord>, JoinError> {
        let email = request.normalized_email();
        tracing::debug!(provider = billing.name(), email = %email, "Looking up existing customers");
        let customers = billing.find_customers_by_email(&email).await?;

        if request.is_update_flow {
            return Ok(customers.into_iter().next());
        }

        let family = self.config.catalog.membership_family();
        for customer in &customers {
            if billing
                .has_active_membership_subscription(&customer.id, &family)
                .await?
            {
                tracing::warn!(customer_id = %customer.id, "Email already has an active membership");
                return Err(JoinError::DuplicateActiveMembership);
            }
        }
        Ok(None)
    }

    async fn signup_fanout(&self, request: &JoinRequest) -> Result<(), JoinError> {
        for adapter in &self.signups {
            match adapter.signup(request).await {
                Ok(()) => tracing::debug!(adapter = adapter.name(), "Signup completed"),
                Err(e) if adapter.is_blocking() => {
                    tracing::error!(adapter = adapter.name(), error = %e, "Blocking signup failed");
                    return Err(JoinError::SignupFailure {
                        adapter: adapter.name().to_string(),
                        detail: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!(adapter = adapter.name(), error = %e, "Signup failed, continuing")
                }
            }
        }
        Ok(())
    }

    async fn compensate(&self, saga: &JoinSaga) {
        for resource in saga.created_resources() {
            if let Err(e) = self.compensator.compensate(resource).await {
                tracing::error!(?resource, error = %e, "Compensation failed");
            }
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn payment_source(
    request: &JoinRequest,
    mandate: Option<&MandateRecord>,
) -> Result<PaymentSource, JoinError> {
    match request.payment_method {
        PaymentMethod::DirectDebit => mandate
            .map(|m| PaymentSource::DirectDebitMandate {
                mandate_id: m.id.clone(),
            })
            .ok_or_else(|| {
                ValidationError::unsupported("paymentMethod", "direct debit is not available")
                    .into()
            }),
        PaymentMethod::CreditCard => {
            if let Some(page) = non_blank(&request.hosted_page_id) {
                return Ok(PaymentSource::HostedPage(page));
            }
            non_blank(&request.payment_token)
                .map(PaymentSource::CardToken)
                .ok_or_else(|| ValidationError::empty_field("paymentToken").into())
        }
    }
}

fn new_customer(
    request: &JoinRequest,
    mandate: Option<&MandateRecord>,
) -> Result<NewCustomer, JoinError> {
    Ok(NewCustomer {
        email: request.normalized_email(),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        phone: non_blank(&request.phone_number),
        billing_address: request.billing_address(),
        payment_source: payment_source(request, mandate)?,
        session_token: request.session_token.trim().to_string(),
    })
}

/// Returns the new user id, or `None` when the account already existed.
async fn provision_identity(
    identity: &dyn IdentityProvider,
    request: &JoinRequest,
    plan: Option<&SubscriptionPlan>,
    customer: Option<&CustomerRecord>,
) -> Result<Option<String>, JoinError> {
    let email = request.normalized_email();
    if identity.user_exists(&email).await? {
        tracing::info!(provider = identity.name(), "Identity account already exists, skipping");
        return Ok(None);
    }

    let password = non_blank(&request.password).unwrap_or_else(generate_password);
    let user_id = identity
        .create_user(NewIdentityAccount {
            email,
            given_name: request.first_name.trim().to_string(),
            family_name: request.last_name.trim().to_string(),
            password: SecretString::new(password),
            plan_id: plan
                .map(|p| p.plan_id.clone())
                .unwrap_or_else(|| request.membership.clone()),
            billing_customer_id: customer.map(|c| c.id.clone()),
        })
        .await?;
    Ok(Some(user_id))
}

fn generate_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockIdentityProvider;
    use crate::adapters::billing::MockBillingProvider;
    use crate::adapters::gocardless::MockMandateProvider;
    use crate::adapters::lock::InMemorySessionLock;
    use crate::adapters::signup::MockSignupAdapter;
    use crate::adapters::webhook::MockWebhookDispatcher;
    use crate::domain::join::fixtures::{card_request, catalog, direct_debit_request};
    use crate::domain::join::LineItemKind;
    use crate::ports::{
        BillingError, IdentityError, MandateError, SubscriptionStatus,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    // ════════════════════════════════════════════════════════════════════════════
    // Test Harness
    // ════════════════════════════════════════════════════════════════════════════

    struct Harness {
        billing: MockBillingProvider,
        mandates: MockMandateProvider,
        identity: Arc<MockIdentityProvider>,
        webhook: Arc<MockWebhookDispatcher>,
    }

    impl Harness {
        fn new() -> Self {
            Self::with_identity(MockIdentityProvider::new())
        }

        fn with_identity(identity: MockIdentityProvider) -> Self {
            Self {
                billing: MockBillingProvider::new(),
                mandates: MockMandateProvider::new(),
                identity: Arc::new(identity),
                webhook: Arc::new(MockWebhookDispatcher::new()),
            }
        }

        fn config() -> JoinPipelineConfig {
            JoinPipelineConfig {
                catalog: catalog(),
                lock_max_wait: Duration::from_secs(5),
                ..JoinPipelineConfig::default()
            }
        }

        fn handler(&self) -> SubmitJoinHandler {
            SubmitJoinHandler::new(Self::config(), Arc::new(InMemorySessionLock::new()))
                .with_billing(Arc::new(self.billing.clone()))
                .with_mandate(Arc::new(self.mandates.clone()))
                .with_identity(self.identity.clone())
                .with_webhook(self.webhook.clone())
        }
    }

    struct RecordingCompensator {
        seen: Mutex<Vec<CreatedResource>>,
    }

    #[async_trait]
    impl Compensator for RecordingCompensator {
        async fn compensate(&self, resource: &CreatedResource) -> Result<(), String> {
            self.seen.lock().unwrap().push(resource.clone());
            Ok(())
        }
    }

    /// Delegates to the mock but holds each customer creation open.
    struct SlowBilling {
        inner: MockBillingProvider,
        delay: Duration,
    }

    #[async_trait]
    impl BillingProvider for SlowBilling {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn find_customers_by_email(
            &self,
            email: &str,
        ) -> Result<Vec<CustomerRecord>, BillingError> {
            self.inner.find_customers_by_email(email).await
        }

        async fn has_active_membership_subscription(
            &self,
            customer_id: &str,
            plan_ids: &[String],
        ) -> Result<bool, BillingError> {
            self.inner
                .has_active_membership_subscription(customer_id, plan_ids)
                .await
        }

        async fn create_customer(
            &self,
            request: NewCustomer,
        ) -> Result<CustomerRecord, BillingError> {
            tokio::time::sleep(self.delay).await;
            self.inner.create_customer(request).await
        }

        async fn create_subscription(
            &self,
            request: NewSubscription,
        ) -> Result<SubscriptionRecord, BillingError> {
            self.inner.create_subscription(request).await
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Happy Paths
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn card_join_runs_every_step() {
        let harness = Harness::new();
        let outcome = harness.handler().handle(card_request()).await.unwrap();

        assert_eq!(outcome.saga.state(), JoinState::Done);
        let customer = outcome.customer.unwrap();
        assert_eq!(
            harness.billing.payment_source(&customer.id),
            Some(PaymentSource::CardToken("tok_123".to_string()))
        );
        assert_eq!(outcome.subscription.unwrap().plan_id, "membership-standard-GBP-monthly");

        let created = harness.identity.created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].billing_customer_id.as_deref(), Some(customer.id.as_str()));
        assert_eq!(created[0].password_len, GENERATED_PASSWORD_LEN);

        let delivered = harness.webhook.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0]["paymentToken"], "tok_123");
    }

    #[tokio::test]
    async fn direct_debit_join_creates_mandate_before_customer() {
        let harness = Harness::new();
        let outcome = harness
            .handler()
            .handle(direct_debit_request())
            .await
            .unwrap();

        let mandate = outcome.mandate.unwrap();
        assert_eq!(mandate.id, "MD0001");
        let customer = outcome.customer.unwrap();
        assert_eq!(
            harness.billing.payment_source(&customer.id),
            Some(PaymentSource::DirectDebitMandate {
                mandate_id: "MD0001".to_string()
            })
        );

        let steps: Vec<JoinState> = outcome.saga.completed().iter().map(|s| s.step).collect();
        assert_eq!(
            steps,
            vec![
                JoinState::BillingCheck,
                JoinState::MandateCreate,
                JoinState::CustomerCreate,
                JoinState::SubscriptionCreate,
                JoinState::IdentityProvision,
                JoinState::SignupFanout,
                JoinState::WebhookDispatch,
            ]
        );
        // "0" donation adds nothing.
        assert_eq!(harness.billing.subscriptions()[0].line_items.len(), 1);
    }

    #[tokio::test]
    async fn recent_mandate_is_reused_not_recreated() {
        let harness = Harness::new();
        harness.mandates.add_mandate(
            "a@b.com",
            chrono::Utc::now() - chrono::Duration::seconds(30),
            "MD_PREV",
        );

        let outcome = harness
            .handler()
            .handle(direct_debit_request())
            .await
            .unwrap();
        assert_eq!(outcome.mandate.unwrap().id, "MD_PREV");
        assert_eq!(harness.mandates.create_calls(), 0);
        assert!(!outcome
            .saga
            .created_resources()
            .iter()
            .any(|r| matches!(r, CreatedResource::Mandate(_))));
    }

    #[tokio::test]
    async fn one_off_donation_of_ten_is_charged_as_1000() {
        let harness = Harness::new();
        let mut request = card_request();
        request.donation_amount = Some("10".to_string());

        harness.handler().handle(request).await.unwrap();
        let items = &harness.billing.subscriptions()[0].line_items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].kind, LineItemKind::OneOffCharge);
        assert_eq!(items[1].unit_amount.value(), 1000);
    }

    #[tokio::test]
    async fn recurring_donation_uses_recurring_item() {
        let harness = Harness::new();
        let mut request = card_request();
        request.donation_amount = Some("10".to_string());
        request.recur_donation = true;

        harness.handler().handle(request).await.unwrap();
        let items = &harness.billing.subscriptions()[0].line_items;
        assert_eq!(items[1].kind, LineItemKind::AddOn);
        assert_eq!(items[1].item_price_id, "donation-recurring-GBP-monthly");
        assert!(!items.iter().any(|i| i.kind == LineItemKind::OneOffCharge));
    }

    #[tokio::test]
    async fn existing_identity_account_is_skipped() {
        let harness =
            Harness::with_identity(MockIdentityProvider::new().with_existing_user("ada@example.com"));
        let outcome = harness.handler().handle(card_request()).await.unwrap();

        assert!(outcome.identity_user_id.is_none());
        assert!(harness.identity.created().is_empty());
        assert_eq!(outcome.saga.state(), JoinState::Done);
    }

    #[tokio::test]
    async fn supplied_password_is_used() {
        let harness = Harness::new();
        let mut request = card_request();
        request.password = Some("hunter2".to_string());

        harness.handler().handle(request).await.unwrap();
        assert_eq!(harness.identity.created()[0].password_len, 7);
    }

    #[tokio::test]
    async fn billing_disabled_succeeds_without_customer() {
        let webhook = Arc::new(MockWebhookDispatcher::new());
        let handler = SubmitJoinHandler::new(
            Harness::config(),
            Arc::new(InMemorySessionLock::new()),
        )
        .with_webhook(webhook.clone());

        let outcome = handler.handle(card_request()).await.unwrap();
        assert!(outcome.customer.is_none());
        assert_eq!(webhook.delivered().len(), 1);
    }

    #[tokio::test]
    async fn update_flow_reuses_customer_and_skips_duplicate_guard() {
        let harness = Harness::new();
        let existing = harness.billing.add_customer("ada@example.com");
        harness.billing.add_subscription(
            &existing,
            "membership-standard-GBP-monthly",
            SubscriptionStatus::Active,
        );
        let mut request = card_request();
        request.is_update_flow = true;

        let outcome = harness.handler().handle(request).await.unwrap();
        assert_eq!(outcome.customer.unwrap().id, existing);
        assert_eq!(harness.billing.call_count("create_customer"), 0);
        assert_eq!(harness.billing.call_count("has_active_membership_subscription"), 0);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failures
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn duplicate_membership_stops_before_any_billing_write() {
        let harness = Harness::new();
        let existing = harness.billing.add_customer("ada@example.com");
        harness.billing.add_subscription(
            &existing,
            "membership-standard-GBP-monthly",
            SubscriptionStatus::Active,
        );

        let err = harness.handler().handle(card_request()).await.unwrap_err();
        assert_eq!(err, JoinError::DuplicateActiveMembership);
        assert_eq!(err.error_code(), 25);
        assert_eq!(harness.billing.write_count(), 0);
        assert!(harness.identity.created().is_empty());
        assert!(harness.webhook.delivered().is_empty());
    }

    #[tokio::test]
    async fn lapsed_membership_does_not_block() {
        let harness = Harness::new();
        let existing = harness.billing.add_customer("ada@example.com");
        harness.billing.add_subscription(
            &existing,
            "membership-standard-GBP-monthly",
            SubscriptionStatus::Cancelled,
        );

        assert!(harness.handler().handle(card_request()).await.is_ok());
    }

    #[tokio::test]
    async fn expired_card_token_is_code_1_and_no_subscription() {
        let harness = Harness::new();
        harness.billing.fail_on(
            "create_customer",
            BillingError::invalid_request("The temp token has expired"),
        );

        let err = harness.handler().handle(card_request()).await.unwrap_err();
        assert_eq!(err, JoinError::TokenExpired);
        assert_eq!(err.error_code(), 1);
        assert_eq!(harness.billing.call_count("create_subscription"), 0);
    }

    #[tokio::test]
    async fn insufficient_funds_compensates_newest_first() {
        let harness = Harness::new();
        harness.billing.fail_on(
            "create_subscription",
            BillingError::payment("Insufficient funds in the account."),
        );
        let compensator = Arc::new(RecordingCompensator {
            seen: Mutex::new(Vec::new()),
        });
        let handler = harness.handler().with_compensator(compensator.clone());

        let err = handler.handle(direct_debit_request()).await.unwrap_err();
        assert_eq!(err.error_code(), 2);

        let seen = compensator.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], CreatedResource::Customer(_)));
        assert!(matches!(seen[1], CreatedResource::Mandate(_)));
    }

    #[tokio::test]
    async fn mandate_validation_reports_fields_and_skips_billing() {
        let harness = Harness::new();
        harness.mandates.fail_create(MandateError::ValidationFailed {
            message: "Validation failed".to_string(),
            fields: vec!["branch_code".to_string()],
        });

        let err = harness
            .handler()
            .handle(direct_debit_request())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), 3);
        assert_eq!(err.fields(), vec!["branch_code"]);
        assert_eq!(harness.billing.write_count(), 0);
    }

    #[tokio::test]
    async fn identity_failure_after_payment_fails_the_join() {
        let harness = Harness::with_identity(
            MockIdentityProvider::new()
                .with_error(IdentityError::CredentialsUnavailable("401".to_string())),
        );

        let err = harness.handler().handle(card_request()).await.unwrap_err();
        assert_eq!(err.error_code(), 40);
        // Payment already went through.
        assert_eq!(harness.billing.subscriptions().len(), 1);
        assert!(harness.webhook.delivered().is_empty());
    }

    #[tokio::test]
    async fn non_blocking_signup_failure_is_tolerated() {
        let harness = Harness::new();
        let failing = MockSignupAdapter::failing("mailchimp", false);
        let handler = harness.handler().with_signup(Arc::new(failing.clone()));

        assert!(handler.handle(card_request()).await.is_ok());
        assert_eq!(failing.calls(), 1);
        assert_eq!(harness.webhook.delivered().len(), 1);
    }

    #[tokio::test]
    async fn blocking_signup_failure_fails_before_webhook() {
        let harness = Harness::new();
        let ok = MockSignupAdapter::succeeding("zetkin", false);
        let handler = harness
            .handler()
            .with_signup(Arc::new(MockSignupAdapter::failing("action_network", true)))
            .with_signup(Arc::new(ok.clone()));

        let err = handler.handle(card_request()).await.unwrap_err();
        assert_eq!(err.error_code(), 42);
        assert_eq!(ok.calls(), 0);
        assert!(harness.webhook.delivered().is_empty());
    }

    #[tokio::test]
    async fn webhook_failure_is_fatal() {
        let harness = Harness::new();
        let handler = harness
            .handler()
            .with_webhook(Arc::new(MockWebhookDispatcher::failing()));

        let err = handler.handle(card_request()).await.unwrap_err();
        assert_eq!(err.error_code(), 41);
    }

    #[tokio::test]
    async fn invalid_request_touches_no_provider() {
        let harness = Harness::new();
        let mut request = card_request();
        request.email = String::new();

        let err = harness.handler().handle(request).await.unwrap_err();
        assert_eq!(err.error_code(), 20);
        assert!(harness.billing.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_membership_plan_is_validation_error() {
        let harness = Harness::new();
        let mut request = card_request();
        request.membership = "platinum".to_string();

        let err = harness.handler().handle(request).await.unwrap_err();
        assert_eq!(err.fields(), vec!["membership"]);
    }

    #[tokio::test]
    async fn direct_debit_without_mandate_provider_is_rejected() {
        let handler = SubmitJoinHandler::new(
            Harness::config(),
            Arc::new(InMemorySessionLock::new()),
        )
        .with_billing(Arc::new(MockBillingProvider::new()));

        let err = handler.handle(direct_debit_request()).await.unwrap_err();
        assert_eq!(err.fields(), vec!["paymentMethod"]);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Concurrency
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn concurrent_same_token_submissions_are_serialized() {
        let billing = MockBillingProvider::new();
        let handler = SubmitJoinHandler::new(
            Harness::config(),
            Arc::new(InMemorySessionLock::new()),
        )
        .with_billing(Arc::new(SlowBilling {
            inner: billing.clone(),
            delay: Duration::from_millis(50),
        }));

        let (first, second) = tokio::join!(
            handler.handle(card_request()),
            handler.handle(card_request())
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(JoinError::DuplicateActiveMembership))));
        assert_eq!(billing.call_count("create_customer"), 1);
    }

    #[tokio::test]
    async fn contender_gives_up_after_max_wait() {
        let billing = MockBillingProvider::new();
        let config = JoinPipelineConfig {
            lock_max_wait: Duration::from_millis(10),
            ..Harness::config()
        };
        let handler = SubmitJoinHandler::new(config, Arc::new(InMemorySessionLock::new()))
            .with_billing(Arc::new(SlowBilling {
                inner: billing.clone(),
                delay: Duration::from_millis(200),
            }));

        let (first, second) = tokio::join!(
            handler.handle(card_request()),
            handler.handle(card_request())
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        let err = results.into_iter().find_map(Result::err).unwrap();
        assert_eq!(err, JoinError::LockUnavailable);
        assert_eq!(err.error_code(), 30);
    }

    #[tokio::test]
    async fn different_tokens_run_independently() {
        let harness = Harness::new();
        let handler = harness.handler();
        let mut other = direct_debit_request();
        other.email = "someone@else.com".to_string();

        let (a, b) = tokio::join!(handler.handle(card_request()), handler.handle(other));
        assert!(a.is_ok());
        assert!(b.is_ok());
    }
}
