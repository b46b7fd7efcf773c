//! Integration tests for the join HTTP endpoints.
//!
//! These tests drive the full router (middleware included) with in-memory
//! providers:
//! 1. Success and error envelopes
//! 2. HTTP status mapping for classified failures
//! 3. Unknown submission fields reaching the operator webhook

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use join_flow::adapters::billing::MockBillingProvider;
use join_flow::adapters::gocardless::MockMandateProvider;
use join_flow::adapters::http::{build_app, JoinAppState};
use join_flow::adapters::lock::InMemorySessionLock;
use join_flow::adapters::webhook::MockWebhookDispatcher;
use join_flow::application::handlers::join::{JoinPipelineConfig, SubmitJoinHandler};
use join_flow::config::ServerConfig;
use join_flow::domain::join::{DonationItems, MembershipPlan, PlanCatalog};
use join_flow::ports::{BillingError, MandateError, SubscriptionStatus};

// =============================================================================
// Test Infrastructure
// =============================================================================

const ACCOUNT_URL: &str = "https://members.example.org/account";

struct TestApp {
    router: Router,
    billing: MockBillingProvider,
    mandates: MockMandateProvider,
    webhook: Arc<MockWebhookDispatcher>,
}

fn catalog() -> PlanCatalog {
    PlanCatalog {
        plans: vec![MembershipPlan {
            id: "standard".to_string(),
            label: "Standard".to_string(),
            item_price_id: "membership-standard-GBP-monthly".to_string(),
            unit_amount: 500,
            suggested: None,
        }],
        donation: DonationItems {
            one_off_item_price_id: "donation-one-off-GBP".to_string(),
            recurring_item_price_id: "donation-recurring-GBP-monthly".to_string(),
        },
    }
}

fn test_app() -> TestApp {
    let billing = MockBillingProvider::new();
    let mandates = MockMandateProvider::new();
    let webhook = Arc::new(MockWebhookDispatcher::new());

    let config = JoinPipelineConfig {
        catalog: catalog(),
        ..JoinPipelineConfig::default()
    };
    let handler = SubmitJoinHandler::new(config, Arc::new(InMemorySessionLock::new()))
        .with_billing(Arc::new(billing.clone()))
        .with_mandate(Arc::new(mandates.clone()))
        .with_webhook(webhook.clone());

    TestApp {
        router: build_app(
            JoinAppState::new(handler).with_account_url(Some(ACCOUNT_URL.to_string())),
            &ServerConfig::default(),
        ),
        billing,
        mandates,
        webhook,
    }
}

fn card_body() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.com",
        "addressLine1": "1 Analytical Row",
        "addressCity": "London",
        "addressPostcode": "N1 1AA",
        "addressCountry": "GB",
        "paymentMethod": "creditCard",
        "membership": "standard",
        "paymentToken": "tok_123",
        "sessionToken": "6f1c7d3e-2b4a-4f1e-9c3d-1a2b3c4d5e6f"
    })
}

fn direct_debit_body() -> Value {
    json!({
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "a@b.com",
        "addressLine1": "1 Analytical Row",
        "addressCity": "London",
        "addressPostcode": "N1 1AA",
        "addressCountry": "GB",
        "paymentMethod": "directDebit",
        "membership": "standard",
        "donationAmount": "0",
        "ddAccountHolderName": "Ada Lovelace",
        "ddAccountNumber": "55779911",
        "ddSortCode": "20-00-00",
        "sessionToken": "0d9e8f7a-6b5c-4d3e-8f1a-2b3c4d5e6f70"
    })
}

fn post_join(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/join")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

// =============================================================================
// Success Paths
// =============================================================================

#[tokio::test]
async fn health_returns_ok() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn card_join_returns_ok_and_forwards_raw_submission() {
    let app = test_app();
    let mut body = card_body();
    body["utmSource"] = json!("newsletter");

    let (status, response) = send(&app.router, post_join(body.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({ "status": "ok" }));

    let delivered = app.webhook.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0]["utmSource"], "newsletter");
    assert_eq!(app.billing.subscriptions().len(), 1);
}

#[tokio::test]
async fn direct_debit_join_returns_ok() {
    let app = test_app();

    let (status, _) = send(&app.router, post_join(direct_debit_body().to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.mandates.create_calls(), 1);
}

#[tokio::test]
async fn response_carries_request_id() {
    let app = test_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// =============================================================================
// Error Envelopes
// =============================================================================

#[tokio::test]
async fn duplicate_membership_is_409_with_code_25() {
    let app = test_app();
    let customer = app.billing.add_customer("ada@example.com");
    app.billing.add_subscription(
        &customer,
        "membership-standard-GBP-monthly",
        SubscriptionStatus::Active,
    );

    let (status, body) = send(&app.router, post_join(card_body().to_string())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
    assert_eq!(body["error_code"], 25);
    assert_eq!(body["link"], ACCOUNT_URL);
    assert_eq!(app.billing.write_count(), 0);
}

#[tokio::test]
async fn malformed_json_is_400_with_code_20() {
    let app = test_app();

    let (status, body) = send(&app.router, post_join("{not json".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], 20);
    assert_eq!(body["fields"], json!(["body"]));
    assert!(body.get("link").is_none());
}

#[tokio::test]
async fn missing_email_names_the_field() {
    let app = test_app();
    let mut body = card_body();
    body["email"] = json!("");

    let (status, response) = send(&app.router, post_join(body.to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error_code"], 20);
    assert_eq!(response["fields"], json!(["email"]));
    assert!(app.billing.calls().is_empty());
}

#[tokio::test]
async fn insufficient_funds_is_402_without_provider_text() {
    let app = test_app();
    app.billing.fail_on(
        "create_subscription",
        BillingError::payment("Insufficient funds in the account. ref=ch_secret_42"),
    );

    let (status, body) = send(&app.router, post_join(card_body().to_string())).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error_code"], 2);
    assert!(!body.to_string().contains("ch_secret_42"));
}

#[tokio::test]
async fn mandate_validation_is_400_with_fields() {
    let app = test_app();
    app.mandates.fail_create(MandateError::ValidationFailed {
        message: "Validation failed".to_string(),
        fields: vec!["branch_code".to_string()],
    });

    let (status, body) = send(&app.router, post_join(direct_debit_body().to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error_code"], 3);
    assert_eq!(body["fields"], json!(["branch_code"]));
}

#[tokio::test]
async fn resubmitted_form_charges_once() {
    let app = test_app();

    let (first, second) = tokio::join!(
        send(&app.router, post_join(card_body().to_string())),
        send(&app.router, post_join(card_body().to_string()))
    );

    let mut statuses = vec![first.0.as_u16(), second.0.as_u16()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);
    assert_eq!(app.billing.call_count("create_customer"), 1);
}
