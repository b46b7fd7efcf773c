//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the join pipeline and the outside world. Adapters implement these ports.
//!
//! ## Provider Ports
//!
//! - `BillingProvider` - customers and subscriptions (Chargebee, Stripe)
//! - `MandateProvider` - direct debit mandates (GoCardless)
//! - `IdentityProvider` - member accounts (Auth0)
//! - `SignupAdapter` - CRM and mailing list enrolment
//! - `WebhookDispatcher` - operator notification
//!
//! ## Coordination Ports
//!
//! - `SessionLock` - per-session mutual exclusion
//! - `Compensator` - undo hook for created resources

mod billing_provider;
mod compensator;
mod identity_provider;
mod mandate_provider;
mod session_lock;
mod signup_adapter;
mod webhook_dispatcher;

pub use billing_provider::{
    BillingError, BillingErrorCode, BillingProvider, CustomerRecord, NewCustomer,
    NewSubscription, PaymentSource, SubscriptionRecord, SubscriptionStatus,
};
pub use compensator::{Compensator, NoCompensation};
pub use identity_provider::{IdentityError, IdentityProvider, NewIdentityAccount};
pub use mandate_provider::{MandateError, MandateProvider, MandateRecord, MandateRequest};
pub use session_lock::{LockError, SessionLock, SessionLockGuard};
pub use signup_adapter::{SignupAdapter, SignupError};
pub use webhook_dispatcher::{WebhookDispatcher, WebhookError};
