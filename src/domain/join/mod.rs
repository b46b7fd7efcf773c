//! Join domain - the membership application and everything derived from it.
//!
//! - `request` - the submitted `JoinRequest` and its validated form
//! - `plan` - plan catalogue and line item composition
//! - `errors` - the client-facing error taxonomy
//! - `classifier` - provider failure text -> taxonomy
//! - `saga` - pipeline state machine and created-resource ledger

mod classifier;
mod errors;
mod plan;
mod request;
mod saga;

pub use classifier::{
    classify_billing_failure, classify_mandate_failure, BillingFailureKind, MandateFailureType,
};
pub use errors::JoinError;
pub use plan::{
    DonationItems, LineItem, LineItemKind, MembershipPlan, PlanCatalog, SubscriptionPlan,
    SuggestedContribution,
};
pub use request::{BillingAddress, Donation, JoinRequest, PaymentMethod, ValidatedJoin};
pub use saga::{CompletedStep, CreatedResource, InvalidTransition, JoinSaga, JoinState};
