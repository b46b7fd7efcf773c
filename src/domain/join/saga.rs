//! Join pipeline state machine and the ledger of resources it created.
//!
//! The pipeline only moves forward. Steps that do not apply to a request
//! (e.g. mandate creation for card payments) are skipped, never revisited.
//! `Failed` is terminal and reachable from any non-terminal state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::foundation::SessionToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinState {
    Start,
    BillingCheck,
    MandateCreate,
    CustomerCreate,
    SubscriptionCreate,
    IdentityProvision,
    SignupFanout,
    WebhookDispatch,
    Done,
    Failed,
}

impl JoinState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JoinState::Done | JoinState::Failed)
    }

    /// Forward-only transition rule.
    pub fn can_transition_to(&self, next: JoinState) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == JoinState::Failed || next > *self
    }
}

impl std::fmt::Display for JoinState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JoinState::Start => "start",
            JoinState::BillingCheck => "billing_check",
            JoinState::MandateCreate => "mandate_create",
            JoinState::CustomerCreate => "customer_create",
            JoinState::SubscriptionCreate => "subscription_create",
            JoinState::IdentityProvision => "identity_provision",
            JoinState::SignupFanout => "signup_fanout",
            JoinState::WebhookDispatch => "webhook_dispatch",
            JoinState::Done => "done",
            JoinState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Something an earlier step created in an external system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CreatedResource {
    Mandate(String),
    Customer(String),
    Subscription(String),
    IdentityAccount(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletedStep {
    pub step: JoinState,
    pub resource: Option<CreatedResource>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid join transition from {from} to {to}")]
pub struct InvalidTransition {
    pub from: JoinState,
    pub to: JoinState,
}

/// Progress of one orchestration run.
#[derive(Debug, Clone, Serialize)]
pub struct JoinSaga {
    session_token: SessionToken,
    state: JoinState,
    failed_at: Option<JoinState>,
    completed: Vec<CompletedStep>,
}

impl JoinSaga {
    pub fn new(session_token: SessionToken) -> Self {
        Self {
            session_token,
            state: JoinState::Start,
            failed_at: None,
            completed: Vec::new(),
        }
    }

    pub fn session_token(&self) -> SessionToken {
        self.session_token
    }

    pub fn state(&self) -> JoinState {
        self.state
    }

    /// The step that was running when the saga failed.
    pub fn failed_at(&self) -> Option<JoinState> {
        self.failed_at
    }

    pub fn completed(&self) -> &[CompletedStep] {
        &self.completed
    }

    /// Resources created so far, newest first (compensation order).
    pub fn created_resources(&self) -> Vec<&CreatedResource> {
        self.completed
            .iter()
            .rev()
            .filter_map(|s| s.resource.as_ref())
            .collect()
    }

    /// Enters `step`.
    pub fn begin(&mut self, step: JoinState) -> Result<(), InvalidTransition> {
        self.transition(step)
    }

    /// Records that the current step finished, optionally creating a resource.
    pub fn complete(&mut self, resource: Option<CreatedResource>) {
        self.completed.push(CompletedStep {
            step: self.state,
            resource,
            completed_at: Utc::now(),
        });
    }

    pub fn finish(&mut self) -> Result<(), InvalidTransition> {
        self.transition(JoinState::Done)
    }

    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.failed_at = Some(self.state);
            self.state = JoinState::Failed;
        }
    }

    fn transition(&mut self, to: JoinState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(to) {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}
