//! CRM and mailing list signup adapters.
//!
//! Each adapter is independently enabled and carries its own `blocking` flag.

mod action_network;
mod mailchimp;
mod mock;
mod zetkin;

pub use action_network::{ActionNetworkConfig, ActionNetworkSignup};
pub use mailchimp::{subscriber_hash, MailchimpConfig, MailchimpSignup};
pub use mock::MockSignupAdapter;
pub use zetkin::{ZetkinConfig, ZetkinSignup};

use crate::ports::SignupError;

async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, SignupError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SignupError::Rejected {
        status: status.as_u16(),
        body,
    })
}

async fn check_status(response: reqwest::Response) -> Result<(), SignupError> {
    check_response(response).await.map(|_| ())
}
