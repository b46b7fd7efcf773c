//! Action Network person signup helper.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::domain::join::JoinRequest;
use crate::ports::{SignupAdapter, SignupError};

#[derive(Clone)]
pub struct ActionNetworkConfig {
    pub api_key: SecretString,
    pub base_url: String,
    /// Tags added to every new member.
    pub tags: Vec<String>,
    pub blocking: bool,
    pub timeout: Duration,
}

impl ActionNetworkConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: "https://actionnetwork.org".to_string(),
            tags: Vec::new(),
            blocking: false,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct PersonSignup<'a> {
    person: Person<'a>,
    add_tags: &'a [String],
}

#[derive(Debug, Serialize)]
struct Person<'a> {
    given_name: &'a str,
    family_name: &'a str,
    email_addresses: Vec<EmailAddress<'a>>,
    postal_addresses: Vec<PostalAddress<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    phone_numbers: Vec<PhoneNumber<'a>>,
}

#[derive(Debug, Serialize)]
struct EmailAddress<'a> {
    address: &'a str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct PostalAddress<'a> {
    address_lines: Vec<&'a str>,
    locality: &'a str,
    postal_code: &'a str,
    country: &'a str,
}

#[derive(Debug, Serialize)]
struct PhoneNumber<'a> {
    number: &'a str,
    status: &'static str,
}

fn subscription_status(opted_in: bool) -> &'static str {
    if opted_in {
        "subscribed"
    } else {
        "unsubscribed"
    }
}

pub struct ActionNetworkSignup {
    config: ActionNetworkConfig,
    http_client: reqwest::Client,
}

impl ActionNetworkSignup {
    pub fn new(config: ActionNetworkConfig) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl SignupAdapter for ActionNetworkSignup {
    fn name(&self) -> &'static str {
        "action_network"
    }

    fn is_blocking(&self) -> bool {
        self.config.blocking
    }

    async fn signup(&self, request: &JoinRequest) -> Result<(), SignupError> {
        let email = request.normalized_email();
        let mut address_lines = vec![request.address_line1.as_str()];
        if let Some(line2) = request.address_line2.as_deref() {
            address_lines.push(line2);
        }

        let body = PersonSignup {
            person: Person {
                given_name: request.first_name.trim(),
                family_name: request.last_name.trim(),
                email_addresses: vec![EmailAddress {
                    address: &email,
                    status: subscription_status(request.contact_by_email),
                }],
                postal_addresses: vec![PostalAddress {
                    address_lines,
                    locality: &request.address_city,
                    postal_code: &request.address_postcode,
                    country: &request.address_country,
                }],
                phone_numbers: request
                    .phone_number
                    .as_deref()
                    .filter(|p| !p.trim().is_empty())
                    .map(|number| PhoneNumber {
                        number,
                        status: subscription_status(request.contact_by_phone),
                    })
                    .into_iter()
                    .collect(),
            },
            add_tags: &self.config.tags,
        };

        let response = self
            .http_client
            .post(format!("{}/api/v2/people/", self.config.base_url))
            .header("OSDI-API-Token", self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| SignupError::Network(e.to_string()))?;

        super::check_status(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::join::fixtures::card_request;
    use mockito::Matcher;

    #[tokio::test]
    async fn posts_person_with_tags_and_consent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/people/")
            .match_header("OSDI-API-Token", "an_key")
            .match_body(Matcher::PartialJsonString(
                r#"{"person":{"given_name":"Ada","email_addresses":[{"address":"ada@example.com","status":"unsubscribed"}]},"add_tags":["member"]}"#
                    .to_string(),
            ))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let mut config = ActionNetworkConfig::new(SecretString::new("an_key".to_string()));
        config.base_url = server.url();
        config.tags = vec!["member".to_string()];
        ActionNetworkSignup::new(config)
            .signup(&card_request())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/api/v2/people/")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let mut config = ActionNetworkConfig::new(SecretString::new("k".to_string()));
        config.base_url = server.url();
        let err = ActionNetworkSignup::new(config)
            .signup(&card_request())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SignupError::Rejected {
                status: 500,
                body: "boom".to_string()
            }
        );
    }
}
