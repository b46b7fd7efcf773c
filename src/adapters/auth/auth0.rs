//! Auth0 management API adapter for member account provisioning.
//!
//! This adapter implements the `IdentityProvider` port. Every operation:
//!
//! 1. Fetches a management API token with the client-credentials grant
//! 2. Calls the management API with that token
//!
//! Tokens are not cached; a join makes at most two identity calls.
//!
//! # Example
//!
//! ```ignore
//! let config = Auth0Config::new("acme.eu.auth0.com", client_id, client_secret)
//!     .with_default_roles(vec!["rol_member".to_string()]);
//! let identity = Auth0IdentityProvider::new(config);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::ports::{IdentityError, IdentityProvider, NewIdentityAccount};

/// Configuration for the Auth0 adapter.
#[derive(Debug, Clone)]
pub struct Auth0Config {
    /// Tenant base URL (e.g., "https://acme.eu.auth0.com").
    base_url: String,

    client_id: String,

    client_secret: SecretString,

    /// Database connection new users are created in.
    connection: String,

    /// Role ids assigned to every new member.
    default_roles: Vec<String>,

    timeout: Duration,
}

impl Auth0Config {
    pub fn new(domain: &str, client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            base_url: format!("https://{}", domain.trim_end_matches('/')),
            client_id: client_id.into(),
            client_secret,
            connection: "Username-Password-Authentication".to_string(),
            default_roles: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn with_default_roles(mut self, roles: Vec<String>) -> Self {
        self.default_roles = roles;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Management API audience for this tenant.
    fn audience(&self) -> String {
        format!("{}/api/v2/", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Auth0User {
    user_id: String,
}

#[derive(Debug, Serialize)]
struct CreateUserBody<'a> {
    email: &'a str,
    password: &'a str,
    connection: &'a str,
    given_name: &'a str,
    family_name: &'a str,
    name: String,
    email_verified: bool,
    app_metadata: AppMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct AppMetadata<'a> {
    plan_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    billing_customer_id: Option<&'a str>,
}

pub struct Auth0IdentityProvider {
    config: Auth0Config,
    http_client: reqwest::Client,
}

impl Auth0IdentityProvider {
    pub fn new(config: Auth0Config) -> Self {
        let http_client = crate::adapters::http_client(config.timeout);
        Self {
            config,
            http_client,
        }
    }

    async fn management_token(&self) -> Result<SecretString, IdentityError> {
        let response = self
            .http_client
            .post(format!("{}/oauth/token", self.config.base_url))
            .json(&TokenRequest {
                grant_type: "client_credentials",
                client_id: &self.config.client_id,
                client_secret: self.config.client_secret.expose_secret(),
                audience: self.config.audience(),
            })
            .send()
            .await
            .map_err(|e| IdentityError::CredentialsUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Auth0 token request failed");
            return Err(IdentityError::CredentialsUnavailable(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdentityError::CredentialsUnavailable(e.to_string()))?;
        Ok(SecretString::new(token.access_token))
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response, IdentityError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %body, action, "Auth0 request failed");
        if status.is_server_error() {
            Err(IdentityError::ServiceUnavailable(format!("{} returned {}", action, status)))
        } else {
            Err(IdentityError::Rejected(format!("{} returned {}: {}", action, status, body)))
        }
    }

    async fn assign_roles(&self, token: &SecretString, user_id: &str) -> Result<(), IdentityError> {
        if self.config.default_roles.is_empty() {
            return Ok(());
        }
        let response = self
            .http_client
            .post(format!(
                "{}/api/v2/users/{}/roles",
                self.config.base_url,
                urlencoding::encode(user_id)
            ))
            .bearer_auth(token.expose_secret())
            .json(&serde_json::json!({ "roles": self.config.default_roles }))
            .send()
            .await
            .map_err(|e| IdentityError::ServiceUnavailable(e.to_string()))?;
        Self::check(response, "assign roles").await?;
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for Auth0IdentityProvider {
    fn name(&self) -> &'static str {
        "auth0"
    }

    async fn user_exists(&self, email: &str) -> Result<bool, IdentityError> {
        let token = self.management_token().await?;
        let response = self
            .http_client
            .get(format!("{}/api/v2/users-by-email", self.config.base_url))
            .bearer_auth(token.expose_secret())
            .query(&[("email", email)])
            .send()
            .await
            .map_err(|e| IdentityError::ServiceUnavailable(e.to_string()))?;
        let response = Self::check(response, "users-by-email").await?;

        let users: Vec<Auth0User> = response
            .json()
            .await
            .map_err(|e| IdentityError::ServiceUnavailable(e.to_string()))?;
        Ok(!users.is_empty())
    }

    async fn create_user(&self, account: NewIdentityAccount) -> Result<String, IdentityError> {
        let token = self.management_token().await?;
        let body = CreateUserBody {
            email: &account.email,
            password: account.password.expose_secret(),
            connection: &self.config.connection,
            given_name: &account.given_name,
            family_name: &account.family_name,
            name: format!("{} {}", account.given_name, account.family_name),
            email_verified: false,
            app_metadata: AppMetadata {
                plan_id: &account.plan_id,
                billing_customer_id: account.billing_customer_id.as_deref(),
            },
        };

        let response = self
            .http_client
            .post(format!("{}/api/v2/users", self.config.base_url))
            .bearer_auth(token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::ServiceUnavailable(e.to_string()))?;
        let response = Self::check(response, "create user").await?;
        let user: Auth0User = response
            .json()
            .await
            .map_err(|e| IdentityError::ServiceUnavailable(e.to_string()))?;

        self.assign_roles(&token, &user.user_id).await?;
        tracing::info!(user_id = %user.user_id, "Identity account created");
        Ok(user.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn provider(server: &mockito::Server, roles: Vec<String>) -> Auth0IdentityProvider {
        let config = Auth0Config::new("tenant.auth0.com", "client", SecretString::new("secret".to_string()))
            .with_base_url(server.url())
            .with_default_roles(roles);
        Auth0IdentityProvider::new(config)
    }

    async fn token_mock(server: &mut mockito::Server) -> mockito::Mock {
        server
            .mock("POST", "/oauth/token")
            .match_body(Matcher::PartialJsonString(
                r#"{"grant_type":"client_credentials","client_id":"client"}"#.to_string(),
            ))
            .with_status(200)
            .with_body(r#"{"access_token":"mgmt-token","token_type":"Bearer"}"#)
            .create_async()
            .await
    }

    fn account() -> NewIdentityAccount {
        NewIdentityAccount {
            email: "ada@example.com".to_string(),
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
            password: SecretString::new("correct-horse".to_string()),
            plan_id: "membership-standard".to_string(),
            billing_customer_id: Some("cb_1".to_string()),
        }
    }

    #[test]
    fn domain_becomes_https_base_url() {
        let config = Auth0Config::new("tenant.auth0.com/", "c", SecretString::new("s".to_string()));
        assert_eq!(config.base_url, "https://tenant.auth0.com");
        assert_eq!(config.audience(), "https://tenant.auth0.com/api/v2/");
    }

    #[tokio::test]
    async fn existing_user_found_by_email() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server).await;
        let _users = server
            .mock("GET", "/api/v2/users-by-email")
            .match_query(Matcher::UrlEncoded("email".into(), "ada@example.com".into()))
            .match_header("authorization", "Bearer mgmt-token")
            .with_status(200)
            .with_body(r#"[{"user_id":"auth0|1","email":"ada@example.com"}]"#)
            .create_async()
            .await;

        assert!(provider(&server, vec![])
            .user_exists("ada@example.com")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn token_failure_is_credentials_error() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/oauth/token")
            .with_status(401)
            .with_body(r#"{"error":"access_denied"}"#)
            .create_async()
            .await;

        let err = provider(&server, vec![])
            .user_exists("ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::CredentialsUnavailable(_)));
    }

    #[tokio::test]
    async fn create_user_sends_metadata_and_assigns_roles() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server).await;
        let _create = server
            .mock("POST", "/api/v2/users")
            .match_body(Matcher::PartialJsonString(
                r#"{"email":"ada@example.com","password":"correct-horse","app_metadata":{"plan_id":"membership-standard","billing_customer_id":"cb_1"}}"#
                    .to_string(),
            ))
            .with_status(201)
            .with_body(r#"{"user_id":"auth0-new"}"#)
            .create_async()
            .await;
        let roles = server
            .mock("POST", "/api/v2/users/auth0-new/roles")
            .match_body(Matcher::Json(serde_json::json!({"roles": ["rol_member"]})))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let user_id = provider(&server, vec!["rol_member".to_string()])
            .create_user(account())
            .await
            .unwrap();
        assert_eq!(user_id, "auth0-new");
        roles.assert_async().await;
    }

    #[tokio::test]
    async fn role_assignment_escapes_connection_prefixed_id() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server).await;
        let _create = server
            .mock("POST", "/api/v2/users")
            .with_status(201)
            .with_body(r#"{"user_id":"auth0|abc123"}"#)
            .create_async()
            .await;
        let roles = server
            .mock("POST", "/api/v2/users/auth0%7Cabc123/roles")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let user_id = provider(&server, vec!["rol_member".to_string()])
            .create_user(account())
            .await
            .unwrap();
        assert_eq!(user_id, "auth0|abc123");
        roles.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _token = token_mock(&mut server).await;
        let _create = server
            .mock("POST", "/api/v2/users")
            .with_status(409)
            .with_body(r#"{"statusCode":409,"message":"The user already exists."}"#)
            .create_async()
            .await;

        let err = provider(&server, vec![]).create_user(account()).await.unwrap_err();
        assert!(matches!(err, IdentityError::Rejected(_)));
    }
}
