//! Process startup: logging, adapter wiring and the HTTP server.
//!
//! Every adapter is constructed here from `AppConfig` and injected into
//! `SubmitJoinHandler`. Nothing below this module reads configuration.

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::adapters::auth::{Auth0Config, Auth0IdentityProvider};
use crate::adapters::billing::MockBillingProvider;
use crate::adapters::chargebee::{ChargebeeBillingAdapter, ChargebeeConfig};
use crate::adapters::gocardless::{GoCardlessConfig, GoCardlessMandateAdapter};
use crate::adapters::http::{build_app, JoinAppState};
use crate::adapters::lock::{InMemorySessionLock, RedisSessionLock};
use crate::adapters::signup::{
    ActionNetworkConfig, ActionNetworkSignup, MailchimpConfig, MailchimpSignup, ZetkinConfig,
    ZetkinSignup,
};
use crate::adapters::stripe::{StripeBillingAdapter, StripeConfig};
use crate::adapters::webhook::{HttpWebhookDispatcher, WebhookConfig};
use crate::application::handlers::join::{JoinPipelineConfig, SubmitJoinHandler};
use crate::config::{
    AppConfig, BillingBackend, BillingConfig, ConfigError, LockBackend, ServerConfig,
    ValidationError,
};
use crate::ports::{BillingProvider, SessionLock, SignupAdapter};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Redis connection failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for StartupError {
    fn from(err: ValidationError) -> Self {
        StartupError::Config(ConfigError::ValidationFailed(err))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides `server.log_level`. Production logs are JSON.
pub fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Build the join handler with every adapter the configuration enables.
pub async fn build_handler(config: &AppConfig) -> Result<SubmitJoinHandler, StartupError> {
    let lock = build_lock(config).await?;
    let pipeline = JoinPipelineConfig {
        catalog: config.billing.catalog(),
        currency: config.billing.currency.clone(),
        lock_max_wait: config.lock.max_wait(),
        mandate_window: config.mandate.reuse_window(),
    };
    let mut handler = SubmitJoinHandler::new(pipeline, lock);

    if let Some(billing) = build_billing(&config.billing) {
        tracing::info!(provider = billing.name(), "Billing enabled");
        handler = handler.with_billing(billing);
    }

    let features = &config.features;

    if features.use_gocardless {
        let token = config
            .mandate
            .gocardless_access_token
            .clone()
            .ok_or(ValidationError::MissingRequired("GOCARDLESS_ACCESS_TOKEN"))?;
        let mut gc = GoCardlessConfig::new(token, config.mandate.sandbox)
            .with_timeout(config.mandate.timeout());
        if let Some(url) = &config.mandate.base_url {
            gc = gc.with_base_url(url.clone());
        }
        tracing::info!(sandbox = config.mandate.sandbox, "GoCardless mandates enabled");
        handler = handler.with_mandate(Arc::new(GoCardlessMandateAdapter::new(gc)));
    }

    if features.create_auth0_account {
        let identity = &config.identity;
        let (Some(domain), Some(client_id), Some(secret)) = (
            identity.auth0_domain.as_deref(),
            identity.auth0_client_id.clone(),
            identity.auth0_client_secret.clone(),
        ) else {
            return Err(ValidationError::MissingRequired("AUTH0_DOMAIN").into());
        };
        let mut auth0 = Auth0Config::new(domain, client_id, secret)
            .with_connection(identity.auth0_connection.clone())
            .with_default_roles(identity.default_roles())
            .with_timeout(identity.timeout());
        if let Some(url) = &identity.base_url {
            auth0 = auth0.with_base_url(url.clone());
        }
        tracing::info!(domain = domain, "Auth0 account creation enabled");
        handler = handler.with_identity(Arc::new(Auth0IdentityProvider::new(auth0)));
    }

    for signup in build_signups(config)? {
        tracing::info!(
            adapter = signup.name(),
            blocking = signup.is_blocking(),
            "Signup adapter enabled"
        );
        handler = handler.with_signup(signup);
    }

    if features.use_webhook {
        let url = config
            .webhook
            .url
            .clone()
            .ok_or(ValidationError::MissingRequired("WEBHOOK__URL"))?;
        handler = handler.with_webhook(Arc::new(HttpWebhookDispatcher::new(WebhookConfig {
            url,
            signing_secret: config.webhook.signing_secret.clone(),
            timeout: config.webhook.timeout(),
        })));
    }

    Ok(handler)
}

async fn build_lock(config: &AppConfig) -> Result<Arc<dyn SessionLock>, StartupError> {
    match config.lock.backend {
        LockBackend::Memory => Ok(Arc::new(InMemorySessionLock::new())),
        LockBackend::Redis => {
            let url = config
                .lock
                .redis_url
                .as_deref()
                .ok_or(ValidationError::MissingRequired("LOCK__REDIS_URL"))?;
            let conn = redis::Client::open(url)?
                .get_multiplexed_tokio_connection()
                .await?;
            let mut lock =
                RedisSessionLock::new(conn, config.lock.ttl(), config.lock.poll_interval());
            if let Some(prefix) = &config.lock.key_prefix {
                lock = lock.with_key_prefix(prefix.clone());
            }
            tracing::info!("Using Redis session lock");
            Ok(Arc::new(lock))
        }
    }
}

fn build_billing(billing: &BillingConfig) -> Option<Arc<dyn BillingProvider>> {
    match billing.backend {
        BillingBackend::None => None,
        BillingBackend::Mock => Some(Arc::new(MockBillingProvider::new())),
        BillingBackend::Chargebee => {
            let site = billing.chargebee_site.as_deref()?;
            let key = billing.chargebee_api_key.clone()?;
            let mut cb = ChargebeeConfig::new(site, key)
                .with_gateway_account(billing.chargebee_gateway_account_id.clone())
                .with_timeout(billing.timeout());
            if let Some(url) = &billing.base_url {
                cb = cb.with_base_url(url.clone());
            }
            Some(Arc::new(ChargebeeBillingAdapter::new(cb)))
        }
        BillingBackend::Stripe => {
            let key = billing.stripe_api_key.clone()?;
            let mut stripe = StripeConfig::new(key).with_timeout(billing.timeout());
            if let Some(url) = &billing.base_url {
                stripe = stripe.with_base_url(url.clone());
            }
            Some(Arc::new(StripeBillingAdapter::new(stripe)))
        }
    }
}

/// Signup adapters in a fixed order: Action Network, Mailchimp, Zetkin.
fn build_signups(config: &AppConfig) -> Result<Vec<Arc<dyn SignupAdapter>>, StartupError> {
    let features = &config.features;
    let signup = &config.signup;
    let mut adapters: Vec<Arc<dyn SignupAdapter>> = Vec::new();

    if features.use_action_network {
        let section = &signup.action_network;
        let key = section
            .api_key
            .clone()
            .ok_or(ValidationError::MissingRequired("ACTION_NETWORK__API_KEY"))?;
        let mut an = ActionNetworkConfig::new(key);
        an.tags = section.tags();
        an.blocking = section.blocking;
        an.timeout = signup.timeout();
        if let Some(url) = &section.base_url {
            an.base_url = url.clone();
        }
        adapters.push(Arc::new(ActionNetworkSignup::new(an)));
    }

    if features.use_mailchimp {
        let section = &signup.mailchimp;
        let (Some(key), Some(list_id)) = (section.api_key.clone(), section.list_id.clone()) else {
            return Err(ValidationError::MissingRequired("MAILCHIMP__API_KEY").into());
        };
        let mut mc = MailchimpConfig::new(key, list_id);
        mc.tags = section.tags();
        mc.blocking = section.blocking;
        mc.timeout = signup.timeout();
        mc.base_url = section.base_url.clone();
        adapters.push(Arc::new(MailchimpSignup::new(mc)));
    }

    if features.use_zetkin {
        let section = &signup.zetkin;
        let (Some(token), Some(org)) = (
            section.access_token.clone(),
            section.organization_id.clone(),
        ) else {
            return Err(ValidationError::MissingRequired("ZETKIN__ACCESS_TOKEN").into());
        };
        let mut zk = ZetkinConfig::new(token, org);
        zk.tag_ids = section.tag_ids()?;
        zk.blocking = section.blocking;
        zk.timeout = signup.timeout();
        if let Some(url) = &section.base_url {
            zk.base_url = url.clone();
        }
        adapters.push(Arc::new(ZetkinSignup::new(zk)));
    }

    Ok(adapters)
}

/// Load, validate, wire and serve until Ctrl-C.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    config.validate()?;
    let addr = config.server.socket_addr()?;

    let handler = build_handler(&config).await?;
    let state = JoinAppState::new(handler)
        .with_account_url(config.server.account_management_url.clone());
    let app = build_app(state, &config.server);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?config.server.environment, "Join service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Join service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
