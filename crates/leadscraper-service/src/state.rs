//! Application state.

use std::sync::Arc;

use leadscraper_store::Store;

use crate::auth::{Authenticator, PasswordAuthenticator};
use crate::config::ServiceConfig;
use crate::ledger::CreditLedger;
use crate::mollie::MollieClient;
use crate::payments::{PaymentProvider, ProviderKind};
use crate::session::SessionStore;
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Server-side sessions.
    pub sessions: Arc<dyn SessionStore>,

    /// Login credential checks.
    pub authenticator: Arc<dyn Authenticator>,

    /// Credit balance operations.
    pub ledger: CreditLedger,

    /// Configured payment providers.
    pub payment_providers: Vec<PaymentProvider>,

    /// Service configuration.
    pub config: ServiceConfig,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        sessions: Arc<dyn SessionStore>,
        config: ServiceConfig,
    ) -> Self {
        let mut payment_providers = Vec::new();

        // Create Stripe client if configured
        if let Some(key) = &config.stripe_secret_key {
            match StripeClient::new(key, config.stripe_webhook_secret.clone()) {
                Ok(client) => {
                    if !client.has_webhook_secret() {
                        tracing::warn!("STRIPE_WEBHOOK_SECRET not set - Stripe webhooks will be rejected");
                    }
                    tracing::info!("Stripe integration enabled");
                    payment_providers.push(PaymentProvider::Stripe(
                        client.with_base_url(&config.stripe_api_base),
                    ));
                }
                Err(e) => tracing::error!(error = %e, "Failed to create Stripe client"),
            }
        } else {
            tracing::warn!("Stripe not configured - Stripe payments will not be available");
        }

        // Create Mollie client if configured
        if let Some(key) = &config.mollie_api_key {
            match MollieClient::new(key) {
                Ok(client) => {
                    tracing::info!("Mollie integration enabled");
                    payment_providers.push(PaymentProvider::Mollie(
                        client.with_base_url(&config.mollie_api_base),
                    ));
                }
                Err(e) => tracing::error!(error = %e, "Failed to create Mollie client"),
            }
        } else {
            tracing::warn!("Mollie not configured - Mollie payments will not be available");
        }

        Self {
            authenticator: Arc::new(PasswordAuthenticator::new(store.clone())),
            ledger: CreditLedger::new(store.clone()),
            store,
            sessions,
            payment_providers,
            config,
        }
    }

    /// The configured provider of the given kind.
    #[must_use]
    pub fn payment_provider(&self, kind: ProviderKind) -> Option<&PaymentProvider> {
        self.payment_providers.iter().find(|p| p.kind() == kind)
    }

    /// The Stripe client, if Stripe is configured.
    #[must_use]
    pub fn stripe(&self) -> Option<&StripeClient> {
        self.payment_providers.iter().find_map(|p| match p {
            PaymentProvider::Stripe(client) => Some(client),
            PaymentProvider::Mollie(_) => None,
        })
    }
}
