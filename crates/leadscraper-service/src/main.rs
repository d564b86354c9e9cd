//! LeadScraper Service - HTTP API for lead scraping and credits
//!
//! This is the main entry point for the leadscraper service.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use leadscraper_service::startup::{open_sessions, open_store};
use leadscraper_service::{create_router, AppState, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leadscraper=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting LeadScraper Service");

    // Load configuration from environment
    let config = ServiceConfig::from_env();

    tracing::info!(
        listen_addr = %config.listen_addr,
        environment = ?config.environment,
        database_configured = %config.database_url.is_some(),
        redis_configured = %config.redis_url.is_some(),
        stripe_configured = %config.stripe_secret_key.is_some(),
        mollie_configured = %config.mollie_api_key.is_some(),
        apify_configured = %config.apify_token.is_some(),
        custom_domain = ?config.custom_domain,
        "Service configuration loaded"
    );

    let store = match open_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!(error = %e, "Failed to open database");
            std::process::exit(1);
        }
    };
    let sessions = open_sessions(&config).await?;

    // Build app state
    let state = AppState::new(store, sessions, config.clone());

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
