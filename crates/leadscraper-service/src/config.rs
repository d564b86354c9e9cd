//! Service configuration.

use std::path::Path;

use serde::Deserialize;

use crate::crypto::random_token;

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development (the default).
    #[default]
    Development,
    /// Production: secure cookies, no fallback to the in-memory store.
    Production,
}

impl Environment {
    fn from_env_value(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Whether this is a production deployment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:5000").
    pub listen_addr: String,

    /// Deployment environment.
    pub environment: Environment,

    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,

    /// Maximum pooled database connections (default: 10).
    pub db_max_connections: u32,

    /// Key used to sign session cookies.
    pub session_secret: String,

    /// Session lifetime in seconds (default: 7 days).
    pub session_ttl_seconds: u64,

    /// Redis URL for the session store (optional).
    pub redis_url: Option<String>,

    /// Stripe secret API key (optional).
    pub stripe_secret_key: Option<String>,

    /// Stripe webhook signing secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe API base URL.
    pub stripe_api_base: String,

    /// Mollie API key (optional).
    pub mollie_api_key: Option<String>,

    /// Mollie API base URL.
    pub mollie_api_base: String,

    /// Apify token. Only reported at startup; scraping is mocked.
    pub apify_token: Option<String>,

    /// Public domain the service is reachable under (optional).
    pub custom_domain: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Price of one credit in the smallest currency unit (default: 100).
    pub credit_price_cents: i64,

    /// Currency code for purchases (default: "eur").
    pub currency: String,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    secret_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
}

/// Mollie secrets file structure.
#[derive(Debug, Deserialize)]
struct MollieSecrets {
    api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let (stripe_secret_key, stripe_webhook_secret) = load_stripe_secrets();
        let mollie_api_key = load_mollie_secrets();

        let session_secret = std::env::var("SESSION_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                tracing::warn!(
                    "SESSION_SECRET not set - using a random secret, sessions will not survive restarts"
                );
                random_token(32)
            });

        let custom_domain = std::env::var("CUSTOM_DOMAIN")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let cors_origins = std::env::var("CORS_ORIGINS")
            .ok()
            .map(|s| s.split(',').map(|o| o.trim().to_string()).collect())
            .unwrap_or_else(|| match &custom_domain {
                Some(domain) => vec![public_url(domain)],
                None => vec!["*".into()],
            });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            environment: std::env::var("APP_ENV")
                .map(|v| Environment::from_env_value(&v))
                .unwrap_or_default(),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", defaults.db_max_connections),
            session_secret,
            session_ttl_seconds: parse_env("SESSION_TTL_SECONDS", defaults.session_ttl_seconds),
            redis_url: std::env::var("REDIS_URL").ok().filter(|s| !s.is_empty()),
            stripe_secret_key,
            stripe_webhook_secret,
            stripe_api_base: std::env::var("STRIPE_API_BASE").unwrap_or(defaults.stripe_api_base),
            mollie_api_key,
            mollie_api_base: std::env::var("MOLLIE_API_BASE").unwrap_or(defaults.mollie_api_base),
            apify_token: std::env::var("APIFY_TOKEN").ok().filter(|s| !s.is_empty()),
            custom_domain,
            cors_origins,
            credit_price_cents: parse_env("CREDIT_PRICE_CENTS", defaults.credit_price_cents),
            currency: std::env::var("CURRENCY")
                .map(|c| c.to_ascii_lowercase())
                .unwrap_or(defaults.currency),
            max_body_bytes: parse_env("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: parse_env(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
        }
    }

    /// Base URL used in provider redirect and webhook URLs.
    #[must_use]
    pub fn public_base_url(&self) -> String {
        self.custom_domain
            .as_deref()
            .map_or_else(|| "http://localhost:5000".to_string(), public_url)
    }

    /// URL of an endpoint under the public base URL.
    #[must_use]
    pub fn public_url(&self, path: &str) -> String {
        format!("{}{path}", self.public_base_url().trim_end_matches('/'))
    }
}

/// Turn a bare domain into an https URL.
fn public_url(domain: &str) -> String {
    let domain = domain.trim();
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

const STRIPE_SECRET_PATHS: [&str; 2] = [".secrets/stripe.json", "../.secrets/stripe.json"];
const MOLLIE_SECRET_PATHS: [&str; 2] = [".secrets/mollie.json", "../.secrets/mollie.json"];

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

/// Load Stripe secrets from the environment, falling back to a secrets file.
fn load_stripe_secrets() -> (Option<String>, Option<String>) {
    resolve_stripe_secrets(
        non_empty_env("STRIPE_SECRET_KEY"),
        non_empty_env("STRIPE_WEBHOOK_SECRET"),
        &STRIPE_SECRET_PATHS,
    )
}

fn resolve_stripe_secrets(
    env_key: Option<String>,
    env_webhook_secret: Option<String>,
    paths: &[&str],
) -> (Option<String>, Option<String>) {
    if env_key.is_some() {
        return (env_key, env_webhook_secret);
    }

    for path in paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return (
                Some(secrets.secret_key),
                env_webhook_secret.or(secrets.webhook_secret),
            );
        }
    }

    tracing::debug!("Stripe not configured");
    (None, env_webhook_secret)
}

/// Load the Mollie API key from the environment, falling back to a secrets file.
fn load_mollie_secrets() -> Option<String> {
    resolve_mollie_key(non_empty_env("MOLLIE_API_KEY"), &MOLLIE_SECRET_PATHS)
}

fn resolve_mollie_key(env_key: Option<String>, paths: &[&str]) -> Option<String> {
    if env_key.is_some() {
        return env_key;
    }

    paths.iter().find_map(|path| {
        let secrets = load_secrets_file::<MollieSecrets>(path).ok()?;
        tracing::info!(path = %path, "Loaded Mollie secrets from file");
        Some(secrets.api_key)
    })
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:5000".into(),
            environment: Environment::Development,
            database_url: None,
            db_max_connections: 10,
            session_secret: "development-session-secret".into(),
            session_ttl_seconds: 7 * 24 * 60 * 60,
            redis_url: None,
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            stripe_api_base: "https://api.stripe.com/v1".into(),
            mollie_api_key: None,
            mollie_api_base: "https://api.mollie.com/v2".into(),
            apify_token: None,
            custom_domain: None,
            cors_origins: vec!["*".into()],
            credit_price_cents: 100,
            currency: "eur".into(),
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
