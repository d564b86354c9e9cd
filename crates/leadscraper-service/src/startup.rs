//! Backend selection at startup.

use std::sync::Arc;

use leadscraper_store::{MemoryStore, PgStore, PgStoreOptions, Store, StoreError};

use crate::config::ServiceConfig;
use crate::session::{MemorySessionStore, RedisSessionStore, SessionError, SessionStore};

/// Open the configured store.
///
/// Without `DATABASE_URL` the in-memory store is used. If PostgreSQL stays
/// unreachable after the connection retries, production fails and every
/// other environment falls back to the in-memory store.
///
/// # Errors
///
/// Returns the connection error in production.
pub async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, StoreError> {
    let Some(url) = &config.database_url else {
        tracing::warn!("DATABASE_URL not set - using in-memory store, data will not persist");
        return Ok(Arc::new(MemoryStore::new()));
    };

    let options = PgStoreOptions {
        max_connections: config.db_max_connections,
        ..PgStoreOptions::new(url.clone())
    };

    match PgStore::connect(&options).await {
        Ok(store) => Ok(Arc::new(store)),
        Err(e) if config.environment.is_production() => Err(e),
        Err(e) => {
            tracing::warn!(
                error = %e,
                "PostgreSQL unavailable - falling back to in-memory store"
            );
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Open the configured session store.
///
/// Redis is used when `REDIS_URL` is set. Outside production an unreachable
/// Redis falls back to in-memory sessions.
///
/// # Errors
///
/// Returns the connection error in production.
pub async fn open_sessions(config: &ServiceConfig) -> Result<Arc<dyn SessionStore>, SessionError> {
    let Some(url) = &config.redis_url else {
        tracing::info!("REDIS_URL not set - using in-memory sessions");
        return Ok(Arc::new(MemorySessionStore::new()));
    };

    match RedisSessionStore::connect(url).await {
        Ok(store) => {
            tracing::info!("Connected to Redis session store");
            Ok(Arc::new(store))
        }
        Err(e) if config.environment.is_production() => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable - falling back to in-memory sessions");
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}
