//! LeadScraper HTTP API Service.
//!
//! This crate provides the HTTP API for LeadScraper, including:
//!
//! - Registration, login and cookie sessions
//! - Credit balance, purchases and history
//! - Lead scraping (plain JSON or framed progress stream)
//! - Stripe/Mollie payment intents and webhooks
//! - Blog posts
//!
//! # Authentication
//!
//! Users authenticate with username and password. A successful login issues
//! a signed `leadscraper.sid` cookie that names a server-side session held in
//! Redis (or in memory when Redis is not configured).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers stay async for the router

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod mollie;
pub mod payments;
pub mod routes;
pub mod session;
pub mod startup;
pub mod state;
pub mod stripe;

pub use config::{Environment, ServiceConfig};
pub use error::ApiError;
pub use ledger::{CreditLedger, LedgerError};
pub use mollie::{MollieClient, MollieError};
pub use payments::{PaymentError, PaymentProvider, ProviderKind};
pub use routes::create_router;
pub use session::{MemorySessionStore, RedisSessionStore, SessionStore};
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
