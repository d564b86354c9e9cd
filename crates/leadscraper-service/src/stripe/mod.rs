//! Stripe integration.
//!
//! Stripe handles:
//! - Customer registration when business details are saved
//! - Credit purchases via payment intents
//! - Signed webhooks for payment events

pub mod client;
pub mod types;

pub use client::{StripeClient, StripeError};
pub use types::*;
