//! Mollie integration.
//!
//! Mollie webhooks are unsigned: they only carry the payment id, so the
//! payment is fetched back from the API before anything is credited.

pub mod client;
pub mod types;

pub use client::{format_amount, MollieClient, MollieError};
pub use types::*;
