//! HTTP request handlers.

pub mod auth;
pub mod blog;
pub mod business;
pub mod credits;
pub mod health;
pub mod leads;
pub mod payments;
pub mod webhooks;
