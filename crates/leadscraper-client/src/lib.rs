//! LeadScraper Client SDK.
//!
//! This crate provides a typed client for the LeadScraper API. The client
//! keeps the session cookie issued at login, so a single [`ApiClient`] acts as
//! one logged-in browser.
//!
//! # Example
//!
//! ```no_run
//! use leadscraper_client::{ApiClient, ScrapeEvent, ScrapeRequest};
//!
//! # async fn example() -> Result<(), leadscraper_client::ClientError> {
//! let client = ApiClient::new("http://localhost:5000")?;
//! client.login("a@b.de", "pw").await?;
//!
//! let events = client
//!     .scrape_stream(&ScrapeRequest::default(), |event| {
//!         if let ScrapeEvent::Progress { message, percent } = event {
//!             println!("{percent}% {message}");
//!         }
//!     })
//!     .await?;
//!
//! println!("received {} messages", events.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ApiClient, ClientOptions};
pub use error::ClientError;
pub use leadscraper_core::{BlogPost, BusinessInfo, Lead, ScrapeEvent, ScrapeRequest, ScrapeResult};
pub use types::*;
