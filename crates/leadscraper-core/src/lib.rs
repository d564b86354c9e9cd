//! Core types and utilities for LeadScraper.
//!
//! This crate provides the foundational types shared by the store, the HTTP
//! service and the client SDK:
//!
//! - **Identifiers**: `UserId`, `LeadId`, `BlogPostId`, `TransactionId`
//! - **Users**: `User`, `BusinessInfo`
//! - **Leads**: `Lead`, `NewLead`
//! - **Blog**: `BlogPost`
//! - **Credits**: `CreditChange`, `CreditTransaction`, `TransactionKind`
//! - **Framing**: the `\n---MESSAGE---\n` progress stream codec
//! - **Scrape**: `ScrapeRequest` and the streamed `ScrapeEvent` messages
//!
//! # Credits
//!
//! One credit buys one scraped lead. Balances are stored as `i64` and never
//! drop below zero.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod blog;
pub mod credits;
pub mod error;
pub mod framing;
pub mod ids;
pub mod lead;
pub mod scrape;
pub mod user;

pub use blog::BlogPost;
pub use credits::{CreditChange, CreditTransaction, TransactionKind};
pub use error::{CoreError, Result};
pub use framing::{encode_message, FramingError, MessageDecoder, MESSAGE_DELIMITER};
pub use ids::{BlogPostId, IdError, LeadId, TransactionId, UserId};
pub use lead::{Lead, NewLead};
pub use scrape::{ScrapeEvent, ScrapeRequest, ScrapeResult};
pub use user::{normalize_username, BusinessInfo, User};
