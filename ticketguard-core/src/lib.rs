//! Short-lived, server-signed entry tokens for venue access.
//!
//! A device asks the issuing authority for a token bound to one ticket
//! ([`IssuanceClient::issue_token`]), checks it against the clock before presenting it
//! ([`status`]), and a gate verifier accepts each token at most once
//! ([`TokenVerifier::verify`]).
//!
//! ```rust,no_run
//! use ticketguard_core::{now_epoch_seconds, IssuanceClient, IssuerConfig, TokenStatus};
//!
//! # async fn run() -> Result<(), ticketguard_core::IssueTokenError> {
//! let client = IssuanceClient::new(IssuerConfig::new("https://issuer.example"))?;
//! let token = client.issue_token("T1", "D1", Some(8)).await?;
//! assert_eq!(token.status_at(now_epoch_seconds()), TokenStatus::Active);
//! # Ok(())
//! # }
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod error;
pub use error::*;

mod issuer;
pub use issuer::*;

pub mod logger;

mod replay;
pub use replay::*;

mod token;
pub use token::*;

mod validity;
pub use validity::*;

mod verifier;
pub use verifier::*;

// private modules
mod http_request;
