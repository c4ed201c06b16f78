//! Verifier-side checks for entry tokens: signature, validity window, single use.
//!
//! The signature is HMAC-SHA256 keyed with the authority's shared signing secret over
//!
//! ```text
//! {ticketId}|{deviceId}|{startAtEpochSec}|{ttlSec}|{nonce}
//! ```
//!
//! encoded as unpadded base64url.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::replay::{InMemoryReplayGuard, ReplayError, ReplayGuard};
use crate::token::IssuedToken;
use crate::validity::TokenStatus;

type HmacSha256 = Hmac<Sha256>;

/// Reasons a token is refused at the gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerificationError {
    /// No signing secret is configured.
    #[error("signing secret is not configured")]
    MissingSecret,
    /// The signature does not match the token fields.
    #[error("signature_mismatch")]
    SignatureMismatch,
    /// The validity window has not started.
    #[error("not_yet_valid: window starts at {start_at}")]
    NotYetValid {
        /// Inclusive window start.
        start_at: i64,
    },
    /// The validity window has ended.
    #[error("expired: window ended at {end_at}")]
    Expired {
        /// Exclusive window end.
        end_at: i64,
    },
    /// The token was already used, or the replay guard failed.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Computes the authority signature for the given token fields.
///
/// # Errors
///
/// Returns [`VerificationError::MissingSecret`] for an empty secret.
pub fn compute_signature(
    secret: &[u8],
    ticket_id: &str,
    device_id: &str,
    start_at_epoch_seconds: i64,
    ttl_seconds: u32,
    nonce: &str,
) -> Result<String, VerificationError> {
    if secret.is_empty() {
        return Err(VerificationError::MissingSecret);
    }
    // HMAC accepts keys of any length; only the empty key is refused above
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).map_err(|_| VerificationError::MissingSecret)?;
    mac.update(
        format!("{ticket_id}|{device_id}|{start_at_epoch_seconds}|{ttl_seconds}|{nonce}")
            .as_bytes(),
    );
    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Checks presented tokens against the shared secret and a [`ReplayGuard`].
pub struct TokenVerifier<G = InMemoryReplayGuard> {
    secret: SecretString,
    guard: G,
}

impl TokenVerifier<InMemoryReplayGuard> {
    /// Creates a verifier with a fresh in-memory replay guard.
    #[must_use]
    pub fn in_memory(secret: SecretString) -> Self {
        Self::new(secret, InMemoryReplayGuard::new())
    }
}

impl<G: ReplayGuard> TokenVerifier<G> {
    /// Creates a verifier backed by `guard`.
    #[must_use]
    pub const fn new(secret: SecretString, guard: G) -> Self {
        Self { secret, guard }
    }

    /// Accepts the token at `now`, consuming its nonce.
    ///
    /// Checks run in order: signature, validity window, replay. A token refused for its
    /// signature or window does not consume its nonce.
    ///
    /// # Errors
    ///
    /// Returns the first failed check as a [`VerificationError`].
    pub fn verify(&self, token: &IssuedToken, now: i64) -> Result<(), VerificationError> {
        let expected = compute_signature(
            self.secret.expose_secret().as_bytes(),
            token.ticket_id(),
            token.device_id(),
            token.start_at_epoch_seconds(),
            token.ttl_seconds(),
            token.nonce().as_str(),
        )?;

        let presented = token.sig().as_str().as_bytes();
        if !bool::from(expected.as_bytes().ct_eq(presented)) {
            log::info!("verify_failed_sig ticket={}", token.ticket_id());
            return Err(VerificationError::SignatureMismatch);
        }

        match token.status_at(now) {
            TokenStatus::Active => {}
            TokenStatus::NotYetValid => {
                log::info!("verify_failed_not_yet_valid ticket={}", token.ticket_id());
                return Err(VerificationError::NotYetValid {
                    start_at: token.start_at_epoch_seconds(),
                });
            }
            TokenStatus::Expired => {
                log::info!("verify_failed_expired ticket={}", token.ticket_id());
                return Err(VerificationError::Expired {
                    end_at: token.end_at_epoch_seconds(),
                });
            }
        }

        self.guard.consume(token, now)?;
        log::info!(
            "verify_ok ticket={} device={}",
            token.ticket_id(),
            token.device_id()
        );
        Ok(())
    }

    /// The replay guard backing this verifier.
    #[must_use]
    pub const fn guard(&self) -> &G {
        &self.guard
    }
}
