//! Single-use enforcement for issued tokens.
//!
//! A verifier must refuse a `(ticketId, nonce)` pair it has already accepted for at least
//! the lifetime of that token's validity window. Entries are kept until the window end and
//! pruned lazily afterwards.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

use crate::token::IssuedToken;

/// Errors raised while consuming a token.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplayError {
    /// The `(ticketId, nonce)` pair was already consumed within its window.
    #[error("token already consumed for ticket {ticket_id}")]
    AlreadyConsumed {
        /// Ticket the replayed token was issued for.
        ticket_id: String,
    },
    /// The guard's internal state is unusable.
    #[error("replay guard lock error: {0}")]
    Lock(String),
}

/// Tracks consumed nonces on behalf of a verifier.
pub trait ReplayGuard: Send + Sync {
    /// Marks the token as used.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::AlreadyConsumed`] if the same `(ticketId, nonce)` pair was
    /// consumed before and its window has not yet ended at `now`.
    fn consume(&self, token: &IssuedToken, now: i64) -> Result<(), ReplayError>;
}

/// Process-local [`ReplayGuard`].
#[derive(Debug, Default)]
pub struct InMemoryReplayGuard {
    /// `(ticket_id, nonce)` to the exclusive end of the token's window.
    consumed: Mutex<HashMap<(String, String), i64>>,
}

impl InMemoryReplayGuard {
    /// Creates an empty guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries still tracked, including any not yet pruned.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Lock`] if the mutex is poisoned.
    pub fn len(&self) -> Result<usize, ReplayError> {
        let consumed = self
            .consumed
            .lock()
            .map_err(|e| ReplayError::Lock(format!("mutex poisoned: {e}")))?;
        Ok(consumed.len())
    }

    /// Whether no entries are tracked.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::Lock`] if the mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, ReplayError> {
        Ok(self.len()? == 0)
    }
}

impl ReplayGuard for InMemoryReplayGuard {
    fn consume(&self, token: &IssuedToken, now: i64) -> Result<(), ReplayError> {
        let mut consumed = self
            .consumed
            .lock()
            .map_err(|e| ReplayError::Lock(format!("mutex poisoned: {e}")))?;

        consumed.retain(|_, expires_at| *expires_at > now);

        let key = (
            token.ticket_id().to_string(),
            token.nonce().as_str().to_string(),
        );
        if consumed.contains_key(&key) {
            log::warn!("replayed entry token for ticket {}", token.ticket_id());
            return Err(ReplayError::AlreadyConsumed {
                ticket_id: key.0,
            });
        }

        // a token consumed after its window still occupies a slot until the next prune
        consumed.insert(key, token.end_at_epoch_seconds().max(now.saturating_add(1)));
        drop(consumed);
        Ok(())
    }
}
