//! Time-window evaluation for issued tokens.
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use strum::{Display, EnumString};

use crate::token::IssuedToken;

/// Where a point in time falls relative to a token's validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TokenStatus {
    /// `now` is before the window start.
    NotYetValid,
    /// `now` is inside `[start, start + ttl)`.
    Active,
    /// `now` is at or past the window end.
    Expired,
}

/// Evaluates `token` at `now` (seconds since the Unix epoch).
///
/// The start instant is inclusive and the end instant exclusive, so every `now` maps to
/// exactly one status.
#[must_use]
pub fn status(token: &IssuedToken, now: i64) -> TokenStatus {
    if now < token.start_at_epoch_seconds() {
        TokenStatus::NotYetValid
    } else if now < token.end_at_epoch_seconds() {
        TokenStatus::Active
    } else {
        TokenStatus::Expired
    }
}

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// Clocks set before 1970 read as `0`.
#[must_use]
pub fn now_epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
        })
}

impl IssuedToken {
    /// Shorthand for [`status`].
    #[must_use]
    pub fn status_at(&self, now: i64) -> TokenStatus {
        status(self, now)
    }

    /// Time left in the window while the token is [`TokenStatus::Active`], `None` otherwise.
    #[must_use]
    pub fn remaining_at(&self, now: i64) -> Option<Duration> {
        match self.status_at(now) {
            TokenStatus::Active => {
                let left = self.end_at_epoch_seconds().saturating_sub(now);
                u64::try_from(left).ok().map(Duration::from_secs)
            }
            TokenStatus::NotYetValid | TokenStatus::Expired => None,
        }
    }
}
