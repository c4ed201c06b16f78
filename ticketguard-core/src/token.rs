//! Wire shapes for the issuance request and the issued entry token.
use serde::{Deserialize, Serialize};

use crate::error::{IssueTokenError, MalformedToken};

/// Body of an issuance request, as sent to the issuing authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    ticket_id: String,
    device_id: String,
    /// Requested validity in seconds; the authority may ignore or clamp it.
    #[serde(rename = "ttl")]
    ttl_requested: Option<u32>,
}

impl IssueRequest {
    /// Builds a request for one ticket/device pair.
    ///
    /// # Errors
    ///
    /// Returns [`IssueTokenError::InvalidInput`] if either identifier is empty.
    pub fn new(
        ticket_id: &str,
        device_id: &str,
        ttl_requested: Option<u32>,
    ) -> Result<Self, IssueTokenError> {
        if ticket_id.is_empty() {
            return Err(IssueTokenError::InvalidInput { field: "ticketId" });
        }
        if device_id.is_empty() {
            return Err(IssueTokenError::InvalidInput { field: "deviceId" });
        }
        Ok(Self {
            ticket_id: ticket_id.to_string(),
            device_id: device_id.to_string(),
            ttl_requested,
        })
    }

    /// The ticket being requested.
    #[must_use]
    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    /// The requesting device.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The caller's requested validity, if any.
    #[must_use]
    pub const fn ttl_requested(&self) -> Option<u32> {
        self.ttl_requested
    }
}

/// Authority-assigned anti-replay value. Opaque: never parsed or regenerated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    /// The nonce exactly as issued.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Authority signature over the other token fields. Opaque to the client.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Signature(String);

impl Signature {
    /// The signature exactly as issued.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Signature(..)")
    }
}

/// Success response as it appears on the wire, before validation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueTokenResponse {
    ticket_id: String,
    device_id: String,
    start_at_epoch_sec: i64,
    ttl_sec: i64,
    nonce: String,
    sig: String,
}

/// A short-lived, server-signed entry token.
///
/// Tokens are immutable once decoded. The validity window is the half-open interval
/// `[start_at_epoch_seconds, start_at_epoch_seconds + ttl_seconds)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    ticket_id: String,
    device_id: String,
    #[serde(rename = "startAtEpochSec")]
    start_at_epoch_seconds: i64,
    #[serde(rename = "ttlSec")]
    ttl_seconds: u32,
    nonce: Nonce,
    sig: Signature,
}

impl TryFrom<IssueTokenResponse> for IssuedToken {
    type Error = MalformedToken;

    fn try_from(raw: IssueTokenResponse) -> Result<Self, Self::Error> {
        for (field, value) in [
            ("ticketId", &raw.ticket_id),
            ("deviceId", &raw.device_id),
            ("nonce", &raw.nonce),
            ("sig", &raw.sig),
        ] {
            if value.is_empty() {
                return Err(MalformedToken::EmptyField { field });
            }
        }

        let ttl_seconds = u32::try_from(raw.ttl_sec)
            .ok()
            .filter(|ttl| *ttl > 0)
            .ok_or(MalformedToken::NonPositiveTtl(raw.ttl_sec))?;

        Ok(Self {
            ticket_id: raw.ticket_id,
            device_id: raw.device_id,
            start_at_epoch_seconds: raw.start_at_epoch_sec,
            ttl_seconds,
            nonce: Nonce(raw.nonce),
            sig: Signature(raw.sig),
        })
    }
}

impl IssuedToken {
    /// Decodes a token from a success response body.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedToken`] if a required field is missing or mistyped, if `ttlSec`
    /// is not positive, or if a required string is empty.
    pub fn from_slice(body: &[u8]) -> Result<Self, MalformedToken> {
        let raw: IssueTokenResponse = serde_json::from_slice(body)?;
        raw.try_into()
    }

    /// Decodes a token from its JSON text form.
    ///
    /// # Errors
    ///
    /// See [`IssuedToken::from_slice`].
    pub fn from_json_str(body: &str) -> Result<Self, MalformedToken> {
        Self::from_slice(body.as_bytes())
    }

    /// Encodes the token back into the issuance response shape.
    ///
    /// # Errors
    ///
    /// Returns an error only if serialization itself fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Checks that the token was issued for the given request.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedToken::IdentityMismatch`] naming the first differing identifier.
    pub fn matches_request(&self, request: &IssueRequest) -> Result<(), MalformedToken> {
        for (field, expected, actual) in [
            ("ticketId", request.ticket_id(), self.ticket_id()),
            ("deviceId", request.device_id(), self.device_id()),
        ] {
            if expected != actual {
                return Err(MalformedToken::IdentityMismatch {
                    field,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The ticket this token grants access for.
    #[must_use]
    pub fn ticket_id(&self) -> &str {
        &self.ticket_id
    }

    /// The device this token was issued to.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Inclusive start of the validity window, assigned by the authority.
    #[must_use]
    pub const fn start_at_epoch_seconds(&self) -> i64 {
        self.start_at_epoch_seconds
    }

    /// Length of the validity window. Always positive.
    #[must_use]
    pub const fn ttl_seconds(&self) -> u32 {
        self.ttl_seconds
    }

    /// Exclusive end of the validity window.
    #[must_use]
    pub fn end_at_epoch_seconds(&self) -> i64 {
        self.start_at_epoch_seconds
            .saturating_add(i64::from(self.ttl_seconds))
    }

    /// The anti-replay nonce, passed through unchanged.
    #[must_use]
    pub const fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    /// The authority signature, passed through unchanged.
    #[must_use]
    pub const fn sig(&self) -> &Signature {
        &self.sig
    }
}
