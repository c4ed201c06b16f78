use thiserror::Error;

/// Maximum number of characters of a failure body included in the rendered message.
const BODY_SNIPPET_CHARS: usize = 200;

/// Error outputs from an entry token issuance call.
///
/// Every failure of [`crate::IssuanceClient::issue_token`] maps to exactly one variant;
/// nothing is retried or swallowed on the caller's behalf.
#[derive(Debug, Error)]
pub enum IssueTokenError {
    /// The caller supplied an unusable argument (e.g. an empty identifier).
    #[error("invalid_input: {field} must not be empty")]
    InvalidInput {
        /// Name of the offending argument.
        field: &'static str,
    },
    /// The outbound request could not be built from the configured location.
    #[error("bad_request_construction: {reason}")]
    BadRequestConstruction {
        /// What was wrong with the configured location.
        reason: String,
    },
    /// Transport failure before any response was obtained (DNS, reset, timeout).
    #[error("network_error: {url}: {source}")]
    Network {
        /// The URL the request was sent to, without the credential query parameter.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The issuing authority answered outside the 2xx range.
    #[error("HTTP {status}: {}", snippet(.body))]
    InvalidStatus {
        /// The HTTP status code.
        status: u16,
        /// The raw response body, kept verbatim for diagnostics.
        body: String,
    },
    /// A 2xx response whose body is not a well-formed token.
    #[error("decoding_error: {0}")]
    Decoding(#[from] MalformedToken),
}

impl IssueTokenError {
    /// Returns `true` when the failure was the per-call timeout elapsing.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network { source, .. } if source.is_timeout())
    }
}

/// Raised by the token model when an issuance response is structurally invalid.
#[derive(Debug, Error)]
pub enum MalformedToken {
    /// A required field is missing, has the wrong type, or the body is not JSON at all.
    #[error("malformed token payload: {0}")]
    Payload(#[from] serde_json::Error),
    /// `ttlSec` is zero, negative, or too large to be a duration in seconds.
    #[error("ttlSec must be a positive number of seconds, got {0}")]
    NonPositiveTtl(i64),
    /// A required string field was present but empty.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Wire name of the empty field.
        field: &'static str,
    },
    /// The authority echoed identifiers other than the ones requested.
    #[error("{field} mismatch: requested {expected:?}, issued {actual:?}")]
    IdentityMismatch {
        /// Wire name of the mismatching field.
        field: &'static str,
        /// The requested value.
        expected: String,
        /// The value found in the token.
        actual: String,
    },
}

fn snippet(body: &str) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(BODY_SNIPPET_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}
