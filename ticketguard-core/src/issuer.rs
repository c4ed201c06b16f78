//! Client for the issuing authority's entry token endpoint.
use std::sync::Arc;
use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Url};
use secrecy::{ExposeSecret, SecretString};

use crate::error::IssueTokenError;
use crate::http_request::{execute_request_builder, Request};
use crate::token::{IssueRequest, IssuedToken};

/// Default path of the issuance endpoint, relative to the base URL.
pub const DEFAULT_ISSUE_PATH: &str = "/api/issue-token";

/// Default bound on a single issuance round trip.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Query parameter carrying the per-deployment credential.
const FUNCTION_KEY_PARAM: &str = "code";

/// Where and how to reach the issuing authority.
///
/// The credential is held as a [`SecretString`]: it is redacted from `Debug` output and
/// never logged.
#[derive(Debug)]
pub struct IssuerConfig {
    base_url: String,
    issue_path: String,
    function_key: Option<SecretString>,
    timeout: Duration,
    allow_insecure_http: bool,
}

impl IssuerConfig {
    /// Configuration for the authority at `base_url` with default path and timeout.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            issue_path: DEFAULT_ISSUE_PATH.to_string(),
            function_key: None,
            timeout: DEFAULT_TIMEOUT,
            allow_insecure_http: false,
        }
    }

    /// Overrides the issuance endpoint path.
    #[must_use]
    pub fn with_issue_path(mut self, issue_path: impl Into<String>) -> Self {
        self.issue_path = issue_path.into();
        self
    }

    /// Attaches the deployment credential. An empty key is treated as absent.
    #[must_use]
    pub fn with_function_key(mut self, function_key: SecretString) -> Self {
        self.function_key = Some(function_key);
        self
    }

    /// Overrides the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Permits plain `http` base URLs, for local authorities and tests.
    #[must_use]
    pub const fn allow_insecure_http(mut self) -> Self {
        self.allow_insecure_http = true;
        self
    }

    /// The per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Builds the endpoint URL, returning it with and without the credential.
    fn issue_url(&self) -> Result<(Url, String), IssueTokenError> {
        let joined = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.issue_path.trim_start_matches('/')
        );
        let mut url =
            Url::parse(&joined).map_err(|e| IssueTokenError::BadRequestConstruction {
                reason: format!("invalid issuer URL {joined:?}: {e}"),
            })?;

        match url.scheme() {
            "https" => {}
            "http" if self.allow_insecure_http => {}
            scheme => {
                return Err(IssueTokenError::BadRequestConstruction {
                    reason: format!("issuer URL scheme {scheme:?} is not allowed"),
                })
            }
        }

        let display_url = url.to_string();
        if let Some(key) = self
            .function_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.is_empty())
        {
            url.query_pairs_mut().append_pair(FUNCTION_KEY_PARAM, key);
        }
        Ok((url, display_url))
    }
}

/// Requests entry tokens from the issuing authority.
///
/// The client holds only its transport and immutable configuration, so clones share one
/// connection pool and can issue concurrently. Each call is independent: dropping a
/// pending future abandons that call and nothing else.
#[derive(Debug, Clone)]
pub struct IssuanceClient {
    config: Arc<IssuerConfig>,
    request: Request,
}

impl IssuanceClient {
    /// Creates a client for the given authority.
    ///
    /// # Errors
    ///
    /// Returns [`IssueTokenError::BadRequestConstruction`] if the HTTP transport cannot be
    /// initialized.
    pub fn new(config: IssuerConfig) -> Result<Self, IssueTokenError> {
        let request = Request::new(config.timeout())?;
        Ok(Self {
            config: Arc::new(config),
            request,
        })
    }

    /// Requests a token for one ticket/device pair.
    ///
    /// Sends exactly one POST with body `{"ticketId", "deviceId", "ttl"}`. The authority
    /// may ignore or clamp `ttl`.
    ///
    /// # Errors
    ///
    /// - [`IssueTokenError::InvalidInput`] if either identifier is empty.
    /// - [`IssueTokenError::BadRequestConstruction`] if the configured location is unusable.
    /// - [`IssueTokenError::Network`] on transport failure, including the timeout.
    /// - [`IssueTokenError::InvalidStatus`] on any non-2xx status; the body is kept as text.
    /// - [`IssueTokenError::Decoding`] if a 2xx body is not a token for this request.
    pub async fn issue_token(
        &self,
        ticket_id: &str,
        device_id: &str,
        ttl: Option<u32>,
    ) -> Result<IssuedToken, IssueTokenError> {
        let payload = IssueRequest::new(ticket_id, device_id, ttl)?;
        let (url, display_url) = self.config.issue_url()?;
        let body = serde_json::to_vec(&payload).map_err(|e| {
            IssueTokenError::BadRequestConstruction {
                reason: format!("failed to encode request: {e}"),
            }
        })?;

        log::debug!("requesting entry token from {display_url} for ticket {ticket_id}");

        let request_builder = self
            .request
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body);
        let response = execute_request_builder(request_builder, &display_url).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .map_err(|err| IssueTokenError::Network {
                    url: display_url,
                    source: err.without_url(),
                })?;
            log::warn!(
                "entry token request for ticket {ticket_id} failed with status {}",
                status.as_u16()
            );
            return Err(IssueTokenError::InvalidStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| IssueTokenError::Network {
                url: display_url,
                source: err.without_url(),
            })?;
        let token = IssuedToken::from_slice(&body)?;
        token.matches_request(&payload)?;

        log::info!(
            "entry token issued ticket={} device={} ttl={}s",
            token.ticket_id(),
            token.device_id(),
            token.ttl_seconds()
        );
        Ok(token)
    }
}
