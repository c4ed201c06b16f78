use std::time::Duration;

use reqwest::{header::USER_AGENT, redirect, RequestBuilder, Response, Url};

use crate::error::IssueTokenError;

/// A thin wrapper on an HTTP client. Applies the per-call timeout and user-agent to every
/// request. Each call is exactly one attempt: redirects are not followed and retry policy
/// belongs to the caller.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    client: reqwest::Client,
    timeout: Duration,
}

impl Request {
    /// Initializes a new `Request` instance with the given per-call timeout.
    ///
    /// A 3xx reply is returned to the caller as-is rather than followed.
    pub(crate) fn new(timeout: Duration) -> Result<Self, IssueTokenError> {
        let client = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|err| IssueTokenError::BadRequestConstruction {
                reason: format!("HTTP client setup failed: {err}"),
            })?;
        Ok(Self { client, timeout })
    }

    /// Creates a POST request builder with defaults applied.
    pub(crate) fn post(&self, url: Url) -> RequestBuilder {
        self.client
            .post(url)
            .timeout(self.timeout)
            .header(
                USER_AGENT,
                format!("ticketguard-core/{}", env!("CARGO_PKG_VERSION")),
            )
    }
}

/// Sends a request built by [`Request::post`].
///
/// `display_url` is used in errors in place of the real URL, which may carry a credential.
pub(crate) async fn execute_request_builder(
    request_builder: RequestBuilder,
    display_url: &str,
) -> Result<Response, IssueTokenError> {
    let (client, request) = request_builder.build_split();
    let request = request.map_err(|err| IssueTokenError::BadRequestConstruction {
        reason: format!("request build failed: {}", err.without_url()),
    })?;

    client
        .execute(request)
        .await
        .map_err(|err| IssueTokenError::Network {
            url: display_url.to_string(),
            source: err.without_url(),
        })
}
