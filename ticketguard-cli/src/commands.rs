use std::io::Read;
use std::path::Path;

use eyre::{Context, Result};
use secrecy::SecretString;
use serde::Serialize;
use ticketguard_core::{
    now_epoch_seconds, IssuanceClient, IssuedToken, TokenStatus, TokenVerifier,
};

use crate::cli::{IssueArgs, StatusArgs, VerifyArgs};

/// What the CLI prints for a token.
#[derive(Debug, Serialize)]
pub struct TokenReport<'a> {
    token: &'a IssuedToken,
    status: String,
    evaluated_at: i64,
}

impl<'a> TokenReport<'a> {
    fn new(token: &'a IssuedToken, evaluated_at: i64) -> Self {
        Self {
            token,
            status: token.status_at(evaluated_at).to_string(),
            evaluated_at,
        }
    }
}

/// Requests a token and prints it with its current status.
pub async fn issue(args: IssueArgs) -> Result<()> {
    let client = IssuanceClient::new(args.issuer.into_config())
        .wrap_err("failed to set up the issuance client")?;
    let token = client
        .issue_token(&args.ticket_id, &args.device_id, args.ttl)
        .await
        .wrap_err_with(|| format!("failed to issue a token for ticket {}", args.ticket_id))?;

    let now = now_epoch_seconds();
    if token.status_at(now) != TokenStatus::Active {
        tracing::warn!(
            start = token.start_at_epoch_seconds(),
            end = token.end_at_epoch_seconds(),
            now,
            "issued token is not active on this device's clock"
        );
    }
    print_json(&TokenReport::new(&token, now))
}

/// Prints the status of a stored token.
pub fn status(args: &StatusArgs) -> Result<()> {
    let token = read_token(&args.token)?;
    let now = args.now.unwrap_or_else(now_epoch_seconds);
    print_json(&TokenReport::new(&token, now))
}

/// Verifies a stored token against the signing secret.
pub fn verify(args: VerifyArgs) -> Result<()> {
    let token = read_token(&args.token)?;
    let now = args.now.unwrap_or_else(now_epoch_seconds);
    let verifier = TokenVerifier::in_memory(SecretString::from(args.signing_secret));

    verifier
        .verify(&token, now)
        .wrap_err_with(|| format!("token for ticket {} was refused", token.ticket_id()))?;
    print_json(&serde_json::json!({ "valid": true, "ticketId": token.ticket_id() }))
}

/// Reads a token from `path`, or from stdin when `path` is `-`.
pub fn read_token(path: &Path) -> Result<IssuedToken> {
    let body = if path == Path::new("-") {
        let mut body = String::new();
        std::io::stdin()
            .read_to_string(&mut body)
            .wrap_err("failed to read token from stdin")?;
        body
    } else {
        std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read token from {}", path.display()))?
    };
    IssuedToken::from_json_str(&body).wrap_err("token file is not a valid entry token")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
