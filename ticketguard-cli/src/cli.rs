use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use secrecy::SecretString;
use ticketguard_core::{IssuerConfig, DEFAULT_ISSUE_PATH};

/// Request, inspect, and verify short-lived venue entry tokens.
#[derive(Debug, Parser)]
#[command(name = "ticketguard", version, about)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Request a new entry token from the issuing authority.
    Issue(IssueArgs),
    /// Show where a stored token's validity window stands.
    Status(StatusArgs),
    /// Check a stored token's signature and validity window.
    ///
    /// Replay is only tracked within one invocation: each run starts with an empty
    /// nonce store, so a token verified by an earlier run is accepted again.
    Verify(VerifyArgs),
}

/// Connection settings for the issuing authority.
#[derive(Debug, Args)]
pub struct IssuerArgs {
    /// Base URL of the issuing authority.
    #[arg(long, env = "TICKETGUARD_BASE_URL")]
    pub base_url: String,

    /// Path of the issuance endpoint.
    #[arg(long, env = "TICKETGUARD_ISSUE_PATH", default_value = DEFAULT_ISSUE_PATH)]
    pub issue_path: String,

    /// Deployment credential, sent as the `code` query parameter.
    #[arg(long, env = "TICKETGUARD_FUNCTION_KEY", hide_env_values = true)]
    pub function_key: Option<String>,

    /// Per-call timeout in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Allow a plain-http base URL (local development only).
    #[arg(long)]
    pub allow_insecure_http: bool,
}

impl IssuerArgs {
    /// Converts the flags into the core client configuration.
    pub fn into_config(self) -> IssuerConfig {
        let mut config = IssuerConfig::new(self.base_url)
            .with_issue_path(self.issue_path)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(key) = self.function_key {
            config = config.with_function_key(SecretString::from(key));
        }
        if self.allow_insecure_http {
            config = config.allow_insecure_http();
        }
        config
    }
}

/// Arguments for `issue`.
#[derive(Debug, Args)]
pub struct IssueArgs {
    /// Authority connection settings.
    #[command(flatten)]
    pub issuer: IssuerArgs,

    /// Ticket to request access for.
    #[arg(long)]
    pub ticket_id: String,

    /// Identifier of this device.
    #[arg(long)]
    pub device_id: String,

    /// Requested validity in seconds; the authority may clamp it.
    #[arg(long)]
    pub ttl: Option<u32>,
}

/// Arguments for `status`.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Token JSON file, or `-` for stdin.
    #[arg(long)]
    pub token: PathBuf,

    /// Evaluate at this Unix time instead of now.
    #[arg(long, allow_hyphen_values = true)]
    pub now: Option<i64>,
}

/// Arguments for `verify`.
#[derive(Debug, Args)]
pub struct VerifyArgs {
    /// Token JSON file, or `-` for stdin.
    #[arg(long)]
    pub token: PathBuf,

    /// Shared signing secret of the issuing authority.
    #[arg(long, env = "TICKETGUARD_SIGNING_SECRET", hide_env_values = true)]
    pub signing_secret: String,

    /// Evaluate at this Unix time instead of now.
    #[arg(long, allow_hyphen_values = true)]
    pub now: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_defaults() {
        let cli = Cli::try_parse_from([
            "ticketguard",
            "issue",
            "--base-url",
            "https://issuer.example",
            "--ticket-id",
            "T1",
            "--device-id",
            "D1",
        ])
        .unwrap();

        let Command::Issue(args) = cli.command else {
            panic!("expected issue");
        };
        assert_eq!(args.issuer.issue_path, "/api/issue-token");
        assert_eq!(args.issuer.timeout_secs, 10);
        assert_eq!(args.ttl, None);
        assert!(!args.issuer.allow_insecure_http);
        assert_eq!(args.issuer.into_config().timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_issue_requires_ticket_id() {
        let result = Cli::try_parse_from([
            "ticketguard",
            "issue",
            "--base-url",
            "https://issuer.example",
            "--device-id",
            "D1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_help_states_replay_scope() {
        use clap::CommandFactory;

        let cli = Cli::command();
        let verify = cli.find_subcommand("verify").unwrap();
        let help = verify.get_long_about().unwrap().to_string();
        assert!(help.contains("within one invocation"));
    }

    #[test]
    fn test_status_accepts_explicit_now() {
        let cli = Cli::try_parse_from([
            "ticketguard",
            "status",
            "--token",
            "token.json",
            "--now",
            "1700000000",
        ])
        .unwrap();
        let Command::Status(args) = cli.command else {
            panic!("expected status");
        };
        assert_eq!(args.now, Some(1_700_000_000));
        assert_eq!(args.token, PathBuf::from("token.json"));
    }
}
