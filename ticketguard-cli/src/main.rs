//! Developer CLI for requesting, inspecting, and verifying entry tokens.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Issue(args) => commands::issue(args).await,
        Command::Status(args) => commands::status(&args),
        Command::Verify(args) => commands::verify(args),
    }
}
