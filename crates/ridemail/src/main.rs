//! `ridemail` - operator CLI for owner notifications
//!
//! Sends a one-off notification, probes every SMTP transport, or prints the
//! redacted mail configuration. Settings come from `MAIL_*` environment
//! variables; a `.env` file in the working directory is loaded first.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ridemail_core::{MailConfig, Mailer, OutboundMessage, probe};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[clap(version, about, long_about = None)]
#[clap(name = "ridemail")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Send one notification; exits non-zero if no transport delivered it
    Send {
        /// Recipient address
        to: String,
        /// Subject line
        subject: String,
        /// Plain text body
        body: String,
    },

    /// Test connection and login on every SMTP transport (JSON report)
    Probe,

    /// Print the redacted mail configuration (JSON)
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ridemail=info,ridemail_core=info,ridemail_smtp=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = MailConfig::from_env().context("invalid mail configuration")?;
    info!(
        host = %config.host,
        port = config.port,
        username = %config.sender,
        password_configured = config.has_credential(),
        "Loaded mail configuration"
    );

    match cli.command {
        Commands::Send { to, subject, body } => {
            let mailer = Mailer::new(config);
            let delivered = mailer
                .send(&OutboundMessage::new(to, subject, body))
                .await;
            Ok(if delivered {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Probe => {
            let report = probe(&config).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config.summary())?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
