//! httpcheck — one-shot synthetic HTTP check.
//!
//! Probes a single endpoint with bounded retries, compares each attempt
//! against the response-time SLA, and publishes one result event to Kafka.
//!
//! # Usage
//!
//! ```text
//! NAME=homepage URI=https://example.com/ IS_PAUSED=false NUM_RETRIES=2 \
//! RESPONSE_TIME_SLA=500 USE_SSL=true KAFKA_BOOTSTRAP_SERVERS=kafka:9092 \
//! httpcheck
//!
//! httpcheck --config /etc/httpcheck.toml --dry-run
//! ```
//!
//! Exits 0 once the event is delivered, whatever the probe found. Exits
//! non-zero on bad configuration or when delivery cannot be confirmed.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::error;

use httpcheck_core::Settings;

mod check;

#[derive(Parser)]
#[command(
    name = "httpcheck",
    about = "Run one HTTP availability check and report it to Kafka",
    version
)]
struct Cli {
    /// TOML file with [check] and [kafka] tables. Environment variables
    /// take precedence over its values.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Probe and print the event to stdout instead of publishing it.
    #[arg(long)]
    dry_run: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(&cli, |key| std::env::var(key).ok(), &mut std::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let chain = format!("{e:#}");
            error!(error = %chain, "httpcheck failed");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,httpcheck=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Load configuration, then run the check. Nothing reaches the network
/// until the configuration is valid.
async fn run<F, W>(cli: &Cli, env: F, out: &mut W) -> anyhow::Result<()>
where
    F: Fn(&str) -> Option<String>,
    W: Write,
{
    let settings = Settings::load_with(cli.config.as_deref(), env, !cli.dry_run)
        .context("loading configuration")?;
    check::execute(&settings, cli.dry_run, out).await?;
    Ok(())
}
