//! relayd - commitment relay daemon
//!
//! Reads batches of commitment records as NDJSON, submits light-client bridge transactions
//! for them, and prints every advanced record as a JSON line on stdout.

use anyhow::Context;
use clap::Parser;
use relay_service::config::{LoggingConfig, RelayServiceConfig};
use relay_service::RelayService;
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "relayd", version, about = "Cross-chain commitment relay daemon")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<String>,

    /// Log level, overrides the configured one
    #[arg(long, env = "RELAY_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "RELAY_LOG_JSON")]
    json: bool,

    /// NDJSON input of relay message batches, `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Load configuration and bind the bridge contract, then exit
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn init_tracing(logging: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.level.clone().into());

    // stdout carries relay output; logs go to stderr.
    if logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = RelayServiceConfig::load(cli.config.as_deref())
        .context("failed to load relayd configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;
    init_tracing(&config.logging);

    let service = RelayService::bootstrap(config)?;
    info!(
        identity = %service.identity(),
        version = env!("CARGO_PKG_VERSION"),
        "relayd bootstrapped"
    );
    if cli.dry_run {
        info!("Dry run complete, exiting");
        return Ok(());
    }

    let summary = if cli.input == "-" {
        service
            .run(
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
                shutdown_signal(),
            )
            .await?
    } else {
        let file = tokio::fs::File::open(&cli.input)
            .await
            .with_context(|| format!("cannot open input {}", cli.input))?;
        service
            .run(BufReader::new(file), tokio::io::stdout(), shutdown_signal())
            .await?
    };

    info!(
        batches = summary.batches_read,
        reported = summary.records_reported,
        "relayd shutting down"
    );
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
