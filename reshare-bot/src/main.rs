//! reshare-bot - Re-share posts carrying watched hashtags
//!
//! Subscribes to the public filter stream for the watched hashtags and
//! re-shares every post that passes the decision engine. Runs until killed.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use libreshare::logging::{LogFormat, LoggingConfig};
use libreshare::platforms::dry_run::DryRunReshareClient;
use libreshare::platforms::twitter::{TwitterRestClient, TwitterStreamClient};
use libreshare::platforms::ReshareClient;
use libreshare::{Config, Result, Supervisor};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "reshare-bot")]
#[command(version)]
#[command(about = "Re-share posts carrying watched hashtags")]
#[command(long_about = "\
reshare-bot - Re-share posts carrying watched hashtags

DESCRIPTION:
    reshare-bot is a long-running daemon that subscribes to the Twitter
    filter stream for a fixed set of hashtags and re-shares every original,
    non-sensitive post carrying one of them with at most 10 hashtags.

    Any failure (connection error, server disconnect, rejected re-share)
    ends the subscription. The bot waits and then subscribes again, forever.

USAGE:
    # Run in foreground (logs to stderr)
    reshare-bot

    # Watch the stream without re-sharing anything
    reshare-bot --dry-run --verbose

    # Structured logs for a log shipper
    reshare-bot --log-format json

ENVIRONMENT:
    CONSUMER_KEY, CONSUMER_SECRET        Application credentials (required)
    ACCESS_TOKEN, ACCESS_TOKEN_SECRET    Account credentials (required)
    RESHARE_CONFIG                       Configuration file path
    RESHARE_LOG_FORMAT                   text, json or pretty
    RESHARE_LOG_LEVEL                    Log level when RUST_LOG is unset

CONFIGURATION:
    Configuration file: ~/.config/reshare-bot/config.toml (optional)

    [watch]
    hashtags = [\"#rails\", \"#ruby\", \"#RubyOnRails\"]
    max_hashtags = 10

    [supervisor]
    retry_delay = 60  # seconds to wait before resubscribing

EXIT CODES:
    1 - Runtime error during startup
    2 - Configuration error (missing credential, invalid config file)
")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Seconds to wait after a failure before resubscribing (overrides config)
    #[arg(long, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    retry_delay: Option<u64>,

    /// Log posts that would be re-shared instead of re-sharing them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format (text, json, pretty)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    LoggingConfig::from_env(cli.verbose)
        .with_format(cli.log_format)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(secs) = cli.retry_delay {
        config.retry_delay = Duration::from_secs(secs);
    }

    info!(
        watch = %config.watch_list,
        retry_delay = config.retry_delay.as_secs(),
        "reshare-bot starting"
    );

    let reshare: Box<dyn ReshareClient> = if cli.dry_run {
        info!("Dry run: posts will be logged, not re-shared");
        Box::new(DryRunReshareClient::new())
    } else {
        info!("Configuring Rest Client");
        Box::new(TwitterRestClient::new(
            config.credentials.clone(),
            &config.twitter.api_base,
        )?)
    };

    info!("Configuring Stream Client");
    let stream = TwitterStreamClient::new(config.credentials.clone(), &config.twitter.stream_base)?;

    let supervisor = Supervisor::new(&config, Box::new(stream), reshare);
    match supervisor.run().await {}
}
