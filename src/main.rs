//! Update Relay CLI application
//!
//! Serves an auto-update manifest for the latest GitHub release, or runs
//! one-off fetch, stats and classification commands.

use std::process;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use update_relay::cli::{
    handle_classify, handle_fetch, handle_serve, handle_stats, Cli, Commands,
};
use update_relay::config::AppConfig;
use update_relay::errors::Result;

#[tokio::main]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let config = if cli.needs_config() {
        Some(AppConfig::load(cli.global.config.clone()).await?)
    } else {
        None
    };

    init_logging(&cli, config.as_ref().map(|c| c.logging.level.as_str()));
    info!("Update Relay v{} starting", env!("CARGO_PKG_VERSION"));

    match (cli.command, config) {
        (Commands::Classify(args), _) => handle_classify(args),
        (Commands::Serve(args), Some(config)) => {
            info!("Executing serve command");
            handle_serve(config, args).await
        }
        (Commands::Fetch(args), Some(config)) => {
            info!("Executing fetch command");
            handle_fetch(config, args).await
        }
        (Commands::Stats, Some(config)) => handle_stats(config).await,
        (_, None) => Err(update_relay::AppError::generic("Configuration was not loaded")),
    }
}

/// Initialize logging from CLI flags, falling back to the configured level
fn init_logging(cli: &Cli, configured_level: Option<&str>) {
    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .or_else(|| configured_level.map(str::to_lowercase))
        .unwrap_or_else(|| "warn".to_string());

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("update_relay={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(cli.global.verbose || cli.global.very_verbose)
        .init();

    if cli.global.very_verbose {
        info!("Very verbose logging enabled");
    } else if cli.global.verbose {
        info!("Verbose logging enabled");
    }
}
