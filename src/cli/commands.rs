//! Command handlers for the Update Relay CLI
//!
//! Each handler receives the loaded configuration (except `classify`, which
//! works on file names alone) and wires the core components together.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use crate::app::platform::classify_asset;
use crate::app::service::ManifestService;
use crate::app::store::StateStores;
use crate::cli::{ClassifyArgs, FetchArgs, ServeArgs};
use crate::config::AppConfig;
use crate::errors::{AppError, ConfigError, Result};
use crate::server;

/// Handle the serve command
pub async fn handle_serve(mut config: AppConfig, args: ServeArgs) -> Result<()> {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    let addr = listen_address(&config)?;

    let service = Arc::new(ManifestService::from_config(&config).await?);
    info!(
        "Relaying releases of {} for platforms: {}",
        config.upstream.release_repo,
        config
            .enabled_platforms()
            .iter()
            .map(|p| p.id())
            .collect::<Vec<_>>()
            .join(", ")
    );
    server::serve(service, addr).await
}

/// Handle the fetch command
pub async fn handle_fetch(config: AppConfig, args: FetchArgs) -> Result<()> {
    let service = ManifestService::from_config(&config).await?;

    let manifest = if args.force {
        info!("Forcing a fetch cycle");
        service.force_refresh().await?
    } else {
        service.handle(None).await
    };

    let json = serde_json::to_string_pretty(manifest.as_ref())
        .map_err(|e| AppError::generic(format!("Failed to render manifest: {}", e)))?;
    println!("{}", json);
    Ok(())
}

/// Handle the stats command
pub async fn handle_stats(config: AppConfig) -> Result<()> {
    let state_dir = config.state_dir();
    let stores = StateStores::open(&state_dir, &config.upstream.release_repo).await?;
    let stats = stores.stats.current().await;

    println!("📊 Relay statistics ({})", state_dir.display());
    println!("  Cache hits: {}", stats.cache_hits);
    println!("  Fetches: {}", stats.fetches);
    println!("  Hit rate: {:.1}%", stats.hit_rate());
    match stores.validators.last_fetch_time().await {
        Some(time) => println!("  Last fetch: {}", time.to_rfc3339()),
        None => println!("  Last fetch: never"),
    }
    match stores.manifest.get().await {
        Some(manifest) => println!("  Cached version: {}", manifest.version),
        None => println!("  Cached version: none"),
    }
    Ok(())
}

/// Handle the classify command
pub fn handle_classify(args: ClassifyArgs) -> Result<()> {
    for file in &args.files {
        println!("{}", classify_line(file));
    }
    Ok(())
}

fn classify_line(file_name: &str) -> String {
    match classify_asset(file_name) {
        Some(asset) if asset.signature => format!("{}\t{} (signature)", file_name, asset.platform),
        Some(asset) => format!("{}\t{}", file_name, asset.platform),
        None => format!("{}\tunknown", file_name),
    }
}

fn listen_address(config: &AppConfig) -> Result<SocketAddr> {
    let raw = format!("{}:{}", config.server.bind_address, config.server.port);
    raw.parse().map_err(|_| {
        AppError::from(ConfigError::InvalidValue {
            field: "server.bind_address".to_string(),
            value: raw.clone(),
            reason: "Expected an IP address such as 0.0.0.0".to_string(),
        })
    })
}
