use anyhow::{Context, Result};
use std::sync::Arc;

use marketplace_listing_notifier::api::{
    build_http_client, ExchangeRateClient, MarketplaceClient, NameServiceClient,
};
use marketplace_listing_notifier::core::logging::init_logging;
use marketplace_listing_notifier::core::{Config, HealthChecker};
use marketplace_listing_notifier::monitoring::{
    JsonFileStore, ListingMonitor, ListingProcessor, PipelineMetrics, PollIntervals,
};
use marketplace_listing_notifier::notification::DiscordNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(
        &config.logging.log_level,
        config.logging.log_file.as_deref(),
    )?;

    tracing::info!("Marketplace listing notifier starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Collection: {}", config.marketplace.collection_address);
    if config.name_service.lookup_url.is_none() {
        tracing::warn!("NAME_LOOKUP_URL not set, sellers will be shown as truncated addresses");
    }

    let http = build_http_client().context("Failed to build HTTP client")?;
    let metrics = Arc::new(PipelineMetrics::new());

    let store = JsonFileStore::open(&config.monitor.cache_path)
        .await
        .with_context(|| {
            format!(
                "Failed to open listing cache {}",
                config.monitor.cache_path.display()
            )
        })?;

    let processor = ListingProcessor::new(
        Arc::new(ExchangeRateClient::new(http.clone(), config.pricing.clone())),
        Arc::new(NameServiceClient::new(http.clone(), config.name_service.clone())),
        Arc::new(DiscordNotifier::new(http.clone(), config.discord.clone())),
        config.monitor.retry_policy(),
        config.pricing.native_currency.clone(),
        metrics.clone(),
    );

    let mut monitor = ListingMonitor::new(
        Arc::new(MarketplaceClient::new(http, config.marketplace.clone())),
        processor,
        Arc::new(store),
        PollIntervals {
            idle: config.monitor.idle_interval(),
            drain: config.monitor.drain_interval(),
        },
        metrics,
    )
    .await
    .context("Failed to load announced listings")?;

    // Start health check endpoint
    if let Some(port) = config.logging.health_port {
        let health = monitor.health();
        tokio::spawn(async move { start_health_server(health, port).await });
        tracing::info!("Health endpoint running on port {}", port);
    }

    monitor.run().await;

    Ok(())
}

async fn start_health_server(health_checker: HealthChecker, port: u16) {
    use warp::Filter;

    let health = warp::path("health")
        .and(warp::any().map(move || health_checker.clone()))
        .and_then(|checker: HealthChecker| async move {
            let status = checker.get_status().await;
            Ok::<_, warp::Rejection>(warp::reply::json(&status))
        });

    warp::serve(health).run(([0, 0, 0, 0], port)).await;
}
