use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::monitoring::retry::{RetryBackoff, RetryPolicy};

const DEFAULT_GRAPHQL_URL: &str = "https://marketplace-graphql.skymavis.com/graphql";
const DEFAULT_COLLECTION_ADDRESS: &str = "0xee9436518030616bc315665678738a4348463df4";
const DEFAULT_EXCHANGE_RATE_URL: &str = "https://exchange-rate.skymavis.com";
const DEFAULT_MARKETPLACE_URL: &str = "https://marketplace.skymavis.com";
const DEFAULT_CACHE_PATH: &str = "data/listings_cache.json";
const DEFAULT_LOG_FILE: &str = "logs/listings.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub marketplace: MarketplaceConfig,
    pub pricing: PricingConfig,
    pub name_service: NameServiceConfig,
    pub discord: DiscordConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketplaceConfig {
    pub graphql_url: String,
    pub collection_address: String,
    pub page_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub exchange_rate_url: String,
    pub native_currency: String,
    pub fiat_currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameServiceConfig {
    /// `NAME_LOOKUP_URL`: URL template with an `{address}` placeholder,
    /// e.g. `https://names.example/lookup/{address}`. The endpoint answers
    /// `GET` with `{"name": "alice.ron"}`; a null or blank name means the
    /// address has none. Unset disables lookups and every seller is shown
    /// as a truncated address.
    pub lookup_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub collection_name: String,
    pub collection_icon_url: String,
    pub collection_slug: String,
    pub marketplace_url: String,
    pub item_label: String,
    pub embed_color: u32,
    pub currency_label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub idle_interval_secs: u64,
    pub drain_interval_secs: u64,
    pub retry_delay_secs: u64,
    pub max_retries: u32,
    pub exponential_backoff: bool,
    pub max_retry_delay_secs: u64,
    pub cache_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub health_port: Option<u16>,
}

impl MonitorConfig {
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_secs(self.drain_interval_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = if self.exponential_backoff {
            RetryBackoff::Exponential {
                max: Duration::from_secs(self.max_retry_delay_secs),
            }
        } else {
            RetryBackoff::Fixed
        };

        RetryPolicy {
            max_attempts: self.max_retries,
            delay: Duration::from_secs(self.retry_delay_secs),
            backoff,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let parsed = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        let parsed_u32 = |key: &str, default: u32| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(default)
        };

        let webhook_url = lookup("DISCORD_WEBHOOK_URL")
            .filter(|v| !v.trim().is_empty())
            .context("DISCORD_WEBHOOK_URL must be set")?;

        let log_file = match lookup("LOG_FILE") {
            Some(path) if path.trim().is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from(DEFAULT_LOG_FILE)),
        };

        let health_port = lookup("HEALTH_PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .filter(|port| *port != 0);

        Ok(Config {
            marketplace: MarketplaceConfig {
                graphql_url: var("MARKETPLACE_GRAPHQL_URL", DEFAULT_GRAPHQL_URL),
                collection_address: var("COLLECTION_ADDRESS", DEFAULT_COLLECTION_ADDRESS),
                page_size: parsed_u32("LISTING_PAGE_SIZE", 50).max(1),
            },
            pricing: PricingConfig {
                exchange_rate_url: var("EXCHANGE_RATE_URL", DEFAULT_EXCHANGE_RATE_URL),
                native_currency: var("NATIVE_CURRENCY", "ron"),
                fiat_currency: var("FIAT_CURRENCY", "usd"),
            },
            name_service: NameServiceConfig {
                lookup_url: lookup("NAME_LOOKUP_URL").filter(|v| !v.trim().is_empty()),
            },
            discord: DiscordConfig {
                webhook_url,
                collection_name: var("COLLECTION_NAME", "Sabong Saga Genesis"),
                collection_icon_url: var(
                    "COLLECTION_ICON_URL",
                    &format!(
                        "https://cdn.skymavis.com/ronin/2020/erc721/{}/logo.png",
                        DEFAULT_COLLECTION_ADDRESS
                    ),
                ),
                collection_slug: var("COLLECTION_SLUG", "sabong-saga-genesis"),
                marketplace_url: var("MARKETPLACE_URL", DEFAULT_MARKETPLACE_URL),
                item_label: var("ITEM_LABEL", "Chicken"),
                embed_color: parsed_u32("EMBED_COLOR", 5763719),
                currency_label: var("CURRENCY_LABEL", "RON"),
            },
            monitor: MonitorConfig {
                idle_interval_secs: parsed("IDLE_INTERVAL_SECS", 60),
                drain_interval_secs: parsed("DRAIN_INTERVAL_SECS", 1),
                retry_delay_secs: parsed("RETRY_DELAY_SECS", 15),
                max_retries: parsed_u32("MAX_RETRIES", 5).max(1),
                exponential_backoff: var("RETRY_BACKOFF", "fixed")
                    .eq_ignore_ascii_case("exponential"),
                max_retry_delay_secs: parsed("MAX_RETRY_DELAY_SECS", 300),
                cache_path: PathBuf::from(var("CACHE_PATH", DEFAULT_CACHE_PATH)),
            },
            logging: LoggingConfig {
                log_level: var("LOG_LEVEL", "info"),
                log_file,
                health_port,
            },
        })
    }
}
