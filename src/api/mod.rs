pub mod exchange_rate;
pub mod marketplace;
pub mod name_service;
pub mod traits;
pub mod types;

pub use exchange_rate::ExchangeRateClient;
pub use marketplace::MarketplaceClient;
pub use name_service::NameServiceClient;
pub use traits::{ListingSource, NameResolver, Notifier, RateResolver};
pub use types::*;

use std::time::Duration;

pub const REQUEST_TIMEOUT_SECS: u64 = 10;
pub const USER_AGENT: &str = concat!("marketplace-listing-notifier/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for every outbound collaborator.
pub fn build_http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .user_agent(USER_AGENT)
        .build()
}
