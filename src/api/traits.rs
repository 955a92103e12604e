//! Contracts for the network collaborators of the listing pipeline.
//!
//! Only [`ListingSource`] can fail loudly. The resolvers and the notifier
//! report failure through their return value and never raise.

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::types::{EnrichedListing, Listing};
use crate::core::SourceError;

#[cfg(test)]
use mockall::automock;

/// Full snapshot of the active sale listings for the tracked collection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self) -> Result<Vec<Listing>, SourceError>;
}

/// Conversion rate from a currency to the fiat unit.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RateResolver: Send + Sync {
    /// Returns zero when no rate could be obtained.
    async fn fetch_rate(&self, currency: &str) -> Decimal;
}

/// Human readable alias for an address.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NameResolver: Send + Sync {
    async fn resolve_name(&self, address: &str) -> Option<String>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Returns `true` once the notification has been accepted.
    async fn notify(&self, listing: &EnrichedListing) -> bool;
}
