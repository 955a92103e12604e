use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::metrics::PipelineMetrics;
use super::pricing::{amount_from_base_price, fiat_value, truncate_address};
use super::retry::RetryPolicy;
use crate::api::{EnrichedListing, Listing, NameResolver, Notifier, RateResolver};
use crate::core::PriceError;

const ADDRESS_FRONT: usize = 6;
const ADDRESS_BACK: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Succeeded(EnrichedListing),
    /// Already announced; no collaborator was called.
    Skipped,
    Failed(FailureReason),
}

impl ProcessOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessOutcome::Succeeded(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    RateUnavailable,
    DeliveryUnavailable,
    InvalidPrice(PriceError),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::RateUnavailable => write!(f, "rate unavailable"),
            FailureReason::DeliveryUnavailable => write!(f, "delivery unavailable"),
            FailureReason::InvalidPrice(e) => write!(f, "invalid price: {}", e),
        }
    }
}

/// Why a single attempt stopped short of a delivered notification.
enum AttemptError {
    InvalidRate(Decimal),
    DeliveryFailed,
    InvalidPrice(PriceError),
}

/// Enriches one listing and delivers its notification, retrying the whole
/// pipeline on transient failures.
pub struct ListingProcessor {
    rates: Arc<dyn RateResolver>,
    names: Arc<dyn NameResolver>,
    notifier: Arc<dyn Notifier>,
    retry: RetryPolicy,
    native_currency: String,
    metrics: Arc<PipelineMetrics>,
}

impl ListingProcessor {
    pub fn new(
        rates: Arc<dyn RateResolver>,
        names: Arc<dyn NameResolver>,
        notifier: Arc<dyn Notifier>,
        retry: RetryPolicy,
        native_currency: impl Into<String>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        Self {
            rates,
            names,
            notifier,
            retry,
            native_currency: native_currency.into(),
            metrics,
        }
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub async fn process(&self, listing: &Listing, known: &HashSet<String>) -> ProcessOutcome {
        if known.contains(&listing.token_id) {
            tracing::debug!(token_id = %listing.token_id, "Listing already announced, skipping");
            self.metrics.record_skipped();
            return ProcessOutcome::Skipped;
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_failure = FailureReason::RateUnavailable;

        for attempt in 1..=max_attempts {
            match self.attempt(listing).await {
                Ok(enriched) => {
                    tracing::info!(
                        token_id = %enriched.token_id(),
                        seller = %enriched.seller,
                        seller_label = %enriched.rns_seller,
                        amount = %enriched.amount,
                        usd_value = %enriched.usd_value,
                        time = %Utc::now().format("%Y-%m-%d %H:%M:%S"),
                        attempt,
                        "Listing announced"
                    );
                    self.metrics.record_notified();
                    return ProcessOutcome::Succeeded(enriched);
                }
                Err(AttemptError::InvalidPrice(e)) => {
                    tracing::error!(
                        token_id = %listing.token_id,
                        base_price = %listing.order.base_price,
                        error = %e,
                        "Dropping listing with unusable price"
                    );
                    self.metrics.record_failed();
                    return ProcessOutcome::Failed(FailureReason::InvalidPrice(e));
                }
                Err(AttemptError::InvalidRate(rate)) => {
                    tracing::warn!(
                        token_id = %listing.token_id,
                        currency = %self.native_currency,
                        rate = %rate,
                        attempt,
                        max_attempts,
                        "Invalid exchange rate, retrying"
                    );
                    self.metrics.record_rate_failure();
                    last_failure = FailureReason::RateUnavailable;
                }
                Err(AttemptError::DeliveryFailed) => {
                    tracing::warn!(
                        token_id = %listing.token_id,
                        attempt,
                        max_attempts,
                        "Notification delivery failed, retrying"
                    );
                    self.metrics.record_delivery_failure();
                    last_failure = FailureReason::DeliveryUnavailable;
                }
            }

            if attempt < max_attempts {
                tokio::time::sleep(self.retry.delay_for(attempt)).await;
            }
        }

        tracing::error!(
            token_id = %listing.token_id,
            attempts = max_attempts,
            reason = %last_failure,
            "Giving up on listing"
        );
        self.metrics.record_failed();
        ProcessOutcome::Failed(last_failure)
    }

    /// One pass of rate lookup, enrichment and delivery. Nothing is reused
    /// from earlier attempts.
    async fn attempt(&self, listing: &Listing) -> Result<EnrichedListing, AttemptError> {
        let rate = self.rates.fetch_rate(&self.native_currency).await;
        if rate <= Decimal::ZERO {
            return Err(AttemptError::InvalidRate(rate));
        }

        let enriched = self.enrich(listing, rate).await?;

        if !self.notifier.notify(&enriched).await {
            return Err(AttemptError::DeliveryFailed);
        }

        Ok(enriched)
    }

    async fn enrich(&self, listing: &Listing, rate: Decimal) -> Result<EnrichedListing, AttemptError> {
        let amount =
            amount_from_base_price(&listing.order.base_price).map_err(AttemptError::InvalidPrice)?;
        let usd_value = fiat_value(amount, rate);

        let seller = listing.owner.clone();
        let rns_seller = match self.names.resolve_name(&seller).await {
            Some(name) if !name.trim().is_empty() => name,
            _ => truncate_address(&seller, ADDRESS_FRONT, ADDRESS_BACK),
        };

        Ok(EnrichedListing {
            listing: listing.clone(),
            amount,
            usd_value,
            seller,
            rns_seller,
        })
    }
}
