use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;

use super::traits::RateResolver;
use crate::core::config::PricingConfig;

pub struct ExchangeRateClient {
    client: Client,
    config: PricingConfig,
}

impl ExchangeRateClient {
    pub fn new(client: Client, config: PricingConfig) -> Self {
        Self { client, config }
    }

    async fn request_rate(&self, currency: &str) -> anyhow::Result<Option<f64>> {
        let url = format!(
            "{}/{}",
            self.config.exchange_rate_url.trim_end_matches('/'),
            currency.to_lowercase()
        );

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("exchange rate request failed: {}", status));
        }

        let rates: HashMap<String, serde_json::Value> = response.json().await?;
        Ok(rates
            .get(&self.config.fiat_currency)
            .and_then(serde_json::Value::as_f64))
    }
}

/// Maps a raw rate to a decimal, with anything unusable collapsing to zero.
fn rate_or_zero(rate: Option<f64>) -> Decimal {
    rate.filter(|r| r.is_finite() && *r > 0.0)
        .and_then(Decimal::from_f64)
        .unwrap_or(Decimal::ZERO)
}

#[async_trait]
impl RateResolver for ExchangeRateClient {
    async fn fetch_rate(&self, currency: &str) -> Decimal {
        match self.request_rate(currency).await {
            Ok(rate) => {
                let rate = rate_or_zero(rate);
                if rate.is_zero() {
                    tracing::warn!(
                        currency,
                        fiat = %self.config.fiat_currency,
                        "Exchange rate missing from response"
                    );
                }
                rate
            }
            Err(e) => {
                tracing::warn!(currency, error = %e, "Failed to fetch exchange rate");
                Decimal::ZERO
            }
        }
    }
}
