//! Reverse name lookup for seller addresses.
//!
//! Configured with `NAME_LOOKUP_URL`, a URL template such as
//! `https://names.example/lookup/{address}`. The placeholder is replaced by
//! the seller address and the endpoint must answer `GET` with a JSON object
//! carrying a `name` string field, e.g. `{"name": "alice.ron"}`. A missing,
//! null or blank name, a non-success status or a transport error all mean
//! "no name", and the seller falls back to its truncated address.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::traits::NameResolver;
use crate::core::config::NameServiceConfig;

#[derive(Debug, Deserialize)]
struct NameRecord {
    name: Option<String>,
}

/// Resolves addresses to registered names. Without a lookup URL every
/// address is reported as unnamed.
pub struct NameServiceClient {
    client: Client,
    config: NameServiceConfig,
}

impl NameServiceClient {
    pub fn new(client: Client, config: NameServiceConfig) -> Self {
        Self { client, config }
    }

    async fn lookup(&self, url: &str) -> anyhow::Result<Option<String>> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }

        let record: NameRecord = response.json().await?;
        Ok(record
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()))
    }
}

#[async_trait]
impl NameResolver for NameServiceClient {
    async fn resolve_name(&self, address: &str) -> Option<String> {
        let template = self.config.lookup_url.as_ref()?;
        let url = template.replace("{address}", address);

        match self.lookup(&url).await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(address, error = %e, "Name lookup failed");
                None
            }
        }
    }
}
