use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;

use crate::api::{EnrichedListing, Notifier};
use crate::core::config::DiscordConfig;

/// Attributes shown as embed fields, in display order.
const ATTRIBUTE_FIELDS: &[&str] = &[
    "feet",
    "tail",
    "body",
    "wings",
    "eyes",
    "beak",
    "comb",
    "instinct",
    "color",
    "daily feathers",
    "legendary count",
];

const BIRTHDATE_ATTRIBUTE: &str = "birthdate";

#[derive(Debug, Clone, Serialize)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub author: EmbedAuthor,
    pub title: String,
    pub url: String,
    pub color: u32,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<EmbedImage>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedImage {
    pub url: String,
}

impl EmbedField {
    fn inline(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: true,
        }
    }
}

pub struct DiscordNotifier {
    client: Client,
    config: DiscordConfig,
}

impl DiscordNotifier {
    pub fn new(client: Client, config: DiscordConfig) -> Self {
        Self { client, config }
    }

    async fn post(&self, payload: &WebhookPayload) -> reqwest::Result<reqwest::StatusCode> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(payload)
            .send()
            .await?;
        Ok(response.status())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, listing: &EnrichedListing) -> bool {
        let payload = WebhookPayload {
            embeds: vec![build_embed(listing, &self.config, Utc::now())],
        };

        match self.post(&payload).await {
            Ok(status) if status.is_success() => true,
            Ok(status) => {
                tracing::warn!(
                    token_id = %listing.token_id(),
                    status = %status,
                    "Discord webhook rejected notification"
                );
                false
            }
            Err(e) => {
                tracing::warn!(
                    token_id = %listing.token_id(),
                    error = %e,
                    "Discord webhook request failed"
                );
                false
            }
        }
    }
}

pub fn build_embed(listing: &EnrichedListing, config: &DiscordConfig, now: DateTime<Utc>) -> Embed {
    let token_id = listing.token_id();
    let marketplace = config.marketplace_url.trim_end_matches('/');

    let mut fields = vec![
        EmbedField::inline(
            "Price",
            format!(
                "{} {} (~${})",
                listing.amount, config.currency_label, listing.usd_value
            ),
        ),
        EmbedField::inline(
            "Seller",
            format!(
                "[{}]({}/account/{})",
                listing.rns_seller, marketplace, listing.seller
            ),
        ),
        EmbedField::inline(
            "Expiration",
            format!("<t:{}:R>", listing.listing.order.expired_at),
        ),
    ];

    let attributes = &listing.listing.attributes;
    for key in ATTRIBUTE_FIELDS {
        if let Some(values) = attributes.get(*key) {
            fields.push(EmbedField::inline(
                title_case(key),
                capitalize(&values.join(", ")),
            ));
        }
    }

    if let Some(birthdate) = attributes
        .get(BIRTHDATE_ATTRIBUTE)
        .and_then(|values| values.first())
        .and_then(|raw| format_birthdate(raw))
    {
        fields.push(EmbedField::inline("Birthdate", birthdate));
    }

    Embed {
        author: EmbedAuthor {
            name: config.collection_name.clone(),
            icon_url: config.collection_icon_url.clone(),
        },
        title: format!("{} #{}", config.item_label, token_id),
        url: format!(
            "{}/collections/{}/{}",
            marketplace, config.collection_slug, token_id
        ),
        color: config.embed_color,
        fields,
        thumbnail: listing
            .listing
            .cdn_image
            .clone()
            .map(|url| EmbedImage { url }),
        timestamp: now.to_rfc3339(),
    }
}

fn format_birthdate(raw: &str) -> Option<String> {
    let epoch: i64 = raw.trim().parse().ok()?;
    DateTime::<Utc>::from_timestamp(epoch, 0).map(|date| date.format("%d %b %Y").to_string())
}

/// Upper-cases the first character and lower-cases the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn title_case(value: &str) -> String {
    value
        .split(' ')
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}
