use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One active sale listing as returned by the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub token_id: String,
    pub owner: String,
    #[serde(default)]
    pub cdn_image: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: BTreeMap<String, Vec<String>>,
    pub order: ListingOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingOrder {
    /// Price in the smallest on-chain unit (18 decimals).
    pub base_price: String,
    pub expired_at: i64,
}

/// A listing with every display field resolved. Only the processor builds
/// these, so a notifier can never see a half-enriched listing.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedListing {
    pub listing: Listing,
    pub amount: Decimal,
    pub usd_value: Decimal,
    pub seller: String,
    pub rns_seller: String,
}

impl EnrichedListing {
    pub fn token_id(&self) -> &str {
        &self.listing.token_id
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GraphQlRequest<'a, V> {
    #[serde(rename = "operationName")]
    pub operation_name: &'a str,
    pub query: &'a str,
    pub variables: V,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListingQueryVariables<'a> {
    pub token_address: &'a str,
    pub auction_type: &'a str,
    pub from: u64,
    pub size: u32,
    pub sort: &'a str,
    pub range_criteria: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingsData {
    #[serde(rename = "erc721Tokens")]
    pub erc721_tokens: Option<ListingPage>,
}

/// One page of the listing feed. Entries are kept raw so a single malformed
/// listing cannot fail the whole page.
#[derive(Debug, Deserialize)]
pub(crate) struct ListingPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<serde_json::Value>,
}

impl ListingPage {
    /// Decodes the page entries, dropping the ones that do not parse.
    pub fn into_listings(self) -> Vec<Listing> {
        self.results
            .into_iter()
            .filter_map(|entry| {
                let token_id = entry
                    .get("tokenId")
                    .and_then(|v| v.as_str())
                    .unwrap_or("<unknown>")
                    .to_string();

                match serde_json::from_value::<Listing>(entry) {
                    Ok(listing) => Some(listing),
                    Err(e) => {
                        tracing::warn!(token_id = %token_id, error = %e, "Skipping malformed listing");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_from_marketplace_json() {
        let json = r#"{
            "tokenId": "42",
            "owner": "0xabc",
            "cdnImage": "https://cdn/42.png",
            "attributes": {"feet": ["scaly"], "birthdate": ["1700000000"]},
            "order": {"basePrice": "1000000000000000000", "expiredAt": 1760000000}
        }"#;

        let listing: Listing = serde_json::from_str(json).unwrap();
        assert_eq!(listing.token_id, "42");
        assert_eq!(listing.order.base_price, "1000000000000000000");
        assert_eq!(listing.order.expired_at, 1760000000);
        assert_eq!(listing.attributes["feet"], vec!["scaly".to_string()]);
    }

    #[test]
    fn test_null_attributes_and_missing_image() {
        let json = r#"{
            "tokenId": "7",
            "owner": "0xabc",
            "attributes": null,
            "order": {"basePrice": "1", "expiredAt": 0}
        }"#;

        let listing: Listing = serde_json::from_str(json).unwrap();
        assert!(listing.attributes.is_empty());
        assert!(listing.cdn_image.is_none());
    }

    #[test]
    fn test_malformed_entry_is_skipped() {
        let json = r#"{"total": 3, "results": [
            {"tokenId": "1", "owner": "0xa", "attributes": {},
             "order": {"basePrice": "5", "expiredAt": 10}},
            {"tokenId": "2", "owner": "0xb", "attributes": {}, "order": null},
            {"tokenId": "3", "owner": "0xc", "attributes": null,
             "order": {"basePrice": "7", "expiredAt": 11}}
        ]}"#;

        let page: ListingPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.results.len(), 3);

        let listings = page.into_listings();
        let ids: Vec<&str> = listings.iter().map(|l| l.token_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }
}
