use async_trait::async_trait;
use reqwest::Client;

use super::traits::ListingSource;
use super::types::*;
use crate::core::config::MarketplaceConfig;
use crate::core::SourceError;

const GET_LISTINGS_QUERY: &str = r#"
query GetListings($tokenAddress: String, $auctionType: AuctionType, $from: Int!, $size: Int!, $sort: SortBy, $rangeCriteria: [RangeSearchCriteria!]) {
    erc721Tokens(tokenAddress: $tokenAddress, auctionType: $auctionType, from: $from, size: $size, sort: $sort, rangeCriteria: $rangeCriteria) {
        total
        results {
            tokenId
            owner
            cdnImage
            attributes
            order {
                basePrice
                expiredAt
            }
        }
    }
}
"#;

const AUCTION_TYPE: &str = "Sale";
const SORT_ORDER: &str = "PriceAsc";

/// GraphQL client for the marketplace listing feed.
pub struct MarketplaceClient {
    client: Client,
    config: MarketplaceConfig,
}

impl MarketplaceClient {
    pub fn new(client: Client, config: MarketplaceConfig) -> Self {
        Self { client, config }
    }

    /// Fetches one page. `None` ends pagination: the marketplace answered
    /// with a non-success status, or a page after the first came back
    /// without data.
    async fn fetch_page(&self, from: u64) -> Result<Option<ListingPage>, SourceError> {
        let request = GraphQlRequest {
            operation_name: "GetListings",
            query: GET_LISTINGS_QUERY,
            variables: ListingQueryVariables {
                token_address: &self.config.collection_address,
                auction_type: AUCTION_TYPE,
                from,
                size: self.config.page_size,
                sort: SORT_ORDER,
                range_criteria: Vec::new(),
            },
        };

        let response = self
            .client
            .post(&self.config.graphql_url)
            .json(&request)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                from,
                "Marketplace returned non-success status, stopping pagination"
            );
            return Ok(None);
        }

        let body: GraphQlResponse<ListingsData> = response.json().await?;

        if let Some(error) = body.errors.first() {
            tracing::warn!(from, error = %error.message, "Marketplace query reported errors");
        }

        match body.data.and_then(|data| data.erc721_tokens) {
            Some(page) => Ok(Some(page)),
            // Later pages only cut the snapshot short.
            None if from > 0 => {
                tracing::warn!(from, "Marketplace page carried no listings, stopping pagination");
                Ok(None)
            }
            None => Err(SourceError::InvalidResponse(
                "response is missing data.erc721Tokens".to_string(),
            )),
        }
    }
}

#[async_trait]
impl ListingSource for MarketplaceClient {
    async fn fetch_listings(&self) -> Result<Vec<Listing>, SourceError> {
        let page_size = u64::from(self.config.page_size);
        let mut offset = 0u64;
        let mut all_results = Vec::new();

        while let Some(page) = self.fetch_page(offset).await? {
            let received = page.results.len();
            let total = page.total;
            all_results.extend(page.into_listings());

            offset += page_size;
            if received == 0 || offset >= total {
                break;
            }
        }

        tracing::debug!(
            count = all_results.len(),
            collection = %self.config.collection_address,
            "Fetched listing snapshot"
        );

        Ok(all_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warp::Filter;

    /// Serves `pages[from / page_size]` for each query, and an empty page
    /// past the end.
    async fn serve_pages(pages: Vec<serde_json::Value>, page_size: u32) -> MarketplaceClient {
        let route = warp::post()
            .and(warp::body::json())
            .map(move |body: serde_json::Value| {
                let from = body["variables"]["from"].as_u64().unwrap_or(0);
                let index = (from / u64::from(page_size)) as usize;
                let page = pages.get(index).cloned().unwrap_or_else(|| {
                    json!({"data": {"erc721Tokens": {"total": 0, "results": []}}})
                });
                warp::reply::json(&page)
            });

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        MarketplaceClient::new(
            Client::new(),
            MarketplaceConfig {
                graphql_url: format!("http://{}/graphql", addr),
                collection_address: "0xee94".to_string(),
                page_size,
            },
        )
    }

    fn entry(token_id: &str) -> serde_json::Value {
        json!({
            "tokenId": token_id,
            "owner": "0xa",
            "cdnImage": null,
            "attributes": {},
            "order": {"basePrice": "1000000000000000000", "expiredAt": 10}
        })
    }

    #[tokio::test]
    async fn test_collects_every_page() {
        let client = serve_pages(
            vec![
                json!({"data": {"erc721Tokens": {"total": 3, "results": [entry("1"), entry("2")]}}}),
                json!({"data": {"erc721Tokens": {"total": 3, "results": [entry("3")]}}}),
            ],
            2,
        )
        .await;

        let listings = client.fetch_listings().await.unwrap();
        let ids: Vec<&str> = listings.iter().map(|l| l.token_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_query_error_on_later_page_keeps_earlier_results() {
        let malformed = json!({"tokenId": "2", "owner": "0xb", "attributes": {}, "order": null});
        let client = serve_pages(
            vec![
                json!({"data": {"erc721Tokens": {"total": 4, "results": [entry("1"), malformed]}}}),
                json!({"data": null, "errors": [{"message": "rate limited"}]}),
            ],
            2,
        )
        .await;

        let listings = client.fetch_listings().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].token_id, "1");
    }

    #[tokio::test]
    async fn test_query_error_on_first_page_fails_the_snapshot() {
        let client = serve_pages(
            vec![json!({"data": null, "errors": [{"message": "rate limited"}]})],
            2,
        )
        .await;

        assert!(matches!(
            client.fetch_listings().await,
            Err(SourceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_request_payload_shape() {
        let request = GraphQlRequest {
            operation_name: "GetListings",
            query: GET_LISTINGS_QUERY,
            variables: ListingQueryVariables {
                token_address: "0xee94",
                auction_type: AUCTION_TYPE,
                from: 50,
                size: 50,
                sort: SORT_ORDER,
                range_criteria: Vec::new(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["operationName"], "GetListings");
        assert_eq!(json["variables"]["tokenAddress"], "0xee94");
        assert_eq!(json["variables"]["auctionType"], "Sale");
        assert_eq!(json["variables"]["from"], 50);
        assert_eq!(json["variables"]["sort"], "PriceAsc");
        assert_eq!(json["variables"]["rangeCriteria"], serde_json::json!([]));
    }

    #[test]
    fn test_page_decoding() {
        let json = r#"{"data": {"erc721Tokens": {"total": 1, "results": [
            {"tokenId": "1", "owner": "0xa", "cdnImage": null, "attributes": {},
             "order": {"basePrice": "5", "expiredAt": 10}}
        ]}}}"#;

        let body: GraphQlResponse<ListingsData> = serde_json::from_str(json).unwrap();
        let page = body.data.unwrap().erc721_tokens.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.into_listings()[0].token_id, "1");
    }
}
