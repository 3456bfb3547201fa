//! `catalog search`.

use anyhow::Result;
use serde::Serialize;

use storefront_catalog_core::models::ProductSummary;
use storefront_catalog_core::search::{SearchOutcome, NO_MATCHES_MESSAGE};

use crate::catalog::Catalog;

/// JSON body shared by `catalog search --json` and the HTTP adapter.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<ProductSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<SearchOutcome> for SearchResponse {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Matches(results) => Self {
                results,
                message: None,
            },
            SearchOutcome::NoMatches => Self {
                results: Vec::new(),
                message: Some(NO_MATCHES_MESSAGE.to_string()),
            },
        }
    }
}

pub async fn run_search(
    catalog: &Catalog,
    tenant_id: &str,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let outcome = catalog.search(tenant_id, query, limit).await?;

    if json {
        let response = SearchResponse::from(outcome);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        println!("{}", outcome.render());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matches_response_has_message() {
        let response = SearchResponse::from(SearchOutcome::NoMatches);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"].as_array().unwrap().len(), 0);
        assert_eq!(json["message"], NO_MATCHES_MESSAGE);
    }

    #[test]
    fn test_matches_response_omits_message() {
        let summary = ProductSummary {
            title: "Shirt".to_string(),
            sku: "SH-R".to_string(),
            handle: "shirt".to_string(),
            price: 19.99,
            description_snippet: String::new(),
            image_url: None,
            score: 0.9,
            enriched: true,
        };
        let json = serde_json::to_value(SearchResponse::from(SearchOutcome::Matches(vec![summary])))
            .unwrap();
        assert!(json.get("message").is_none());
        assert_eq!(json["results"][0]["sku"], "SH-R");
    }
}
