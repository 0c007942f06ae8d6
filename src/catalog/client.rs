//! Bulk product listing fetch feeding the client-side ranker.

use crate::config::StorefrontConfig;
use crate::error::{Result, StorefrontError};
use tracing::debug;

use super::search::search;
use super::types::Product;

pub const PRODUCTS_ENDPOINT: &str = "products";

/// Fetches the product listing (`GET <base>/products`)
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    config: StorefrontConfig,
}

impl CatalogClient {
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        // Fail early on a bad base URL instead of on first fetch
        config.base_url()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    pub async fn fetch_products(&self) -> Result<Vec<Product>> {
        let url = self.config.endpoint(PRODUCTS_ENDPOINT)?;

        let mut request = self.http.get(url.clone());
        if let Some(ref api_key) = self.config.api_key {
            request = request.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorefrontError::Transport {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let products: Vec<Product> = response.json().await?;
        debug!(count = products.len(), "Fetched product listing");
        Ok(products)
    }

    /// Fetch the whole listing and rank it locally
    pub async fn search_remote(&self, query: &str) -> Result<Vec<Product>> {
        let products = self.fetch_products().await?;
        Ok(search(&products, query).into_iter().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_server_url() {
        let err = CatalogClient::new(StorefrontConfig::default()).unwrap_err();
        assert!(matches!(err, StorefrontError::Config(_)));
    }

    #[test]
    fn test_new_accepts_valid_server() {
        let client = CatalogClient::new(StorefrontConfig::with_server("http://127.0.0.1:9"));
        assert!(client.is_ok());
    }
}
