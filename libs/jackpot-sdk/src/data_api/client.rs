use std::time::Duration;

use alloy_primitives::Address;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::types::{ApiPool, ApiResponse, PoolStats};
use crate::config::DataApiConfig;

pub const DEFAULT_ACTIVE_POOLS_LIMIT: u32 = 20;

/// Client for the jackpot REST data API. Failures never surface as errors;
/// they come back as an unsuccessful [`ApiResponse`].
#[derive(Clone)]
pub struct DataApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl DataApiClient {
    pub fn new(config: &DataApiConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse<T>, String> {
        let url = self.url(path);
        tracing::debug!("Data API request: {}", url);

        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| e.to_string())?;
        if !response.status().is_success() {
            return Err(format!("HTTP {}", response.status()));
        }

        response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn pool_info(&self, pool_id: &str) -> ApiResponse<ApiPool> {
        self.get(&format!("/pools/{}", pool_id), &[])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(pool_id, "Failed to fetch pool info: {}", e);
                ApiResponse::failure(e)
            })
    }

    pub async fn pool_stats(&self) -> ApiResponse<PoolStats> {
        self.get("/pools/stats", &[]).await.unwrap_or_else(|e| {
            tracing::warn!("Failed to fetch pool stats: {}", e);
            ApiResponse::failure(e)
        })
    }

    pub async fn user_pools(&self, user: Address) -> ApiResponse<Vec<ApiPool>> {
        self.get(&format!("/users/{}/pools", user), &[])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(user = %user, "Failed to fetch user pools: {}", e);
                ApiResponse::failure_with(e, Vec::new())
            })
    }

    pub async fn active_pools(&self, limit: Option<u32>) -> ApiResponse<Vec<ApiPool>> {
        let limit = limit.unwrap_or(DEFAULT_ACTIVE_POOLS_LIMIT);
        self.get("/pools/active", &[("limit", limit.to_string())])
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(limit, "Failed to fetch active pools: {}", e);
                ApiResponse::failure_with(e, Vec::new())
            })
    }
}
