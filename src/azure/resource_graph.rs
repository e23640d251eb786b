//! Azure Resource Graph
//!
//! Runs inventory queries against the Resource Graph REST API, following
//! `$skipToken` until every page has been read.

use super::auth::AzureCredentials;
use super::http::{format_azure_error, AzureHttpClient};
use crate::error::{DiscoveryError, Result};
use crate::inventory::ResourceQuery;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const API_VERSION: &str = "2021-03-01";

/// Rows requested per page (the service maximum)
const PAGE_SIZE: u32 = 1000;

/// Result of one page
pub struct PaginatedResult {
    pub items: Vec<Value>,
    pub next_token: Option<String>,
}

/// Resource Graph client
#[derive(Clone)]
pub struct ResourceGraphClient {
    credentials: AzureCredentials,
    http: AzureHttpClient,
    endpoint: String,
}

impl ResourceGraphClient {
    pub fn new(credentials: AzureCredentials, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_endpoint(credentials, timeout, DEFAULT_MANAGEMENT_ENDPOINT)
    }

    /// Create a client against a non-default management endpoint (sovereign clouds, tests)
    pub fn with_endpoint(
        credentials: AzureCredentials,
        timeout: Duration,
        endpoint: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            credentials,
            http: AzureHttpClient::new(timeout)?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn resources_url(&self) -> String {
        format!(
            "{}/providers/Microsoft.ResourceGraph/resources?api-version={}",
            self.endpoint, API_VERSION
        )
    }

    /// Fetch one page of query results
    pub async fn query_page(
        &self,
        query: &str,
        subscription_id: &str,
        skip_token: Option<&str>,
    ) -> anyhow::Result<PaginatedResult> {
        let mut options = json!({
            "resultFormat": "objectArray",
            "$top": PAGE_SIZE,
        });
        if let Some(token) = skip_token {
            options["$skipToken"] = Value::String(token.to_string());
        }

        let body = json!({
            "subscriptions": [subscription_id],
            "query": query,
            "options": options,
        });

        let token = self.credentials.get_token().await?;
        let response = self.http.post_json(&self.resources_url(), &token, &body).await?;

        let Some(items) = response.get("data").and_then(|v| v.as_array()) else {
            return Err(anyhow::anyhow!(
                "Malformed Resource Graph response: 'data' is not an array"
            ));
        };

        let next_token = response
            .get("$skipToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(PaginatedResult {
            items: items.clone(),
            next_token,
        })
    }

    /// Fetch all rows (auto-paginate)
    pub async fn query_all(&self, query: &str, subscription_id: &str) -> anyhow::Result<Vec<Value>> {
        let mut all_items = Vec::new();
        let mut skip_token: Option<String> = None;

        loop {
            let result = self
                .query_page(query, subscription_id, skip_token.as_deref())
                .await?;
            all_items.extend(result.items);

            match result.next_token {
                None => break,
                Some(next) if skip_token.as_deref() == Some(next.as_str()) => {
                    return Err(anyhow::anyhow!(
                        "Resource Graph returned the same $skipToken twice"
                    ));
                }
                next => skip_token = next,
            }
        }

        Ok(all_items)
    }
}

#[async_trait]
impl ResourceQuery for ResourceGraphClient {
    async fn query(&self, query: &str, subscription_id: &str) -> Result<Vec<Value>> {
        self.query_all(query, subscription_id)
            .await
            .map_err(|e| DiscoveryError::query(format_azure_error(&e)))
    }
}
