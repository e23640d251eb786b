//! Snapshot forwarding
//!
//! Best-effort POST of a snapshot to the downstream analysis endpoint.
//! Only HTTP 200 counts as delivered.

use super::snapshot::CategorizedSnapshot;
use crate::error::{DiscoveryError, Result};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// Maximum length of a response body kept in logs
const MAX_LOG_BODY_LENGTH: usize = 200;

/// HTTP forwarder bound to one endpoint
#[derive(Clone)]
pub struct Forwarder {
    client: Client,
    endpoint: Url,
}

impl Forwarder {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("discovery-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DiscoveryError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Send the snapshot as the JSON request body
    pub async fn forward(&self, snapshot: &CategorizedSnapshot) -> Result<()> {
        tracing::debug!("POST {}", self.endpoint);

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(snapshot)
            .send()
            .await
            .map_err(|e| {
                DiscoveryError::forward_transport(format!("Error sending data to chatbot: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Forward response body: {}", truncate(&body));

        Err(DiscoveryError::forward_status(status.as_u16()))
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_LOG_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_LOG_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
}
