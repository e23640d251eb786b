//! HTTP utilities for Azure Resource Manager calls

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Azure API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client with a bounded request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("discovery-agent/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a POST request with a JSON body
    pub async fn post_json(&self, url: &str, token: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return Err(anyhow::anyhow!("API request failed: {}", status));
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

/// Format an Azure API error for display
pub fn format_azure_error(error: &anyhow::Error) -> String {
    let error_str = format!("{:#}", error);

    if error_str.contains("API request failed") {
        if error_str.contains("403") {
            return "Permission denied. Check the Reader role on the subscription.".to_string();
        }
        if error_str.contains("401") {
            return "Authentication failed. Check the Azure credentials.".to_string();
        }
        if error_str.contains("404") {
            return "Subscription or API not found.".to_string();
        }
        if error_str.contains("429") {
            return "Rate limit exceeded by Resource Graph.".to_string();
        }
        if error_str.contains("400") {
            return "Invalid Resource Graph query.".to_string();
        }
        if error_str.contains("500") || error_str.contains("503") {
            return "Azure service temporarily unavailable.".to_string();
        }
    }

    // Truncate long error messages and remove potential sensitive data
    let filtered = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .collect::<String>();

    if filtered.chars().count() > 160 {
        format!("{}...", filtered.chars().take(160).collect::<String>())
    } else {
        filtered
    }
}
