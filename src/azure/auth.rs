//! Azure Authentication
//!
//! Resolves credentials from the environment, trying in order: a pre-issued
//! bearer token, a service principal secret, workload identity federation and
//! finally managed identity (App Service / container endpoint, then IMDS).

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Scope for Azure Resource Manager APIs
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// Resource id for managed identity endpoints, which take a resource rather than a scope
pub const MANAGEMENT_RESOURCE: &str = "https://management.azure.com/";

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

pub const DEFAULT_IMDS_HOST: &str = "http://169.254.169.254";

const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Token expiry buffer - refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Fallback TTL when the token endpoint reports no expiry
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// IMDS answers locally or not at all
const IMDS_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
enum CredentialSource {
    StaticToken(String),
    ClientSecret {
        authority: String,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    WorkloadIdentity {
        authority: String,
        tenant_id: String,
        client_id: String,
        token_file: PathBuf,
    },
    /// App Service / Container Apps identity endpoint
    IdentityEndpoint {
        endpoint: String,
        header: String,
        client_id: Option<String>,
    },
    /// Instance Metadata Service on VMs and scale sets
    Imds {
        host: String,
        client_id: Option<String>,
    },
}

impl CredentialSource {
    fn name(&self) -> &'static str {
        match self {
            Self::StaticToken(_) => "static token",
            Self::ClientSecret { .. } => "client secret",
            Self::WorkloadIdentity { .. } => "workload identity",
            Self::IdentityEndpoint { .. } => "managed identity (identity endpoint)",
            Self::Imds { .. } => "managed identity (IMDS)",
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<Value>,
    /// Unix timestamp, reported by managed identity endpoints
    #[serde(default)]
    expires_on: Option<Value>,
}

fn as_u64(value: &Option<Value>) -> Option<u64> {
    match value {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

impl TokenResponse {
    fn ttl(&self) -> Duration {
        if let Some(secs) = as_u64(&self.expires_in) {
            return Duration::from_secs(secs);
        }
        if let Some(expires_on) = as_u64(&self.expires_on) {
            let now = chrono::Utc::now().timestamp().max(0) as u64;
            return Duration::from_secs(expires_on.saturating_sub(now));
        }
        DEFAULT_TOKEN_TTL
    }
}

/// Azure credentials holder with token caching
#[derive(Clone)]
pub struct AzureCredentials {
    source: Arc<CredentialSource>,
    http: Client,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

impl AzureCredentials {
    /// Resolve credentials from process environment variables
    pub fn from_env(timeout: Duration) -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), timeout)
    }

    /// Resolve credentials through an arbitrary key lookup.
    ///
    /// Resolution never fails: with nothing configured the source is IMDS, and
    /// the first token request reports whether it is reachable.
    pub fn from_lookup<F>(lookup: F, timeout: Duration) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let authority = || {
            non_empty("AZURE_AUTHORITY_HOST").unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string())
        };
        let tenant_id = non_empty("AZURE_TENANT_ID");
        let client_id = non_empty("AZURE_CLIENT_ID");

        let source = if let Some(token) = non_empty("AZURE_ACCESS_TOKEN") {
            CredentialSource::StaticToken(token)
        } else if let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (&tenant_id, &client_id, non_empty("AZURE_CLIENT_SECRET"))
        {
            CredentialSource::ClientSecret {
                authority: authority(),
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret,
            }
        } else if let (Some(tenant_id), Some(client_id), Some(token_file)) =
            (&tenant_id, &client_id, non_empty("AZURE_FEDERATED_TOKEN_FILE"))
        {
            CredentialSource::WorkloadIdentity {
                authority: authority(),
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                token_file: PathBuf::from(token_file),
            }
        } else if let (Some(endpoint), Some(header)) =
            (non_empty("IDENTITY_ENDPOINT"), non_empty("IDENTITY_HEADER"))
        {
            CredentialSource::IdentityEndpoint {
                endpoint,
                header,
                client_id,
            }
        } else {
            CredentialSource::Imds {
                host: non_empty("AZURE_POD_IDENTITY_AUTHORITY_HOST")
                    .unwrap_or_else(|| DEFAULT_IMDS_HOST.to_string()),
                client_id,
            }
        };

        tracing::debug!("Using Azure {} credentials", source.name());

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client for authentication")?;

        Ok(Self {
            source: Arc::new(source),
            http,
            token_cache: Arc::new(RwLock::new(None)),
        })
    }

    /// Get an access token for Resource Manager calls
    pub async fn get_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let response = match self.source.as_ref() {
            CredentialSource::StaticToken(token) => return Ok(token.clone()),
            CredentialSource::ClientSecret {
                authority,
                tenant_id,
                client_id,
                client_secret,
            } => {
                self.request_token(
                    authority,
                    tenant_id,
                    &[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_secret", client_secret.as_str()),
                        ("scope", MANAGEMENT_SCOPE),
                    ],
                )
                .await?
            }
            CredentialSource::WorkloadIdentity {
                authority,
                tenant_id,
                client_id,
                token_file,
            } => {
                // Re-read on every fetch, the projected token is rotated
                let assertion = tokio::fs::read_to_string(token_file)
                    .await
                    .with_context(|| {
                        format!("Failed to read federated token file {}", token_file.display())
                    })?;
                self.request_token(
                    authority,
                    tenant_id,
                    &[
                        ("grant_type", "client_credentials"),
                        ("client_id", client_id.as_str()),
                        ("client_assertion_type", CLIENT_ASSERTION_TYPE),
                        ("client_assertion", assertion.trim()),
                        ("scope", MANAGEMENT_SCOPE),
                    ],
                )
                .await?
            }
            CredentialSource::IdentityEndpoint {
                endpoint,
                header,
                client_id,
            } => {
                let mut query = vec![
                    ("api-version", "2019-08-01"),
                    ("resource", MANAGEMENT_RESOURCE),
                ];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id.as_str()));
                }
                let request = self
                    .http
                    .get(endpoint)
                    .header("X-IDENTITY-HEADER", header)
                    .query(&query);
                send_token_request(request, "Managed identity").await?
            }
            CredentialSource::Imds { host, client_id } => {
                let url = format!(
                    "{}/metadata/identity/oauth2/token",
                    host.trim_end_matches('/')
                );
                let mut query = vec![
                    ("api-version", "2018-02-01"),
                    ("resource", MANAGEMENT_RESOURCE),
                ];
                if let Some(client_id) = client_id {
                    query.push(("client_id", client_id.as_str()));
                }
                let request = self
                    .http
                    .get(&url)
                    .header("Metadata", "true")
                    .query(&query)
                    .timeout(IMDS_TIMEOUT);
                send_token_request(request, "IMDS").await.context(
                    "No Azure credentials in the environment and managed identity is unavailable. \
                     Set AZURE_ACCESS_TOKEN, or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET",
                )?
            }
        };

        let ttl = response.ttl();
        let token = response.access_token;
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_BUFFER);
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            ttl.saturating_sub(TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token)
    }

    async fn request_token(
        &self,
        authority: &str,
        tenant_id: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse> {
        // Security: the tenant id is interpolated into the URL path
        if !validate_tenant_id(tenant_id) {
            return Err(anyhow!("Invalid characters in AZURE_TENANT_ID"));
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            authority.trim_end_matches('/'),
            tenant_id
        );
        tracing::debug!("POST {}", url);

        send_token_request(self.http.post(&url).form(form), "Token").await
    }
}

async fn send_token_request(request: reqwest::RequestBuilder, what: &str) -> Result<TokenResponse> {
    let response = request
        .send()
        .await
        .with_context(|| format!("{} request failed to send", what))?;

    let status = response.status();
    if !status.is_success() {
        // Security: token endpoint bodies may echo client details, so only log the status
        tracing::error!("{} request failed: {}", what, status);
        return Err(anyhow!("{} request failed: {}", what, status));
    }

    response
        .json::<TokenResponse>()
        .await
        .with_context(|| format!("Failed to parse {} response", what))
}

/// Tenant ids are GUIDs or verified domain names
fn validate_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
