//! Azure API interaction module
//!
//! # Module Structure
//!
//! - [`auth`] - Credential resolution and token caching
//! - [`http`] - HTTP utilities for REST API calls
//! - [`resource_graph`] - Resource Graph query client
//!
//! # Example
//!
//! ```ignore
//! use crate::azure::{auth::AzureCredentials, resource_graph::ResourceGraphClient};
//! use std::time::Duration;
//!
//! async fn example() -> anyhow::Result<()> {
//!     let credentials = AzureCredentials::from_env(Duration::from_secs(30))?;
//!     let client = ResourceGraphClient::new(credentials, Duration::from_secs(60))?;
//!     let rows = client.query_all("Resources | count", "my-subscription").await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod http;
pub mod resource_graph;

pub use auth::AzureCredentials;
pub use resource_graph::ResourceGraphClient;
