//! Configuration Management
//!
//! Resolves the run settings from the command line and the environment and
//! validates them before anything touches the network or the disk.

use crate::error::{DiscoveryError, Result};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_DISCOVERY_DIR: &str = "DISCOVERY_DIR";
pub const ENV_CHATBOT_API_URL: &str = "CHATBOT_API_URL";
pub const ENV_QUERY_TIMEOUT: &str = "QUERY_TIMEOUT_SECS";
pub const ENV_FORWARD_TIMEOUT: &str = "FORWARD_TIMEOUT_SECS";

pub const DEFAULT_DISCOVERY_DIR: &str = "/data";
pub const DEFAULT_CHATBOT_API_URL: &str = "http://127.0.0.1:5002/chat";
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Raw, unvalidated settings
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub subscription_id: Option<String>,
    pub discovery_dir: Option<PathBuf>,
    pub chatbot_api_url: Option<String>,
    pub query_timeout_secs: Option<String>,
    pub forward_timeout_secs: Option<String>,
}

impl Settings {
    /// Read settings from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            subscription_id: lookup(ENV_SUBSCRIPTION_ID),
            discovery_dir: lookup(ENV_DISCOVERY_DIR).map(PathBuf::from),
            chatbot_api_url: lookup(ENV_CHATBOT_API_URL),
            query_timeout_secs: lookup(ENV_QUERY_TIMEOUT),
            forward_timeout_secs: lookup(ENV_FORWARD_TIMEOUT),
        }
    }

    /// Combine two sources (CLI > env)
    pub fn merge(self, fallback: Settings) -> Self {
        Self {
            subscription_id: self.subscription_id.or(fallback.subscription_id),
            discovery_dir: self.discovery_dir.or(fallback.discovery_dir),
            chatbot_api_url: self.chatbot_api_url.or(fallback.chatbot_api_url),
            query_timeout_secs: self.query_timeout_secs.or(fallback.query_timeout_secs),
            forward_timeout_secs: self.forward_timeout_secs.or(fallback.forward_timeout_secs),
        }
    }
}

/// Validated run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub subscription_id: String,
    pub discovery_dir: PathBuf,
    pub chatbot_api_url: Url,
    pub query_timeout: Duration,
    pub forward_timeout: Duration,
}

impl Config {
    /// Validate settings, applying defaults for everything but the subscription
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let subscription_id = settings
            .subscription_id
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DiscoveryError::configuration(format!(
                    "No subscription configured. Set {} or use --subscription-id",
                    ENV_SUBSCRIPTION_ID
                ))
            })?;

        if !validate_subscription_id(&subscription_id) {
            return Err(DiscoveryError::configuration(format!(
                "Invalid subscription id '{}': only ASCII letters, digits and '-' are allowed",
                subscription_id
            )));
        }

        let discovery_dir = settings
            .discovery_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DISCOVERY_DIR));
        if discovery_dir.as_os_str().is_empty() {
            return Err(DiscoveryError::configuration(format!(
                "{} must not be empty",
                ENV_DISCOVERY_DIR
            )));
        }

        let raw_url = settings
            .chatbot_api_url
            .unwrap_or_else(|| DEFAULT_CHATBOT_API_URL.to_string());
        let chatbot_api_url = parse_endpoint(&raw_url)?;

        let query_timeout = parse_timeout(
            ENV_QUERY_TIMEOUT,
            settings.query_timeout_secs.as_deref(),
            DEFAULT_QUERY_TIMEOUT,
        )?;
        let forward_timeout = parse_timeout(
            ENV_FORWARD_TIMEOUT,
            settings.forward_timeout_secs.as_deref(),
            DEFAULT_FORWARD_TIMEOUT,
        )?;

        Ok(Self {
            subscription_id,
            discovery_dir,
            chatbot_api_url,
            query_timeout,
            forward_timeout,
        })
    }
}

/// Subscription ids end up in file names, so only GUID-like characters pass.
fn validate_subscription_id(id: &str) -> bool {
    id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        DiscoveryError::configuration(format!("Invalid {} '{}': {}", ENV_CHATBOT_API_URL, raw, e))
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DiscoveryError::configuration(format!(
            "Invalid {} '{}': unsupported scheme '{}'",
            ENV_CHATBOT_API_URL, raw, other
        ))),
    }
}

fn parse_timeout(name: &str, raw: Option<&str>, default: Duration) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(default);
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(DiscoveryError::configuration(format!(
            "{} must be greater than zero",
            name
        ))),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(_) => Err(DiscoveryError::configuration(format!(
            "{} must be a whole number of seconds, got '{}'",
            name, raw
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Settings {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_settings(settings_from(&[(
            ENV_SUBSCRIPTION_ID,
            "00000000-1111-2222-3333-444444444444",
        )]))
        .unwrap();

        assert_eq!(config.subscription_id, "00000000-1111-2222-3333-444444444444");
        assert_eq!(config.discovery_dir, PathBuf::from("/data"));
        assert_eq!(config.chatbot_api_url.as_str(), "http://127.0.0.1:5002/chat");
        assert_eq!(config.query_timeout, DEFAULT_QUERY_TIMEOUT);
        assert_eq!(config.forward_timeout, DEFAULT_FORWARD_TIMEOUT);
    }

    #[test]
    fn test_missing_subscription_is_configuration_error() {
        let err = Config::from_settings(settings_from(&[])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains(ENV_SUBSCRIPTION_ID));
    }

    #[test]
    fn test_blank_subscription_is_configuration_error() {
        let err = Config::from_settings(settings_from(&[(ENV_SUBSCRIPTION_ID, "   ")])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_path_like_subscription_rejected() {
        let err = Config::from_settings(settings_from(&[(ENV_SUBSCRIPTION_ID, "../etc")]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = Config::from_settings(settings_from(&[
            (ENV_SUBSCRIPTION_ID, "sub-1"),
            (ENV_CHATBOT_API_URL, "not a url"),
        ]))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = Config::from_settings(settings_from(&[
            (ENV_SUBSCRIPTION_ID, "sub-1"),
            (ENV_CHATBOT_API_URL, "ftp://example.com/chat"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn test_timeouts_parsed_and_validated() {
        let config = Config::from_settings(settings_from(&[
            (ENV_SUBSCRIPTION_ID, "sub-1"),
            (ENV_QUERY_TIMEOUT, "5"),
            (ENV_FORWARD_TIMEOUT, " 7 "),
        ]))
        .unwrap();
        assert_eq!(config.query_timeout, Duration::from_secs(5));
        assert_eq!(config.forward_timeout, Duration::from_secs(7));

        assert!(Config::from_settings(settings_from(&[
            (ENV_SUBSCRIPTION_ID, "sub-1"),
            (ENV_FORWARD_TIMEOUT, "0"),
        ]))
        .is_err());
        assert!(Config::from_settings(settings_from(&[
            (ENV_SUBSCRIPTION_ID, "sub-1"),
            (ENV_QUERY_TIMEOUT, "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn test_cli_overrides_env() {
        let cli = Settings {
            subscription_id: Some("from-cli".to_string()),
            ..Default::default()
        };
        let env = settings_from(&[
            (ENV_SUBSCRIPTION_ID, "from-env"),
            (ENV_DISCOVERY_DIR, "/var/discovery"),
        ]);

        let config = Config::from_settings(cli.merge(env)).unwrap();
        assert_eq!(config.subscription_id, "from-cli");
        assert_eq!(config.discovery_dir, PathBuf::from("/var/discovery"));
    }
}
