use clap::{Parser, ValueEnum};
use discovery_agent::azure::{AzureCredentials, ResourceGraphClient};
use discovery_agent::config::{Config, Settings};
use discovery_agent::discovery::{self, Forwarder};
use discovery_agent::error::DiscoveryError;
use discovery_agent::{logging, VERSION};
use std::path::PathBuf;
use std::process::ExitCode;

/// Inventory Azure resources and forward a categorized snapshot
#[derive(Parser, Debug)]
#[command(name = "discovery-agent", version, about, long_about = None)]
struct Args {
    /// Azure subscription to scan (overrides AZURE_SUBSCRIPTION_ID)
    #[arg(short, long)]
    subscription_id: Option<String>,

    /// Directory for snapshots and the log file (overrides DISCOVERY_DIR)
    #[arg(short, long)]
    discovery_dir: Option<PathBuf>,

    /// Endpoint receiving the snapshot (overrides CHATBOT_API_URL)
    #[arg(long)]
    chatbot_api_url: Option<String>,

    /// Inventory query timeout in seconds (overrides QUERY_TIMEOUT_SECS)
    #[arg(long)]
    query_timeout_secs: Option<u64>,

    /// Forward request timeout in seconds (overrides FORWARD_TIMEOUT_SECS)
    #[arg(long)]
    forward_timeout_secs: Option<u64>,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            subscription_id: self.subscription_id.clone(),
            discovery_dir: self.discovery_dir.clone(),
            chatbot_api_url: self.chatbot_api_url.clone(),
            query_timeout_secs: self.query_timeout_secs.map(|s| s.to_string()),
            forward_timeout_secs: self.forward_timeout_secs.map(|s| s.to_string()),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    let level = args.log_level.as_filter();

    // Validate everything before touching the discovery directory
    let config = match Config::from_settings(args.settings().merge(Settings::from_env())) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console(level);
            tracing::error!("Discovery failed: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let _log_guard = logging::init(&config.discovery_dir, level);
    tracing::info!("discovery-agent {} starting", VERSION);

    let query = match build_query_client(&config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Discovery failed: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let forwarder = match Forwarder::new(config.chatbot_api_url.clone(), config.forward_timeout) {
        Ok(forwarder) => forwarder,
        Err(e) => {
            tracing::error!("Discovery failed: {}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let result = discovery::run_discovery(&config, &query, &forwarder, chrono::Utc::now()).await;
    ExitCode::from(discovery::exit_code(&result))
}

fn build_query_client(config: &Config) -> Result<ResourceGraphClient, DiscoveryError> {
    AzureCredentials::from_env(config.query_timeout)
        .and_then(|credentials| ResourceGraphClient::new(credentials, config.query_timeout))
        .map_err(|e| DiscoveryError::query(format!("{:#}", e)))
}
