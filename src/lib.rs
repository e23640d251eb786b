//! Azure resource discovery agent
//!
//! Queries a subscription's resource inventory, sorts every resource into a
//! coarse category, writes the result as a timestamped JSON snapshot and
//! forwards it to a downstream analysis endpoint.

pub mod azure;
pub mod config;
pub mod discovery;
pub mod error;
pub mod inventory;
pub mod logging;

/// Version injected at compile time via DISCOVERY_AGENT_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("DISCOVERY_AGENT_VERSION") {
    Some(v) => v,
    None => "dev",
};
