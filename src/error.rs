//! Error types for a discovery run
//!
//! Every stage reports one of four kinds. The run orchestrator inspects the
//! kind to decide whether the run fails or carries on.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Closed set of failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid setting, detected before querying
    Configuration,
    /// Inventory query failed or returned malformed data
    Query,
    /// Snapshot could not be persisted
    Write,
    /// Snapshot could not be delivered downstream
    Forward,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Query => "query",
            ErrorKind::Write => "write",
            ErrorKind::Forward => "forward",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discovery error type
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("write error: {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("write error: failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("forward error: {message}")]
    Forward {
        /// HTTP status, when the endpoint answered at all
        status: Option<u16>,
        message: String,
    },
}

impl DiscoveryError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn forward_status(status: u16) -> Self {
        Self::Forward {
            status: Some(status),
            message: format!("Failed to send data. Status Code: {}", status),
        }
    }

    pub fn forward_transport(message: impl Into<String>) -> Self {
        Self::Forward {
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Query(_) => ErrorKind::Query,
            Self::Write { .. } | Self::Serialize(_) => ErrorKind::Write,
            Self::Forward { .. } => ErrorKind::Forward,
        }
    }

    /// Forwarding failures are absorbed; everything else ends the run.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Forward
    }

    /// Process exit code for a run that ended with this error
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Configuration => 2,
            ErrorKind::Query | ErrorKind::Write => 1,
            ErrorKind::Forward => 0,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, DiscoveryError>;
