//! Discovery pipeline
//!
//! # Module Structure
//!
//! - [`category`] - Maps resource types onto coarse categories
//! - [`snapshot`] - The categorized partition of one run's resources
//! - [`writer`] - Persists snapshots as timestamped JSON files
//! - [`forwarder`] - Posts snapshots to the downstream analysis endpoint
//! - [`run`] - Sequences query, categorize/write and forward

pub mod category;
pub mod forwarder;
pub mod run;
pub mod snapshot;
pub mod writer;

pub use category::{categorize, Category};
pub use forwarder::Forwarder;
pub use run::{exit_code, run_discovery, ForwardStatus, RunOutcome, RunReport, RunState};
pub use snapshot::{CategorizedSnapshot, ResourceEntry};
pub use writer::{read_snapshot, snapshot_file_name, SnapshotWriter, WrittenSnapshot};
