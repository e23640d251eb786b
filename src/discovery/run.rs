//! Discovery run orchestration
//!
//! One linear pass: query the inventory, categorize and persist the snapshot,
//! then forward it. Query and write failures end the run; forwarding failures
//! are logged and absorbed.

use super::forwarder::Forwarder;
use super::writer::SnapshotWriter;
use super::Category;
use crate::config::Config;
use crate::error::{DiscoveryError, Result};
use crate::inventory::{ResourceQuery, ResourceRecord, DISCOVERY_QUERY};
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::PathBuf;

/// Stages of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Query,
    ClassifyAndWrite,
    Forward,
    Done,
    Failed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Query => "QUERY",
            RunState::ClassifyAndWrite => "CLASSIFY_AND_WRITE",
            RunState::Forward => "FORWARD",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// How the forward step ended
#[derive(Debug)]
pub enum ForwardStatus {
    Delivered,
    Failed(DiscoveryError),
}

impl ForwardStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, ForwardStatus::Delivered)
    }
}

/// Summary of a run that wrote a snapshot
#[derive(Debug)]
pub struct RunReport {
    pub path: PathBuf,
    pub record_count: usize,
    pub counts: Vec<(Category, usize)>,
    pub forward: ForwardStatus,
}

/// Non-failing end of a run
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    /// The subscription had no resources; nothing was written or sent
    Empty,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        0
    }
}

/// Exit code for a finished run
pub fn exit_code(result: &Result<RunOutcome>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => e.exit_code(),
    }
}

struct StateTracker {
    state: RunState,
}

impl StateTracker {
    fn advance(&mut self, next: RunState) {
        tracing::debug!("Run state {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(&mut self, err: DiscoveryError) -> DiscoveryError {
        tracing::error!("Discovery failed during {}: {}", self.state, err);
        self.advance(RunState::Failed);
        err
    }
}

/// Execute one discovery run
pub async fn run_discovery(
    config: &Config,
    query: &dyn ResourceQuery,
    forwarder: &Forwarder,
    now: DateTime<Utc>,
) -> Result<RunOutcome> {
    let mut tracker = StateTracker {
        state: RunState::Query,
    };

    tracing::info!("Running discovery for subscription: {}", config.subscription_id);

    let records = match fetch_records(query, &config.subscription_id).await {
        Ok(records) => records,
        Err(e) => return Err(tracker.fail(e)),
    };

    if records.is_empty() {
        tracing::warn!("No resources found in the subscription.");
        tracker.advance(RunState::Done);
        return Ok(RunOutcome::Empty);
    }

    tracker.advance(RunState::ClassifyAndWrite);

    let writer = SnapshotWriter::new(&config.discovery_dir);
    let written = match writer.write(&config.subscription_id, &records, now) {
        Ok(written) => written,
        Err(e) => return Err(tracker.fail(e)),
    };

    let counts = written.snapshot.counts();
    for (category, count) in &counts {
        tracing::debug!("  {}: {}", category, count);
    }
    tracing::info!(
        "Discovery completed. Resources found: {}. File saved: {}",
        written.record_count,
        written.path.display()
    );

    tracker.advance(RunState::Forward);

    let forward = match forwarder.forward(&written.snapshot).await {
        Ok(()) => {
            tracing::info!("Discovery results successfully sent to {}", forwarder.endpoint());
            ForwardStatus::Delivered
        }
        Err(e) => {
            tracing::warn!("{}", e);
            ForwardStatus::Failed(e)
        }
    };

    tracker.advance(RunState::Done);

    Ok(RunOutcome::Completed(RunReport {
        path: written.path,
        record_count: written.record_count,
        counts,
        forward,
    }))
}

async fn fetch_records(query: &dyn ResourceQuery, subscription_id: &str) -> Result<Vec<ResourceRecord>> {
    let rows = query.query(DISCOVERY_QUERY, subscription_id).await?;
    tracing::debug!("Inventory query returned {} rows", rows.len());
    ResourceRecord::from_rows(&rows)
}
