//! Snapshot persistence
//!
//! Writes one pretty-printed JSON file per run, named after the subscription
//! and the UTC run time at second resolution.

use super::snapshot::CategorizedSnapshot;
use crate::error::{DiscoveryError, Result};
use crate::inventory::ResourceRecord;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Timestamp format embedded in snapshot file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Result of a successful write
#[derive(Debug, Clone)]
pub struct WrittenSnapshot {
    pub path: PathBuf,
    pub record_count: usize,
    pub snapshot: CategorizedSnapshot,
}

/// File name for a subscription's snapshot taken at `at`
pub fn snapshot_file_name(subscription_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "discovery_{}_{}.json",
        subscription_id,
        at.format(TIMESTAMP_FORMAT)
    )
}

/// Writes snapshots into a discovery directory
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Categorize `records` and persist the result.
    ///
    /// A run in the same second for the same subscription replaces the
    /// earlier file.
    pub fn write(
        &self,
        subscription_id: &str,
        records: &[ResourceRecord],
        at: DateTime<Utc>,
    ) -> Result<WrittenSnapshot> {
        let snapshot = CategorizedSnapshot::from_records(records);
        let path = self.dir.join(snapshot_file_name(subscription_id, at));

        fs::create_dir_all(&self.dir).map_err(|e| DiscoveryError::write(&self.dir, e))?;

        let mut content = serde_json::to_vec_pretty(&snapshot)?;
        content.push(b'\n');
        write_atomically(&self.dir, &path, &content)?;

        tracing::debug!("Wrote {} bytes to {}", content.len(), path.display());

        Ok(WrittenSnapshot {
            path,
            record_count: records.len(),
            snapshot,
        })
    }
}

/// Write through a uniquely named sibling temp file and rename it into place
fn write_atomically(dir: &Path, path: &Path, content: &[u8]) -> Result<()> {
    let mut file = NamedTempFile::new_in(dir).map_err(|e| DiscoveryError::write(dir, e))?;

    file.write_all(content)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| DiscoveryError::write(file.path(), e))?;

    // The temp file is removed on drop if persisting fails
    file.persist(path)
        .map_err(|e| DiscoveryError::write(path, e.error))?;

    Ok(())
}

/// Load a previously written snapshot
pub fn read_snapshot(path: &Path) -> Result<CategorizedSnapshot> {
    let content = fs::read_to_string(path).map_err(|e| DiscoveryError::write(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::Category;
    use chrono::TimeZone;
    use serde_json::{json, Map};

    fn record(name: &str, resource_type: &str) -> ResourceRecord {
        ResourceRecord {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            resource_group: "rg1".to_string(),
            location: "westeurope".to_string(),
            properties: Map::new(),
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap()
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            snapshot_file_name("sub-123", at()),
            "discovery_sub-123_20240309-070501.json"
        );
    }

    #[test]
    fn test_write_creates_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("discovery");
        let writer = SnapshotWriter::new(&dir);

        let written = writer
            .write("sub-1", &[record("vm1", "Microsoft.Compute/virtualMachines")], at())
            .unwrap();

        assert_eq!(written.record_count, 1);
        assert_eq!(written.path, dir.join("discovery_sub-1_20240309-070501.json"));
        assert!(written.path.exists());

        // No temp files left behind
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);
    }

    #[test]
    fn test_written_json_is_indented_and_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(tmp.path());
        let mut db = record("db1", "Microsoft.Sql/servers");
        db.properties.insert("version".to_string(), json!("12.0"));

        let written = writer
            .write("sub-1", &[db, record("app", "Microsoft.Web/sites")], at())
            .unwrap();

        let text = fs::read_to_string(&written.path).unwrap();
        assert!(text.contains("\n  \"compute\": []"));

        let loaded = read_snapshot(&written.path).unwrap();
        assert_eq!(loaded, written.snapshot);
        assert_eq!(loaded.bucket(Category::Databases)[0].properties["version"], "12.0");
        assert_eq!(loaded.bucket(Category::Other)[0].name, "app");
    }

    #[test]
    fn test_same_second_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(tmp.path());

        let first = writer
            .write("sub-1", &[record("vm1", "Microsoft.Compute/virtualMachines")], at())
            .unwrap();
        let second = writer
            .write("sub-1", &[record("st1", "Microsoft.Storage/storageAccounts")], at())
            .unwrap();

        assert_eq!(first.path, second.path);
        let loaded = read_snapshot(&second.path).unwrap();
        assert!(loaded.compute.is_empty());
        assert_eq!(loaded.storage.len(), 1);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_concurrent_same_second_writers_both_succeed() {
        use std::sync::{Arc, Barrier};

        let tmp = tempfile::tempdir().unwrap();
        let records: Vec<ResourceRecord> = (0..5_000)
            .map(|i| record(&format!("vm{}", i), "Microsoft.Compute/virtualMachines"))
            .collect();
        let records = Arc::new(records);

        for _ in 0..10 {
            let barrier = Arc::new(Barrier::new(2));
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let writer = SnapshotWriter::new(tmp.path());
                    let barrier = Arc::clone(&barrier);
                    let records = Arc::clone(&records);
                    std::thread::spawn(move || {
                        barrier.wait();
                        writer.write("sub-1", &records, at())
                    })
                })
                .collect();

            for handle in handles {
                let written = handle.join().unwrap().expect("same-second write should succeed");
                assert_eq!(written.record_count, 5_000);
            }

            let loaded = read_snapshot(&tmp.path().join("discovery_sub-1_20240309-070501.json"))
                .unwrap();
            assert_eq!(loaded.compute.len(), 5_000);
            assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
        }
    }

    #[test]
    fn test_unwritable_directory_is_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        fs::write(&blocker, b"x").unwrap();

        let err = SnapshotWriter::new(blocker.join("sub"))
            .write("sub-1", &[], at())
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Write);
    }
}
