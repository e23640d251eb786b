//! Logging setup
//!
//! Lines go to `agent.log` inside the discovery directory and are mirrored to
//! stdout.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "agent.log";

/// Log file location for a discovery directory
pub fn log_path(discovery_dir: &Path) -> PathBuf {
    discovery_dir.join(LOG_FILE_NAME)
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut options = OpenOptions::new();
    options.create(true).append(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o640);
    }

    options.open(path)
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber writing to the log file and stdout.
///
/// Falls back to stdout only if the log file cannot be opened. The returned
/// guard must be held until the process exits so buffered lines are flushed.
pub fn init(discovery_dir: &Path, level: &str) -> Option<WorkerGuard> {
    let path = log_path(discovery_dir);

    match open_log_file(&path) {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);

            tracing_subscriber::fmt()
                .with_env_filter(env_filter(level))
                .with_writer(non_blocking.and(std::io::stdout))
                .with_ansi(false)
                .with_target(false)
                .init();

            tracing::debug!("Log file: {}", path.display());
            Some(guard)
        }
        Err(e) => {
            init_console(level);
            tracing::warn!("Cannot open log file {}: {}; logging to console only", path.display(), e);
            None
        }
    }
}

/// Console-only logging, used before the discovery directory is known
pub fn init_console(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(std::io::stdout)
        .with_ansi(false)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_path() {
        assert_eq!(log_path(Path::new("/data")), PathBuf::from("/data/agent.log"));
    }

    #[test]
    fn test_open_log_file_appends() {
        use std::io::Write;

        let tmp = tempfile::tempdir().unwrap();
        let path = log_path(&tmp.path().join("logs"));

        writeln!(open_log_file(&path).unwrap(), "first").unwrap();
        writeln!(open_log_file(&path).unwrap(), "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_log_file_is_not_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let path = log_path(tmp.path());
        open_log_file(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o007, 0);
    }
}
