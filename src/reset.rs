use std::{
    fs::{self, File},
    io::ErrorKind,
    path::Path,
};

use anyhow::Context;
use log::{debug, info};

/// Result of handing a message to the dispatcher
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Delivery {
    Sent,
    Failed,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResetOutcome {
    /// File was deleted and recreated empty
    Reset,
    /// Reset is disabled or the send failed, file left untouched
    Skipped,
}

/// Empties the log file after a successful send when `reset` is enabled
pub fn apply(reset: bool, delivery: Delivery, log_path: &Path) -> anyhow::Result<ResetOutcome> {
    if !reset || delivery != Delivery::Sent {
        debug!("Not resetting {log_path:?} (reset: {reset}, delivery: {delivery:?})");
        return Ok(ResetOutcome::Skipped);
    }

    match fs::remove_file(log_path) {
        Ok(()) => (),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{log_path:?} already gone before reset");
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to delete log file {log_path:?}"));
        }
    }
    File::create(log_path)
        .with_context(|| format!("Failed to recreate log file {log_path:?}"))?;

    info!("Log file reset: {log_path:?}");
    Ok(ResetOutcome::Reset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn log_with(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[rstest]
    #[case(false, Delivery::Sent)]
    #[case(false, Delivery::Failed)]
    #[case(true, Delivery::Failed)]
    fn untouched(#[case] reset: bool, #[case] delivery: Delivery) {
        // Arrange
        let (_dir, path) = log_with("keep me\n");

        // Act
        let actual = apply(reset, delivery, &path).unwrap();

        // Assert
        assert_eq!(actual, ResetOutcome::Skipped);
        assert_eq!(fs::read_to_string(&path).unwrap(), "keep me\n");
    }

    #[test]
    fn reset_after_send() {
        let (_dir, path) = log_with("a\nb\n");

        let actual = apply(true, Delivery::Sent, &path).unwrap();

        assert_eq!(actual, ResetOutcome::Reset);
        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn reset_creates_new_file() {
        use std::os::unix::fs::MetadataExt;

        let (_dir, path) = log_with("a\n");
        // Hold the old file open so its inode cannot be reused
        let _old = File::open(&path).unwrap();
        let old_inode = fs::metadata(&path).unwrap().ino();

        apply(true, Delivery::Sent, &path).unwrap();

        assert_ne!(fs::metadata(&path).unwrap().ino(), old_inode);
    }

    #[test]
    fn missing_file_recreated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let actual = apply(true, Delivery::Sent, &path).unwrap();

        assert_eq!(actual, ResetOutcome::Reset);
        assert!(path.exists());
    }

    #[test]
    fn unwritable_location_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("app.log");

        assert!(apply(true, Delivery::Sent, &path).is_err());
    }
}
