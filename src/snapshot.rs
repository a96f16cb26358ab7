use std::{fs, path::Path};

use anyhow::Context;
use log::trace;

/// Contents of the watched file at one tick
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Snapshot {
    Empty,
    Content(Vec<u8>),
}

impl Snapshot {
    /// Reads the whole file. Fails if the file is missing or unreadable.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let metadata =
            fs::metadata(path).with_context(|| format!("Failed to stat log file {path:?}"))?;
        if metadata.len() == 0 {
            trace!("{path:?} has size 0");
            return Ok(Self::Empty);
        }

        let bytes = fs::read(path).with_context(|| format!("Failed to read log file {path:?}"))?;
        // File may have been emptied between the stat and the read
        if bytes.is_empty() {
            Ok(Self::Empty)
        } else {
            Ok(Self::Content(bytes))
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bytes_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "").unwrap();

        let actual = Snapshot::read(&path).unwrap();

        assert_eq!(actual, Snapshot::Empty);
        assert!(actual.is_empty());
    }

    #[test]
    fn content_returned_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "a\nb\nc\n").unwrap();

        let actual = Snapshot::read(&path).unwrap();

        assert_eq!(actual, Snapshot::Content(b"a\nb\nc\n".to_vec()));
    }

    #[test]
    fn missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let actual = Snapshot::read(&dir.path().join("absent.log"));
        assert!(actual.is_err());
    }
}
