//! Snapshot persistence for the log store.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::log_store::LogStore;

/// Rewrites the full log store to a single JSON file on every mutation.
///
/// The write goes to a sibling temp file first and is renamed into place, so
/// a concurrent reader of the snapshot either sees the previous complete
/// document or the new one, never a torn write. Callers hold the supervisor
/// state lock across the write, which totally orders snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
}

impl SnapshotWriter {
    /// Create a writer targeting `path`. Nothing is written until the first
    /// mutation; consumers must tolerate the file being absent.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Snapshot file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize `logs` and atomically replace the snapshot file.
    pub async fn write(&self, logs: &LogStore) -> io::Result<()> {
        let bytes = serde_json::to_vec_pretty(logs)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_full_document() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("logs.json"));

        let mut logs = LogStore::default();
        logs.append(1, "a".into());
        logs.append(2, "b".into());
        writer.write(&logs).await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let back: LogStore = serde_json::from_str(&content).unwrap();
        assert_eq!(back.get(1).unwrap(), ["a"]);
        assert_eq!(back.get(2).unwrap(), ["b"]);
    }

    #[tokio::test]
    async fn rewrite_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("logs.json"));

        let mut logs = LogStore::default();
        logs.append(1, "a".into());
        writer.write(&logs).await.unwrap();

        logs.remove(1);
        writer.write(&logs).await.unwrap();

        let content = std::fs::read_to_string(writer.path()).unwrap();
        let back: LogStore = serde_json::from_str(&content).unwrap();
        assert!(back.is_empty());
        assert!(!writer.path().with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SnapshotWriter::new(dir.path().join("nested/deep/logs.json"));

        writer.write(&LogStore::default()).await.unwrap();
        assert!(writer.path().exists());
    }
}
