//! File-backed transport for working offline.
//!
//! Cells live in a single JSON object keyed by A1 range:
//!
//! ```json
//! { "_plan!A1": "# Plan: ..." }
//! ```
//!
//! A missing file behaves like a spreadsheet whose cells are all unset.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cell_ref::CellRef;
use crate::error::RemoteError;
use crate::transport::CellTransport;

pub struct FileTransport {
    path: PathBuf,
    // Serializes read-modify-write of the JSON document within one process.
    lock: Mutex<()>,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, RemoteError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                RemoteError::Other(format!(
                    "failed to parse cell file {}: {e}",
                    self.path.display()
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(RemoteError::Other(format!(
                "failed to read cell file {}: {e}",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl CellTransport for FileTransport {
    fn name(&self) -> &str {
        "file"
    }

    async fn get_cell(&self, cell: &CellRef) -> Result<String, RemoteError> {
        let _guard = self.lock.lock().await;
        let cells = self.load().await?;
        Ok(cells.get(&cell.to_string()).cloned().unwrap_or_default())
    }

    async fn set_cell(&self, cell: &CellRef, value: &str) -> Result<(), RemoteError> {
        let _guard = self.lock.lock().await;
        let mut cells = self.load().await?;
        cells.insert(cell.to_string(), value.to_owned());

        let contents = serde_json::to_string_pretty(&cells)
            .map_err(|e| RemoteError::Other(format!("failed to serialize cells: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                RemoteError::Other(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(&self.path, contents).await.map_err(|e| {
            RemoteError::Other(format!(
                "failed to write cell file {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(path = %self.path.display(), %cell, bytes = value.len(), "cell written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let tmp = tempfile::TempDir::new().unwrap();
        let transport = FileTransport::new(tmp.path().join("cells.json"));
        let cell: CellRef = "_plan!A1".parse().unwrap();
        assert_eq!(transport.get_cell(&cell).await.unwrap(), "");
    }

    #[tokio::test]
    async fn writes_persist_and_keep_other_cells() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("cells.json");
        let plan: CellRef = "_plan!A1".parse().unwrap();
        let other: CellRef = "Data!B2".parse().unwrap();

        let transport = FileTransport::new(&path);
        transport.set_cell(&plan, "# Plan: A\n").await.unwrap();
        transport.set_cell(&other, "42").await.unwrap();

        // A fresh transport sees the same document.
        let reopened = FileTransport::new(&path);
        assert_eq!(reopened.get_cell(&plan).await.unwrap(), "# Plan: A\n");
        assert_eq!(reopened.get_cell(&other).await.unwrap(), "42");
    }

    #[tokio::test]
    async fn corrupt_file_is_a_fatal_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("cells.json");
        std::fs::write(&path, "not json {").unwrap();

        let transport = FileTransport::new(&path);
        let cell: CellRef = "A1".parse().unwrap();
        let err = transport.get_cell(&cell).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
