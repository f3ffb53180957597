//! JSONL audit store for `tollgate`. Writes one entry per line.
//!
//! Each append is flushed and fsynced before it returns, so a guarded destructive operation
//! never runs ahead of its record. Reopening a file resumes id numbering after the highest
//! id on disk.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tollgate::audit::{sort_newest_first, AuditEntry, AuditError, AuditFilter, AuditStore, EntryId};

#[derive(Debug)]
pub struct JsonlAuditStore {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlAuditStore {
    /// Open (or create) the log at `path` in append mode.
    ///
    /// A torn final line left by a crash mid-append is cut off first, so later appends start
    /// on a clean line.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let existing = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let file = OpenOptions::new().create(true).append(true).open(&path).await?;
        if matches!(existing.last(), Some(b) if *b != b'\n') {
            let keep = existing.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
            tracing::warn!(
                target: "tollgate::audit",
                path = %path.display(),
                dropped_bytes = existing.len() - keep,
                "truncating torn trailing audit line"
            );
            file.set_len(keep as u64).await?;
            file.sync_data().await?;
        }
        Ok(Self { path, file: Mutex::new(file) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // Callers hold the file lock so no half-written line is visible.
    async fn read_all(&self) -> Result<Vec<AuditEntry>, AuditError> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str::<AuditEntry>(line).map_err(AuditError::from))
            .collect()
    }
}

#[async_trait]
impl AuditStore for JsonlAuditStore {
    async fn append(&self, entry: &AuditEntry) -> Result<(), AuditError> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }

    async fn scan(
        &self,
        filter: &AuditFilter,
        limit: usize,
    ) -> Result<Vec<AuditEntry>, AuditError> {
        let _writer = self.file.lock().await;
        let mut found: Vec<AuditEntry> =
            self.read_all().await?.into_iter().filter(|e| e.matches(filter)).collect();
        sort_newest_first(&mut found);
        found.truncate(limit);
        Ok(found)
    }

    async fn last_id(&self) -> Result<Option<EntryId>, AuditError> {
        let _writer = self.file.lock().await;
        Ok(self.read_all().await?.iter().map(|e| e.id).max())
    }
}
