//! Save coordination on top of the snapshot store.
//!
//! A save is "snapshot the old content, then write the new content", and the
//! two steps must not interleave with another save or undo. The coordinator
//! holds one lock over the store for each such unit.

use crate::{SnapshotError, SnapshotRecord, SnapshotResult, SnapshotStore};
use chrono::Utc;
use savepoint_util::OperationTimer;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Saves documents and walks them back through their snapshots.
#[derive(Clone)]
pub struct SaveCoordinator {
    store: Arc<Mutex<SnapshotStore>>,
}

impl SaveCoordinator {
    /// Create a coordinator owning `store`.
    pub fn new(store: SnapshotStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Write `content` to `path`, preserving the previous content first.
    ///
    /// The first save of a new file takes no snapshot. Snapshot failures are
    /// swallowed by the store; a failure to write the document is returned.
    pub async fn save(&self, path: &Path, content: &[u8]) -> SnapshotResult<()> {
        let _timer = OperationTimer::start("save", path);
        let mut store = self.store.lock().await;

        if fs::try_exists(path).await? {
            store.record_snapshot(path, Utc::now()).await;
        } else {
            debug!(path = %path.display(), "New document, nothing to preserve");
        }

        write_document(path, content).await?;
        info!(path = %path.display(), bytes = content.len(), "Saved document");
        Ok(())
    }

    /// Find the newest snapshot of `path` whose content differs from the file.
    ///
    /// Snapshots identical to what is on disk are consumed and skipped, since
    /// reverting to them would change nothing. A missing file counts as empty.
    pub async fn undo(&self, path: &Path) -> SnapshotResult<Option<Vec<u8>>> {
        let mut store = self.store.lock().await;
        undo_to_different(&mut store, path).await
    }

    /// Undo and write the recovered content back to `path`.
    ///
    /// No snapshot is taken of the content being replaced, so this cannot be
    /// redone. The snapshot is consumed only once the write has succeeded; a
    /// failed write leaves it in history. Returns whether anything was
    /// reverted.
    pub async fn revert(&self, path: &Path) -> SnapshotResult<bool> {
        let _timer = OperationTimer::start("revert", path);
        let mut store = self.store.lock().await;
        let current = read_current(path).await?;

        while let Some(content) = store.peek(path).await {
            if content == current {
                debug!(path = %path.display(), "Snapshot matches current content, skipping");
                store.discard_newest(path).await;
                continue;
            }

            write_document(path, &content).await?;
            store.discard_newest(path).await;
            info!(path = %path.display(), remaining = store.history_len(path), "Reverted document");
            return Ok(true);
        }

        Ok(false)
    }

    /// Content `undo` would return, without consuming anything.
    ///
    /// Walks history newest first past snapshots identical to the file.
    pub async fn preview(&self, path: &Path) -> SnapshotResult<Option<Vec<u8>>> {
        let store = self.store.lock().await;
        let current = read_current(path).await?;

        for record in store.history(path).iter().rev() {
            let content = fs::read(&record.backup_path).await?;
            if content != current {
                return Ok(Some(content));
            }
        }

        Ok(None)
    }

    /// Snapshots of `path`, oldest first.
    pub async fn history(&self, path: &Path) -> Vec<SnapshotRecord> {
        self.store.lock().await.history(path)
    }
}

async fn undo_to_different(
    store: &mut SnapshotStore,
    path: &Path,
) -> SnapshotResult<Option<Vec<u8>>> {
    let current = read_current(path).await?;

    while let Some(content) = store.undo(path).await {
        if content != current {
            return Ok(Some(content));
        }
        debug!(path = %path.display(), "Snapshot matches current content, skipping");
    }

    Ok(None)
}

/// Current content of the document; a missing file counts as empty.
async fn read_current(path: &Path) -> SnapshotResult<Vec<u8>> {
    match fs::read(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e.into()),
    }
}

/// Replace the document via a temp file and rename so readers never see a
/// partial write.
async fn write_document(path: &Path, content: &[u8]) -> SnapshotResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| SnapshotError::invalid_path(path, "no file name"))?;
    let temp_path = path.with_file_name(format!(".{}.savepoint-tmp", file_name.to_string_lossy()));

    fs::write(&temp_path, content).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}
