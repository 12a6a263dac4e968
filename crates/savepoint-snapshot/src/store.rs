//! Snapshot storage implementation.

use crate::hasher::{ContentHasher, Crc32Hasher};
use crate::path_key::artifact_key;
use crate::{index, HistoryTable, SnapshotConfig, SnapshotError, SnapshotRecord, SnapshotResult};
use chrono::{DateTime, Utc};
use savepoint_util::path::absolutize;
use savepoint_util::OperationTimer;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Subdirectory of the backup directory that holds artifacts.
pub const ARTIFACTS_DIR: &str = "artifacts";

/// Storage for document snapshots.
///
/// Backups are whole-file copies:
/// ```text
/// backup_dir/
///   index.json                     # History table (when persist_index is on)
///   artifacts/
///     <key>-<millis>               # One artifact per live record
///     <key>-<millis>-<n>           # Same document, same millisecond
/// ```
///
/// Only `artifacts/` and `index.json` belong to the store; nothing else in
/// the backup directory is ever touched.
///
/// The store does no locking. Every mutating call takes `&mut self`; callers
/// that share a store must serialize access, and must not overwrite a
/// document until `record_snapshot` for it has returned.
pub struct SnapshotStore {
    /// Directory holding the index and the artifact directory.
    backup_dir: PathBuf,

    /// Directory holding backup artifacts.
    artifacts_dir: PathBuf,

    /// Configuration.
    config: SnapshotConfig,

    /// In-memory histories, keyed by normalized absolute document path.
    table: HistoryTable,

    /// Digest used for deduplication.
    hasher: Box<dyn ContentHasher>,
}

impl SnapshotStore {
    /// Open a snapshot store, creating its directories if needed.
    ///
    /// With `persist_index` on, histories saved by an earlier process are
    /// loaded, records whose artifacts have disappeared are dropped, and
    /// artifacts no record references are removed. Without an index nothing
    /// is removed.
    pub async fn open(config: SnapshotConfig) -> SnapshotResult<Self> {
        let backup_dir = config.resolved_backup_dir()?;
        let artifacts_dir = backup_dir.join(ARTIFACTS_DIR);
        fs::create_dir_all(&artifacts_dir).await?;

        if !fs::metadata(&artifacts_dir).await?.is_dir() {
            return Err(SnapshotError::invalid_path(&artifacts_dir, "not a directory"));
        }

        if !config.enabled {
            debug!("Snapshots are disabled");
        }

        let mut store = Self {
            table: HistoryTable::new(config.max_history),
            backup_dir,
            artifacts_dir,
            config,
            hasher: Box::new(Crc32Hasher),
        };

        if store.config.persist_index {
            store.load_index().await;
        }

        debug!(backup_dir = %store.backup_dir.display(), "Opened snapshot store");
        Ok(store)
    }

    /// Replace the content digest used for deduplication.
    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Directory holding the index and the artifact directory.
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Directory holding backup artifacts.
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    /// The active configuration.
    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Preserve the current content of `path` before it is overwritten.
    ///
    /// Missing and empty files are skipped. Failures are logged and never
    /// returned: a broken backup must not block the save it protects.
    pub async fn record_snapshot(&mut self, path: &Path, timestamp: DateTime<Utc>) {
        let _timer = OperationTimer::start("record", path);

        if !self.config.enabled {
            debug!(path = %path.display(), "Snapshots disabled, not recording");
            return;
        }

        let document = absolutize(path);

        match fs::metadata(&document).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {}
            Ok(_) => {
                debug!(path = %document.display(), "Nothing to preserve");
                return;
            }
            Err(e) => {
                debug!(path = %document.display(), error = %e, "Nothing to preserve");
                return;
            }
        }

        let backup_path = self.unique_backup_path(&document, timestamp).await;

        if let Err(e) = fs::copy(&document, &backup_path).await {
            warn!(
                path = %document.display(),
                backup = %backup_path.display(),
                kind = ?e.kind(),
                error = %e,
                "Failed to copy document into backup, snapshot not recorded"
            );
            remove_artifact(&backup_path, "partial").await;
            return;
        }

        // Hash the copy, not the document: the digest must describe the kept bytes.
        let content_hash = match self.hasher.hash(&backup_path).await {
            Ok(hash) => Some(hash),
            Err(e) => {
                warn!(
                    path = %document.display(),
                    backup = %backup_path.display(),
                    error = %e,
                    "Failed to hash backup, recording it without a digest"
                );
                None
            }
        };

        let record = SnapshotRecord::new(backup_path, timestamp, content_hash);
        if let Some(superseded) = self.table.append_or_replace(&document, record) {
            debug!(path = %document.display(), "Unchanged content, replacing newest snapshot");
            remove_artifact(&superseded.backup_path, "superseded").await;
        }

        for evicted in self.table.evict_overflow(&document) {
            remove_artifact(&evicted.backup_path, "evicted").await;
        }

        self.persist().await;

        info!(
            path = %document.display(),
            history = self.table.len(&document),
            "Recorded snapshot"
        );
    }

    /// Take back the newest snapshot of `path`.
    ///
    /// Returns its content and removes it from history, or `None` when there
    /// is nothing to undo. If the backup cannot be read the record is kept so
    /// a later call can retry it.
    pub async fn undo(&mut self, path: &Path) -> Option<Vec<u8>> {
        let _timer = OperationTimer::start("undo", path);

        let content = self.peek(path).await?;
        self.discard_newest(path).await;
        Some(content)
    }

    /// Read the newest snapshot of `path` without consuming it.
    pub async fn peek(&self, path: &Path) -> Option<Vec<u8>> {
        let document = absolutize(path);

        let Some(record) = self.table.newest(&document) else {
            debug!(path = %document.display(), "Nothing to undo");
            return None;
        };

        match fs::read(&record.backup_path).await {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(
                    path = %document.display(),
                    backup = %record.backup_path.display(),
                    error = %e,
                    "Failed to read snapshot, keeping it for retry"
                );
                None
            }
        }
    }

    /// Drop the newest snapshot of `path` and delete its artifact.
    ///
    /// Returns whether there was a snapshot to drop.
    pub async fn discard_newest(&mut self, path: &Path) -> bool {
        let document = absolutize(path);

        let Some(record) = self.table.remove_newest(&document) else {
            return false;
        };
        remove_artifact(&record.backup_path, "consumed").await;
        self.persist().await;

        info!(
            path = %document.display(),
            remaining = self.table.len(&document),
            "Consumed snapshot"
        );
        true
    }

    /// Snapshots of `path`, oldest first.
    pub fn history(&self, path: &Path) -> Vec<SnapshotRecord> {
        self.table.records(&absolutize(path)).cloned().collect()
    }

    /// Number of snapshots held for `path`.
    pub fn history_len(&self, path: &Path) -> usize {
        self.table.len(&absolutize(path))
    }

    /// Pick an artifact path for `document` that no live record uses.
    async fn unique_backup_path(&self, document: &Path, timestamp: DateTime<Utc>) -> PathBuf {
        let base = format!("{}-{}", artifact_key(document), timestamp.timestamp_millis());
        let mut candidate = self.artifacts_dir.join(&base);
        let mut suffix = 1u32;

        while fs::try_exists(&candidate).await.unwrap_or(false) {
            candidate = self.artifacts_dir.join(format!("{base}-{suffix}"));
            suffix += 1;
        }

        candidate
    }

    /// Write the table to disk if persistence is enabled.
    async fn persist(&self) {
        if !self.config.persist_index {
            return;
        }
        if let Err(e) = index::write(&self.backup_dir, &self.table).await {
            warn!(backup_dir = %self.backup_dir.display(), error = %e, "Failed to write snapshot index");
        }
    }

    /// Load histories written by an earlier process and reconcile them with
    /// the artifacts actually present.
    async fn load_index(&mut self) {
        let entries = match index::read(&self.backup_dir, &self.artifacts_dir).await {
            Ok(Some(entries)) => entries,
            Ok(None) => return,
            Err(e) => {
                // Without a readable index live artifacts can't be told from orphans.
                warn!(backup_dir = %self.backup_dir.display(), error = %e, "Ignoring unreadable snapshot index");
                return;
            }
        };

        let mut dropped = 0usize;
        let mut trimmed = 0usize;
        for (document, records) in entries {
            let mut present = Vec::with_capacity(records.len());
            for record in records {
                if fs::try_exists(&record.backup_path).await.unwrap_or(false) {
                    present.push(record);
                } else {
                    dropped += 1;
                }
            }

            for evicted in self.table.load(document, present) {
                remove_artifact(&evicted.backup_path, "evicted").await;
                trimmed += 1;
            }
        }

        let removed = self.remove_orphans().await;
        if dropped > 0 || trimmed > 0 || removed > 0 {
            info!(dropped, trimmed, removed, "Reconciled snapshot index with artifacts");
            self.persist().await;
        }
    }

    /// Delete artifacts that no live record references.
    async fn remove_orphans(&self) -> usize {
        let live: HashSet<OsString> = self
            .table
            .documents()
            .flat_map(|document| self.table.records(document))
            .filter_map(|record| record.backup_path.file_name().map(OsString::from))
            .collect();

        let mut entries = match fs::read_dir(&self.artifacts_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(artifacts_dir = %self.artifacts_dir.display(), error = %e, "Failed to scan artifact directory");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file || live.contains(&entry.file_name()) {
                continue;
            }
            remove_artifact(&entry.path(), "orphaned").await;
            removed += 1;
        }

        removed
    }
}

/// Delete a backup artifact. Failures are logged and otherwise ignored.
async fn remove_artifact(path: &Path, reason: &str) {
    match fs::remove_file(path).await {
        Ok(()) => debug!(backup = %path.display(), reason, "Removed backup"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(backup = %path.display(), reason, error = %e, "Failed to remove backup"),
    }
}
