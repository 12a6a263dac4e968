//! On-disk index of the history table.
//!
//! The index lets a backup directory outlive the process that filled it. It
//! is written atomically (temp file, then rename) next to the artifact
//! directory. Artifacts are recorded by file name only, so the directory can
//! be reopened through another path (a symlink, a rename) and still resolve.

use crate::{HistoryTable, SnapshotRecord, SnapshotResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// File name of the index inside the backup directory.
pub const INDEX_FILE: &str = "index.json";

const INDEX_VERSION: u32 = 2;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    documents: Vec<IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    document: PathBuf,
    records: Vec<IndexRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    artifact: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    content_hash: Option<u32>,
}

/// Histories loaded from an index, with artifacts resolved against the
/// current artifact directory.
pub(crate) type LoadedHistories = Vec<(PathBuf, Vec<SnapshotRecord>)>;

/// Read the index from `backup_dir`.
///
/// Returns `None` if no index has ever been written there.
pub(crate) async fn read(
    backup_dir: &Path,
    artifacts_dir: &Path,
) -> SnapshotResult<Option<LoadedHistories>> {
    let path = backup_dir.join(INDEX_FILE);

    let content = match fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let index: IndexFile = serde_json::from_str(&content)?;
    let histories = index
        .documents
        .into_iter()
        .map(|entry| {
            let records = entry
                .records
                .into_iter()
                .filter_map(|record| {
                    if !is_plain_file_name(&record.artifact) {
                        warn!(artifact = %record.artifact, "Ignoring index entry outside the artifact directory");
                        return None;
                    }
                    Some(SnapshotRecord::new(
                        artifacts_dir.join(&record.artifact),
                        record.timestamp,
                        record.content_hash,
                    ))
                })
                .collect();
            (entry.document, records)
        })
        .collect();

    Ok(Some(histories))
}

/// Write the whole table to `backup_dir`.
pub(crate) async fn write(backup_dir: &Path, table: &HistoryTable) -> SnapshotResult<()> {
    let mut documents: Vec<IndexEntry> = table
        .documents()
        .map(|document| IndexEntry {
            document: document.to_path_buf(),
            records: table
                .records(document)
                .filter_map(|record| {
                    let artifact = record.backup_path.file_name()?.to_str()?.to_string();
                    Some(IndexRecord {
                        artifact,
                        timestamp: record.timestamp,
                        content_hash: record.content_hash,
                    })
                })
                .collect(),
        })
        .collect();
    documents.sort_by(|a, b| a.document.cmp(&b.document));

    let index = IndexFile {
        version: INDEX_VERSION,
        documents,
    };
    let content = serde_json::to_string_pretty(&index)?;

    let path = backup_dir.join(INDEX_FILE);
    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content).await?;
    fs::rename(&temp_path, &path).await?;

    Ok(())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && Path::new(name).file_name() == Some(OsStr::new(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_index_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(read(dir.path(), dir.path()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn written_index_preserves_order() {
        let dir = TempDir::new().unwrap();
        let doc = Path::new("/docs/plan.txt");
        let mut table = HistoryTable::default();
        for i in 0..3u32 {
            let backup = dir.path().join(format!("plan-{i}"));
            table.append_or_replace(doc, SnapshotRecord::new(backup, Utc::now(), Some(i)));
        }

        write(dir.path(), &table).await.unwrap();
        let loaded = read(dir.path(), dir.path()).await.unwrap().unwrap();

        assert_eq!(loaded.len(), 1);
        let (document, records) = &loaded[0];
        assert_eq!(document, doc);
        let hashes: Vec<_> = records.iter().map(|r| r.content_hash).collect();
        assert_eq!(hashes, vec![Some(0), Some(1), Some(2)]);
        assert!(!dir.path().join("index.json.tmp").exists());
    }

    #[tokio::test]
    async fn artifacts_resolve_against_the_current_directory() {
        let dir = TempDir::new().unwrap();
        let doc = Path::new("/docs/plan.txt");
        let mut table = HistoryTable::default();
        table.append_or_replace(
            doc,
            SnapshotRecord::new(PathBuf::from("/old/location/plan-1"), Utc::now(), None),
        );

        write(dir.path(), &table).await.unwrap();
        let moved = dir.path().join("artifacts");
        let loaded = read(dir.path(), &moved).await.unwrap().unwrap();

        assert_eq!(loaded[0].1[0].backup_path, moved.join("plan-1"));
    }

    #[tokio::test]
    async fn entries_escaping_the_artifact_directory_are_dropped() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"version":2,"documents":[{"document":"/docs/a","records":[
            {"artifact":"../secret","timestamp":"2024-05-01T10:00:00Z"},
            {"artifact":"a-1","timestamp":"2024-05-01T10:00:01Z"}]}]}"#;
        fs::write(dir.path().join(INDEX_FILE), json).await.unwrap();

        let loaded = read(dir.path(), dir.path()).await.unwrap().unwrap();
        assert_eq!(loaded[0].1.len(), 1);
        assert_eq!(loaded[0].1[0].backup_path, dir.path().join("a-1"));
    }

    #[tokio::test]
    async fn corrupt_index_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "{not json").await.unwrap();
        assert!(read(dir.path(), dir.path()).await.is_err());
    }
}
