//! Snapshot record data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One preserved version of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Copy of the document bytes. Owned by this record alone.
    pub backup_path: PathBuf,

    /// When the snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// CRC-32 of the document at snapshot time, if it could be computed.
    #[serde(default)]
    pub content_hash: Option<u32>,
}

impl SnapshotRecord {
    /// Create a new snapshot record.
    pub fn new(backup_path: PathBuf, timestamp: DateTime<Utc>, content_hash: Option<u32>) -> Self {
        Self {
            backup_path,
            timestamp,
            content_hash,
        }
    }

    /// Whether this record holds the same content as `other`.
    ///
    /// Records without a hash never match anything, including each other.
    pub fn same_content(&self, other: &SnapshotRecord) -> bool {
        match (self.content_hash, other.content_hash) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: Option<u32>) -> SnapshotRecord {
        SnapshotRecord::new(PathBuf::from("/b/x-1"), Utc::now(), hash)
    }

    #[test]
    fn equal_hashes_match() {
        assert!(record(Some(7)).same_content(&record(Some(7))));
        assert!(!record(Some(7)).same_content(&record(Some(8))));
    }

    #[test]
    fn absent_hashes_never_match() {
        assert!(!record(None).same_content(&record(None)));
        assert!(!record(None).same_content(&record(Some(1))));
        assert!(!record(Some(1)).same_content(&record(None)));
    }

    #[test]
    fn missing_hash_field_deserializes_as_none() {
        let json = r#"{"backup_path":"/b/x-1","timestamp":"2024-05-01T10:00:00Z"}"#;
        let parsed: SnapshotRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.content_hash, None);
    }
}
