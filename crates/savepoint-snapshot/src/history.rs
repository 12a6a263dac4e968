//! Per-document snapshot history with bounded length and deduplication.
//!
//! The table is purely in-memory. Records that leave it through dedup or
//! eviction are handed back to the caller, which owns deleting their backup
//! artifacts.

use crate::SnapshotRecord;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

/// Default bound on the number of snapshots kept per document.
pub const MAX_HISTORY: usize = 20;

/// Histories for every known document, oldest record first.
#[derive(Debug, Clone)]
pub struct HistoryTable {
    histories: HashMap<PathBuf, VecDeque<SnapshotRecord>>,
    max_history: usize,
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self::new(MAX_HISTORY)
    }
}

impl HistoryTable {
    /// Create an empty table keeping at most `max_history` records per document.
    pub fn new(max_history: usize) -> Self {
        Self {
            histories: HashMap::new(),
            max_history: max_history.max(1),
        }
    }

    /// The per-document bound.
    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Add a record as the newest snapshot of `document`.
    ///
    /// If the current newest record holds the same content, it is replaced and
    /// returned so its artifact can be discarded. Otherwise the record is
    /// appended and `None` is returned.
    pub fn append_or_replace(
        &mut self,
        document: &Path,
        record: SnapshotRecord,
    ) -> Option<SnapshotRecord> {
        let history = self.histories.entry(document.to_path_buf()).or_default();

        let duplicate = history
            .back()
            .is_some_and(|newest| newest.same_content(&record));

        if duplicate {
            history
                .back_mut()
                .map(|newest| std::mem::replace(newest, record))
        } else {
            history.push_back(record);
            None
        }
    }

    /// Drop the oldest records of `document` until it fits the bound.
    ///
    /// Returns the evicted records, oldest first.
    pub fn evict_overflow(&mut self, document: &Path) -> Vec<SnapshotRecord> {
        let Some(history) = self.histories.get_mut(document) else {
            return Vec::new();
        };

        let overflow = history.len().saturating_sub(self.max_history);
        history.drain(..overflow).collect()
    }

    /// Peek at the newest record of `document`.
    pub fn newest(&self, document: &Path) -> Option<&SnapshotRecord> {
        self.histories.get(document).and_then(|h| h.back())
    }

    /// Remove and return the newest record of `document`.
    pub fn remove_newest(&mut self, document: &Path) -> Option<SnapshotRecord> {
        let history = self.histories.get_mut(document)?;
        let record = history.pop_back();
        if history.is_empty() {
            self.histories.remove(document);
        }
        record
    }

    /// Number of records held for `document`.
    pub fn len(&self, document: &Path) -> usize {
        self.histories.get(document).map_or(0, VecDeque::len)
    }

    /// Whether no document has any history.
    pub fn is_empty(&self) -> bool {
        self.histories.is_empty()
    }

    /// Records of `document`, oldest first.
    pub fn records(&self, document: &Path) -> impl Iterator<Item = &SnapshotRecord> {
        self.histories.get(document).into_iter().flatten()
    }

    /// Every document with a non-empty history.
    pub fn documents(&self) -> impl Iterator<Item = &Path> {
        self.histories.keys().map(PathBuf::as_path)
    }

    /// Replace the whole history of `document`, e.g. when loading an index.
    ///
    /// Records beyond the bound are returned, oldest first.
    pub fn load(&mut self, document: PathBuf, records: Vec<SnapshotRecord>) -> Vec<SnapshotRecord> {
        if records.is_empty() {
            self.histories.remove(&document);
            return Vec::new();
        }
        self.histories.insert(document.clone(), records.into());
        self.evict_overflow(&document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(name: &str, hash: Option<u32>) -> SnapshotRecord {
        SnapshotRecord::new(PathBuf::from(format!("/backups/{name}")), Utc::now(), hash)
    }

    fn names(table: &HistoryTable, doc: &Path) -> Vec<String> {
        table
            .records(doc)
            .map(|r| r.backup_path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn appends_distinct_content() {
        let mut table = HistoryTable::default();
        let doc = Path::new("/docs/a");

        assert!(table.append_or_replace(doc, record("1", Some(1))).is_none());
        assert!(table.append_or_replace(doc, record("2", Some(2))).is_none());

        assert_eq!(names(&table, doc), vec!["1", "2"]);
    }

    #[test]
    fn replaces_newest_on_matching_hash() {
        let mut table = HistoryTable::default();
        let doc = Path::new("/docs/a");

        table.append_or_replace(doc, record("1", Some(1)));
        table.append_or_replace(doc, record("2", Some(5)));
        let superseded = table.append_or_replace(doc, record("3", Some(5)));

        assert_eq!(superseded.unwrap().backup_path, PathBuf::from("/backups/2"));
        assert_eq!(names(&table, doc), vec!["1", "3"]);
    }

    #[test]
    fn only_the_newest_record_is_compared() {
        let mut table = HistoryTable::default();
        let doc = Path::new("/docs/a");

        table.append_or_replace(doc, record("1", Some(1)));
        table.append_or_replace(doc, record("2", Some(2)));
        assert!(table.append_or_replace(doc, record("3", Some(1))).is_none());

        assert_eq!(table.len(doc), 3);
    }

    #[test]
    fn absent_hashes_always_append() {
        let mut table = HistoryTable::default();
        let doc = Path::new("/docs/a");

        table.append_or_replace(doc, record("1", None));
        table.append_or_replace(doc, record("2", None));
        table.append_or_replace(doc, record("3", Some(3)));
        table.append_or_replace(doc, record("4", None));

        assert_eq!(table.len(doc), 4);
    }

    #[test]
    fn evicts_oldest_beyond_bound() {
        let mut table = HistoryTable::new(3);
        let doc = Path::new("/docs/a");

        for i in 0..5u32 {
            table.append_or_replace(doc, record(&i.to_string(), Some(i)));
        }
        let evicted = table.evict_overflow(doc);

        assert_eq!(
            evicted
                .iter()
                .map(|r| r.backup_path.clone())
                .collect::<Vec<_>>(),
            vec![PathBuf::from("/backups/0"), PathBuf::from("/backups/1")]
        );
        assert_eq!(names(&table, doc), vec!["2", "3", "4"]);
        assert!(table.evict_overflow(doc).is_empty());
    }

    #[test]
    fn newest_peeks_and_remove_newest_pops() {
        let mut table = HistoryTable::default();
        let doc = Path::new("/docs/a");

        table.append_or_replace(doc, record("1", Some(1)));
        table.append_or_replace(doc, record("2", Some(2)));

        assert_eq!(table.newest(doc).unwrap().backup_path, PathBuf::from("/backups/2"));
        assert_eq!(table.len(doc), 2);

        assert_eq!(
            table.remove_newest(doc).unwrap().backup_path,
            PathBuf::from("/backups/2")
        );
        assert_eq!(
            table.remove_newest(doc).unwrap().backup_path,
            PathBuf::from("/backups/1")
        );
        assert!(table.remove_newest(doc).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn documents_are_independent() {
        let mut table = HistoryTable::default();
        let a = Path::new("/docs/a");
        let b = Path::new("/docs/b");

        table.append_or_replace(a, record("a1", Some(1)));
        table.append_or_replace(b, record("b1", Some(1)));
        table.append_or_replace(b, record("b2", Some(2)));
        table.remove_newest(a);

        assert_eq!(table.len(a), 0);
        assert_eq!(names(&table, b), vec!["b1", "b2"]);
        assert_eq!(table.documents().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn load_trims_to_bound() {
        let mut table = HistoryTable::new(2);
        let doc = PathBuf::from("/docs/a");
        let records = (0..4u32).map(|i| record(&i.to_string(), Some(i))).collect();

        let evicted = table.load(doc.clone(), records);

        assert_eq!(evicted.len(), 2);
        assert_eq!(names(&table, &doc), vec!["2", "3"]);
    }

    #[test]
    fn zero_bound_is_clamped_to_one() {
        let table = HistoryTable::new(0);
        assert_eq!(table.max_history(), 1);
    }
}
