//! Snapshot/undo store for documents saved as whole files.
//!
//! Right before a document is overwritten, its current bytes are copied into a
//! backup directory. Each document keeps a bounded, oldest-first history of
//! those copies; saving unchanged content replaces the newest copy instead of
//! growing the history. Undo hands back the newest copy and consumes it.
//!
//! # Example
//!
//! ```no_run
//! use savepoint_snapshot::{SaveCoordinator, SnapshotConfig, SnapshotStore};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SnapshotStore::open(SnapshotConfig::default()).await?;
//! let coordinator = SaveCoordinator::new(store);
//! let doc = Path::new("/home/ana/budget.sheet");
//!
//! coordinator.save(doc, b"v1").await?;
//! coordinator.save(doc, b"v2").await?;
//!
//! // Back to "v1"
//! assert!(coordinator.revert(doc).await?);
//! # Ok(())
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod hasher;
mod history;
mod index;
mod path_key;
mod record;
mod store;

pub use config::{SnapshotConfig, CONFIG_ENV_VAR, PROJECT_CONFIG_FILE};
pub use coordinator::SaveCoordinator;
pub use error::{SnapshotError, SnapshotResult};
pub use hasher::{hash_file, ContentHasher, Crc32Hasher};
pub use history::{HistoryTable, MAX_HISTORY};
pub use index::INDEX_FILE;
pub use path_key::{artifact_key, path_key, MAX_ARTIFACT_KEY_LEN};
pub use record::SnapshotRecord;
pub use store::{SnapshotStore, ARTIFACTS_DIR};
