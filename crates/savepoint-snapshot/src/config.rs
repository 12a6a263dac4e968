//! Snapshot store configuration.
//!
//! Loading order (later sources override earlier):
//! 1. Global config `~/.config/savepoint/config.json`
//! 2. `SAVEPOINT_CONFIG_CONTENT` environment variable
//! 3. Project config `savepoint.json` in the project directory

use crate::history::MAX_HISTORY;
use crate::{SnapshotError, SnapshotResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable holding inline JSON configuration.
pub const CONFIG_ENV_VAR: &str = "SAVEPOINT_CONFIG_CONTENT";

/// File name of the project-level configuration.
pub const PROJECT_CONFIG_FILE: &str = "savepoint.json";

/// Configuration for the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Whether new snapshots are recorded. Undo keeps working either way.
    pub enabled: bool,

    /// Maximum number of snapshots kept per document.
    pub max_history: usize,

    /// Directory holding backup artifacts. Defaults to the data directory.
    pub backup_dir: Option<PathBuf>,

    /// Whether the history table is written to disk after every change.
    pub persist_index: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_history: MAX_HISTORY,
            backup_dir: None,
            persist_index: true,
        }
    }
}

/// A config source where every field is optional, so sources can be layered.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    enabled: Option<bool>,
    max_history: Option<usize>,
    backup_dir: Option<PathBuf>,
    persist_index: Option<bool>,
}

impl SnapshotConfig {
    /// Load configuration from all sources.
    ///
    /// Returns the merged config and the files it was read from.
    pub async fn load(project_dir: Option<&Path>) -> SnapshotResult<(Self, Vec<PathBuf>)> {
        let mut config = Self::default();
        let mut sources = Vec::new();

        if let Some(global_dir) = savepoint_util::path::config_dir() {
            let path = global_dir.join("config.json");
            if path.exists() {
                config = config.merge(Self::load_partial(&path).await?);
                sources.push(path);
            }
        }

        if let Ok(content) = std::env::var(CONFIG_ENV_VAR) {
            config = config.merge(Self::parse_partial(&content, "<env>")?);
        }

        if let Some(dir) = project_dir {
            let path = dir.join(PROJECT_CONFIG_FILE);
            if path.exists() {
                config = config.merge(Self::load_partial(&path).await?);
                sources.push(path);
            }
        }

        config.validate("<merged>")?;
        debug!(?config, sources = sources.len(), "Loaded snapshot config");
        Ok((config, sources))
    }

    /// Load a single configuration file on top of the defaults.
    pub async fn load_file(path: &Path) -> SnapshotResult<Self> {
        let config = Self::default().merge(Self::load_partial(path).await?);
        config.validate(&path.display().to_string())?;
        Ok(config)
    }

    /// Directory holding backup artifacts.
    pub fn resolved_backup_dir(&self) -> SnapshotResult<PathBuf> {
        match &self.backup_dir {
            Some(dir) => Ok(savepoint_util::path::absolutize(dir)),
            None => savepoint_util::path::backups_dir().ok_or_else(|| {
                SnapshotError::operation_failed("Could not determine data directory for backups")
            }),
        }
    }

    fn validate(&self, source: &str) -> SnapshotResult<()> {
        if self.max_history == 0 {
            return Err(SnapshotError::config(
                source,
                "max_history must be at least 1",
            ));
        }
        Ok(())
    }

    fn merge(mut self, other: PartialConfig) -> Self {
        if let Some(enabled) = other.enabled {
            self.enabled = enabled;
        }
        if let Some(max_history) = other.max_history {
            self.max_history = max_history;
        }
        if other.backup_dir.is_some() {
            self.backup_dir = other.backup_dir;
        }
        if let Some(persist_index) = other.persist_index {
            self.persist_index = persist_index;
        }
        self
    }

    async fn load_partial(path: &Path) -> SnapshotResult<PartialConfig> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::parse_partial(&content, &path.display().to_string())
    }

    fn parse_partial(content: &str, source: &str) -> SnapshotResult<PartialConfig> {
        serde_json::from_str(content).map_err(|e| SnapshotError::config(source, e.to_string()))
    }
}
