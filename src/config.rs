use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::storage::{FileStore, StorageError};

pub const DEFAULT_HISTORY_KEY: &str = "lensCycleHistory";
pub const DEFAULT_LEGACY_KEY: &str = "lensCycle";

/// Where and under which keys the cycle history is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageConfig {
    /// `None` resolves to the platform's local data directory.
    pub data_dir: Option<PathBuf>,
    /// Optional sub-directory, used to keep test data apart from real data.
    pub namespace: Option<String>,
    pub history_key: String,
    pub legacy_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            namespace: None,
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            legacy_key: DEFAULT_LEGACY_KEY.to_string(),
        }
    }
}

impl StorageConfig {
    /// Config rooted at `dir` under its own namespace.
    pub fn isolated(dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            data_dir: Some(dir.into()),
            namespace: Some(namespace.into()),
            ..Self::default()
        }
    }

    pub fn resolve_dir(&self) -> Result<PathBuf, StorageError> {
        let base = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_local_dir()
                .ok_or(StorageError::NoDataDir)?
                .join("lens-tracker"),
        };
        Ok(match &self.namespace {
            Some(ns) => base.join(ns),
            None => base,
        })
    }

    pub fn open_file_store(&self) -> Result<FileStore, StorageError> {
        FileStore::open(self.resolve_dir()?)
    }
}
