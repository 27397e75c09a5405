use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;
use crate::models::{CycleHistory, LensCycle, LensType};
use crate::storage::{FileStore, KeyValueStore, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("could not encode cycle history: {0}")]
    EncodingFailed(#[source] serde_json::Error),
    #[error("could not save cycle history: {0}")]
    SaveFailed(#[from] StorageError),
    #[error("could not read stored cycle history: {0}")]
    ReadFailed(#[source] StorageError),
    #[error("stored record is unreadable: {0}")]
    DecodingFailed(#[source] serde_json::Error),
    #[error("no active lens cycle")]
    NoCycleFound,
}

impl DataError {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            DataError::EncodingFailed(_) => "Your lens data could not be prepared for saving.",
            DataError::SaveFailed(_) => "Your changes could not be saved. Please try again.",
            DataError::ReadFailed(_) => {
                "Saved lens data could not be read, so nothing was changed."
            }
            DataError::DecodingFailed(_) => "Saved lens data could not be read.",
            DataError::NoCycleFound => "Start a lens cycle first.",
        }
    }
}

/// Owner of the persisted [`CycleHistory`].
///
/// A record that fails to decode is treated as absent, which falls back to
/// the legacy single-cycle record and finally to "no data". A store that
/// cannot be read at all (I/O error, wrong passphrase) is only "no data" for
/// display; write paths refuse to run on it so intact history is never
/// overwritten. Writes replace the whole record and report failures.
pub struct DataManager<S> {
    store: S,
    history_key: String,
    legacy_key: String,
}

impl DataManager<FileStore> {
    /// File-backed manager as described by `config`.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(Self::with_config(config.open_file_store()?, config))
    }
}

impl<S: KeyValueStore> DataManager<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, &StorageConfig::default())
    }

    pub fn with_config(store: S, config: &StorageConfig) -> Self {
        Self {
            store,
            history_key: config.history_key.clone(),
            legacy_key: config.legacy_key.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// History for display. Unreadable stores show as empty.
    pub fn load_history(&self) -> Option<CycleHistory> {
        match self.try_load_history() {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "could not read cycle history, showing no data");
                None
            }
        }
    }

    /// History as the base of a write. Only a missing or undecodable record
    /// counts as absent; a failing store is an error.
    pub fn try_load_history(&self) -> Result<Option<CycleHistory>, DataError> {
        match self.read_record::<CycleHistory>(&self.history_key)? {
            Some(history) => Ok(Some(history)),
            None => self.migrate_legacy(),
        }
    }

    fn history_for_write(&self) -> Result<CycleHistory, DataError> {
        Ok(self.try_load_history()?.unwrap_or_default())
    }

    pub fn save_history(&self, history: &CycleHistory) -> Result<(), DataError> {
        let bytes = serde_json::to_vec(history).map_err(DataError::EncodingFailed)?;
        self.store.set(&self.history_key, &bytes)?;
        debug!(
            archived = history.previous_cycles().len(),
            has_current = history.current_cycle().is_some(),
            "saved cycle history"
        );
        Ok(())
    }

    pub fn load_cycle(&self) -> Option<LensCycle> {
        self.load_history()?.into_current_cycle()
    }

    /// Replace the current cycle in place. Nothing is archived.
    pub fn save_cycle(&self, cycle: &LensCycle) -> Result<(), DataError> {
        let history = self.history_for_write()?.with_current(cycle.clone());
        self.save_history(&history)
    }

    pub fn update_cycle(&self, cycle: &LensCycle) -> Result<(), DataError> {
        self.save_cycle(cycle)
    }

    /// Archive the current cycle and start a fresh one.
    pub fn create_new_cycle(
        &self,
        lens_type: LensType,
        start_date: NaiveDate,
    ) -> Result<LensCycle, DataError> {
        let cycle = LensCycle::new(lens_type, start_date);
        let history = self.history_for_write()?.archive_and_start_new(cycle.clone());
        self.save_history(&history)?;
        info!(id = %cycle.id(), lens_type = ?lens_type, %start_date, "started new lens cycle");
        Ok(cycle)
    }

    /// Archive the current cycle and leave no active cycle.
    pub fn delete_cycle(&self) -> Result<(), DataError> {
        let Some(history) = self.try_load_history()? else {
            return Ok(());
        };
        if history.current_cycle().is_none() {
            return Ok(());
        }
        self.save_history(&history.archive_current())?;
        info!("archived current lens cycle");
        Ok(())
    }

    pub fn has_cycle(&self) -> bool {
        self.load_cycle().is_some()
    }

    pub fn previous_cycles(&self) -> Vec<LensCycle> {
        self.load_history()
            .map(|h| h.previous_cycles().to_vec())
            .unwrap_or_default()
    }

    /// Pretty-printed history for user export.
    pub fn export_json(&self) -> Result<String, DataError> {
        let history = self.history_for_write()?;
        serde_json::to_string_pretty(&history).map_err(DataError::EncodingFailed)
    }

    /// Wrap a legacy bare-cycle record into a history and store it under the
    /// current key. The legacy record is removed only once the new one is
    /// written.
    fn migrate_legacy(&self) -> Result<Option<CycleHistory>, DataError> {
        let Some(legacy) = self.read_record::<LensCycle>(&self.legacy_key)? else {
            return Ok(None);
        };
        let history = CycleHistory::new(Some(legacy), Vec::new());

        if let Err(e) = self.save_history(&history) {
            warn!(error = %e, "could not persist migrated cycle history, keeping legacy record");
            return Ok(Some(history));
        }
        if let Err(e) = self.store.remove(&self.legacy_key) {
            warn!(error = %e, "migrated legacy cycle but could not remove legacy record");
        }
        info!("migrated legacy lens cycle to cycle history");
        Ok(Some(history))
    }

    /// `Ok(None)` for a missing or undecodable record, `Err` when the store
    /// itself fails.
    fn read_record<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DataError> {
        let Some(bytes) = self.store.get(key).map_err(DataError::ReadFailed)? else {
            return Ok(None);
        };
        match decode(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "ignoring unreadable record");
                Ok(None)
            }
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DataError> {
    serde_json::from_slice(bytes).map_err(DataError::DecodingFailed)
}
