use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::data_manager::{DataError, DataManager};
use crate::insights::{self, HistoryStats};
use crate::models::{self, LensCycle, LensType};
use crate::status::{CycleStatus, StatusColor};
use crate::storage::KeyValueStore;

/// Presentation-facing state: the loaded cycle plus loading/error flags.
///
/// Every mutation goes through the [`DataManager`]. When a write fails the
/// cycle held here is left untouched and `error_message` describes the
/// failure until it is dismissed.
pub struct LensTracker<S> {
    manager: DataManager<S>,
    cycle: Option<LensCycle>,
    is_loading: bool,
    error_message: Option<String>,
    today: fn() -> NaiveDate,
}

impl<S: KeyValueStore> LensTracker<S> {
    pub fn new(manager: DataManager<S>) -> Self {
        Self {
            manager,
            cycle: None,
            is_loading: true,
            error_message: None,
            today: models::today,
        }
    }

    /// Override the source of "today".
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn manager(&self) -> &DataManager<S> {
        &self.manager
    }

    pub fn load_data(&mut self) {
        self.cycle = self.manager.load_cycle();
        self.is_loading = false;
        debug!(has_cycle = self.cycle.is_some(), "loaded lens data");
    }

    /// Log today's wear. Does nothing once today is logged.
    pub fn log_today_wear(&mut self) -> Result<(), DataError> {
        if self.has_worn_today() {
            return Ok(());
        }
        let today = (self.today)();
        self.add_wear_entry(today)
    }

    pub fn add_wear_entry(&mut self, day: NaiveDate) -> Result<(), DataError> {
        let result = self.require_cycle().map(|c| c.add_wear_entry(day));
        self.save_in_place(result)
    }

    pub fn remove_wear_entry(&mut self, day: NaiveDate) -> Result<(), DataError> {
        let result = self.require_cycle().map(|c| c.remove_wear_entry(day));
        self.save_in_place(result)
    }

    pub fn update_start_date(&mut self, start_date: NaiveDate) -> Result<(), DataError> {
        let result = self.require_cycle().map(|c| c.update_start_date(start_date));
        self.save_in_place(result)
    }

    /// Archive the current cycle and start a new one.
    pub fn start_new_cycle(
        &mut self,
        lens_type: LensType,
        start_date: NaiveDate,
    ) -> Result<(), DataError> {
        let result = self.manager.create_new_cycle(lens_type, start_date);
        let cycle = self.record(result)?;
        self.cycle = Some(cycle);
        Ok(())
    }

    /// Fresh cycle of the same lens type starting today.
    pub fn reset_cycle(&mut self) -> Result<(), DataError> {
        let lens_type = self.require_cycle().map(LensCycle::lens_type);
        let lens_type = self.record(lens_type)?;
        let today = (self.today)();
        self.start_new_cycle(lens_type, today)
    }

    /// Switching lens type starts a new cycle; the old one is archived.
    pub fn change_lens_type(&mut self, lens_type: LensType) -> Result<(), DataError> {
        if self.cycle.as_ref().map(LensCycle::lens_type) == Some(lens_type) {
            return Ok(());
        }
        let today = (self.today)();
        self.start_new_cycle(lens_type, today)
    }

    pub fn delete_cycle(&mut self) -> Result<(), DataError> {
        let result = self.manager.delete_cycle();
        self.record(result)?;
        self.cycle = None;
        Ok(())
    }

    pub fn dismiss_error(&mut self) {
        self.error_message = None;
    }

    pub fn cycle(&self) -> Option<&LensCycle> {
        self.cycle.as_ref()
    }

    /// True until the first [`load_data`](Self::load_data) completes.
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn current_day(&self) -> u32 {
        self.cycle.as_ref().map_or(0, LensCycle::current_day)
    }

    pub fn max_days(&self) -> u32 {
        self.cycle.as_ref().map_or(0, |c| c.lens_type().max_days())
    }

    pub fn days_remaining(&self) -> i64 {
        self.cycle.as_ref().map_or(0, LensCycle::days_remaining)
    }

    pub fn progress(&self) -> f64 {
        self.cycle.as_ref().map_or(0.0, LensCycle::progress_percentage)
    }

    pub fn has_worn_today(&self) -> bool {
        let today = (self.today)();
        self.cycle.as_ref().is_some_and(|c| c.has_worn_on(today))
    }

    pub fn status(&self) -> Option<CycleStatus> {
        self.cycle.as_ref().map(LensCycle::status)
    }

    pub fn status_text(&self) -> String {
        match &self.cycle {
            Some(cycle) => cycle.status().message(cycle.days_remaining()),
            None => "No active lens cycle".to_string(),
        }
    }

    pub fn status_color(&self) -> Option<StatusColor> {
        self.status().map(CycleStatus::color)
    }

    pub fn projected_replacement(&self) -> Option<NaiveDate> {
        let today = (self.today)();
        self.cycle
            .as_ref()
            .map(|c| insights::projected_replacement(c, today))
    }

    pub fn previous_cycles(&self) -> Vec<LensCycle> {
        self.manager.previous_cycles()
    }

    pub fn history_stats(&self) -> HistoryStats {
        insights::history_stats(&self.manager.load_history().unwrap_or_default())
    }

    pub fn export_data(&mut self) -> Result<String, DataError> {
        let result = self.manager.export_json();
        self.record(result)
    }

    fn require_cycle(&self) -> Result<&LensCycle, DataError> {
        self.cycle.as_ref().ok_or(DataError::NoCycleFound)
    }

    fn save_in_place(&mut self, updated: Result<LensCycle, DataError>) -> Result<(), DataError> {
        let updated = self.record(updated)?;
        if self.cycle.as_ref() == Some(&updated) {
            return Ok(());
        }
        let result = self.manager.update_cycle(&updated);
        self.record(result)?;
        self.cycle = Some(updated);
        Ok(())
    }

    fn record<T>(&mut self, result: Result<T, DataError>) -> Result<T, DataError> {
        if let Err(e) = &result {
            warn!(error = %e, "lens tracker action failed");
            self.error_message = Some(e.user_message().to_string());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, StorageError};
    use rstest::{fixture, rstest};
    use std::cell::Cell;

    fn fixed_today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[fixture]
    fn tracker() -> LensTracker<MemoryStore> {
        let mut tracker =
            LensTracker::new(DataManager::new(MemoryStore::isolated())).with_today(fixed_today);
        tracker.load_data();
        tracker
    }

    /// Store that starts failing writes once `fail` is set.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail: Cell<bool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
            if self.fail.get() {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn loading_until_first_load() {
        let mut tracker = LensTracker::new(DataManager::new(MemoryStore::isolated()));
        assert!(tracker.is_loading());
        tracker.load_data();
        assert!(!tracker.is_loading());
        tracker.load_data();
        assert!(!tracker.is_loading());
    }

    #[rstest]
    fn empty_state(tracker: LensTracker<MemoryStore>) {
        assert!(tracker.cycle().is_none());
        assert!(!tracker.is_loading());
        assert_eq!(tracker.status_text(), "No active lens cycle");
        assert_eq!(tracker.status_color(), None);
        assert_eq!(tracker.current_day(), 0);
    }

    #[rstest]
    fn logging_without_cycle_reports_error(mut tracker: LensTracker<MemoryStore>) {
        let result = tracker.log_today_wear();
        assert!(matches!(result, Err(DataError::NoCycleFound)));
        assert_eq!(tracker.error_message(), Some("Start a lens cycle first."));
        tracker.dismiss_error();
        assert!(tracker.error_message().is_none());
    }

    #[rstest]
    fn log_today_once(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Biweekly, day("2026-03-10")).unwrap();
        tracker.log_today_wear().unwrap();
        tracker.log_today_wear().unwrap();

        assert!(tracker.has_worn_today());
        assert_eq!(tracker.current_day(), 1);
        assert_eq!(tracker.max_days(), 14);
        assert_eq!(tracker.days_remaining(), 13);
        assert_eq!(tracker.status_color(), Some(StatusColor::Healthy));
        assert_eq!(tracker.manager().load_cycle().unwrap().current_day(), 1);
    }

    #[rstest]
    fn edits_persist(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Monthly, day("2026-03-01")).unwrap();
        tracker.add_wear_entry(day("2026-03-02")).unwrap();
        tracker.add_wear_entry(day("2026-03-03")).unwrap();
        tracker.remove_wear_entry(day("2026-03-02")).unwrap();
        tracker.update_start_date(day("2026-02-28")).unwrap();

        let mut reloaded = LensTracker::new(DataManager::new(tracker.manager().store()));
        reloaded.load_data();
        let cycle = reloaded.cycle().unwrap();
        assert_eq!(cycle.wear_dates(), &[day("2026-03-03")]);
        assert_eq!(cycle.start_date(), day("2026-02-28"));
        assert!(reloaded.previous_cycles().is_empty());
    }

    #[rstest]
    fn reset_archives_previous_cycle(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Biweekly, day("2026-03-01")).unwrap();
        tracker.add_wear_entry(day("2026-03-01")).unwrap();
        let old_id = tracker.cycle().unwrap().id();

        tracker.reset_cycle().unwrap();

        let cycle = tracker.cycle().unwrap();
        assert_ne!(cycle.id(), old_id);
        assert_eq!(cycle.start_date(), fixed_today());
        assert_eq!(cycle.lens_type(), LensType::Biweekly);
        let archive = tracker.previous_cycles();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].id(), old_id);
        assert_eq!(archive[0].current_day(), 1);
    }

    #[rstest]
    fn change_lens_type_archives(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Biweekly, day("2026-03-01")).unwrap();
        tracker.change_lens_type(LensType::Biweekly).unwrap();
        assert!(tracker.previous_cycles().is_empty());

        tracker.change_lens_type(LensType::Monthly).unwrap();
        assert_eq!(tracker.cycle().unwrap().lens_type(), LensType::Monthly);
        assert_eq!(tracker.previous_cycles().len(), 1);
        assert_eq!(tracker.history_stats().archived_cycles, 1);
    }

    #[rstest]
    fn delete_clears_state_and_archives(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Daily, day("2026-03-15")).unwrap();
        tracker.delete_cycle().unwrap();
        assert!(tracker.cycle().is_none());
        assert_eq!(tracker.previous_cycles().len(), 1);
    }

    #[test]
    fn failed_save_keeps_last_known_state() {
        let store = FlakyStore::default();
        let mut tracker = LensTracker::new(DataManager::new(&store)).with_today(fixed_today);
        tracker.start_new_cycle(LensType::Biweekly, day("2026-03-10")).unwrap();
        let before = tracker.cycle().cloned();

        store.fail.set(true);
        let result = tracker.log_today_wear();

        assert!(matches!(result, Err(DataError::SaveFailed(_))));
        assert_eq!(tracker.cycle().cloned(), before);
        assert!(!tracker.has_worn_today());
        assert_eq!(
            tracker.error_message(),
            Some("Your changes could not be saved. Please try again.")
        );

        assert!(tracker.reset_cycle().is_err());
        assert_eq!(tracker.cycle().cloned(), before);
    }

    #[rstest]
    fn projected_replacement_from_today(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Daily, day("2026-03-15")).unwrap();
        assert_eq!(tracker.projected_replacement(), Some(fixed_today()));
        tracker.log_today_wear().unwrap();
        assert_eq!(tracker.status(), Some(CycleStatus::DueToday));
        assert_eq!(tracker.status_text(), "Replace your lenses today");
    }

    #[rstest]
    fn export_contains_history(mut tracker: LensTracker<MemoryStore>) {
        tracker.start_new_cycle(LensType::Monthly, day("2026-03-01")).unwrap();
        let json = tracker.export_data().unwrap();
        assert!(json.contains("\"lensType\": \"monthly\""));
    }
}
