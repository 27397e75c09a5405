use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::CycleStatus;

/// Calendar day of an instant, in the instant's own time zone.
pub fn start_of_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.date_naive()
}

/// Today's calendar day in the local time zone.
pub fn today() -> NaiveDate {
    start_of_day(&Local::now())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LensType {
    Daily,
    Biweekly,
    Monthly,
}

impl LensType {
    pub fn all() -> [LensType; 3] {
        [LensType::Daily, LensType::Biweekly, LensType::Monthly]
    }

    /// Number of wear days before the lenses must be replaced.
    pub fn max_days(self) -> u32 {
        match self {
            LensType::Daily => 1,
            LensType::Biweekly => 14,
            LensType::Monthly => 30,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            LensType::Daily => "Daily",
            LensType::Biweekly => "Bi-weekly",
            LensType::Monthly => "Monthly",
        }
    }

    pub fn schedule_description(self) -> &'static str {
        match self {
            LensType::Daily => "Replace after every wear",
            LensType::Biweekly => "Replace after 14 days of wear",
            LensType::Monthly => "Replace after 30 days of wear",
        }
    }
}

/// One wear cycle of a pair of lenses.
///
/// Values are never mutated in place: every edit returns a new cycle. Wear
/// dates are kept sorted ascending without duplicates, including after
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", from = "CycleRecord")]
pub struct LensCycle {
    id: Uuid,
    start_date: NaiveDate,
    lens_type: LensType,
    wear_dates: Vec<NaiveDate>,
}

/// Wire shape of a cycle before the wear-date invariant is re-established.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CycleRecord {
    id: Uuid,
    start_date: NaiveDate,
    lens_type: LensType,
    #[serde(default)]
    wear_dates: Vec<NaiveDate>,
}

impl From<CycleRecord> for LensCycle {
    fn from(record: CycleRecord) -> Self {
        let mut wear_dates = record.wear_dates;
        wear_dates.sort();
        wear_dates.dedup();
        Self {
            id: record.id,
            start_date: record.start_date,
            lens_type: record.lens_type,
            wear_dates,
        }
    }
}

impl LensCycle {
    /// Start a fresh cycle with a new id and no wear history.
    pub fn new(lens_type: LensType, start_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date,
            lens_type,
            wear_dates: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn lens_type(&self) -> LensType {
        self.lens_type
    }

    pub fn wear_dates(&self) -> &[NaiveDate] {
        &self.wear_dates
    }

    pub fn current_day(&self) -> u32 {
        self.wear_dates.len() as u32
    }

    /// Negative once the cycle is overdue.
    pub fn days_remaining(&self) -> i64 {
        i64::from(self.lens_type.max_days()) - i64::from(self.current_day())
    }

    pub fn is_overdue(&self) -> bool {
        self.current_day() > self.lens_type.max_days()
    }

    pub fn has_worn_on(&self, day: NaiveDate) -> bool {
        self.wear_dates.binary_search(&day).is_ok()
    }

    pub fn has_worn_today(&self) -> bool {
        self.has_worn_on(today())
    }

    /// Fraction of the replacement interval used, clamped to 1.0.
    pub fn progress_percentage(&self) -> f64 {
        let ratio = f64::from(self.current_day()) / f64::from(self.lens_type.max_days());
        ratio.min(1.0)
    }

    pub fn status(&self) -> CycleStatus {
        CycleStatus::from_progress(self.current_day(), self.lens_type.max_days())
    }

    /// Record a wear day. Logging a day twice leaves the cycle unchanged.
    pub fn add_wear_entry(&self, day: NaiveDate) -> LensCycle {
        match self.wear_dates.binary_search(&day) {
            Ok(_) => self.clone(),
            Err(pos) => {
                let mut wear_dates = self.wear_dates.clone();
                wear_dates.insert(pos, day);
                LensCycle {
                    wear_dates,
                    ..self.clone()
                }
            }
        }
    }

    /// Record a wear day from an instant, using its calendar day.
    pub fn add_wear_entry_at<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> LensCycle {
        self.add_wear_entry(start_of_day(instant))
    }

    pub fn add_wear_entry_today(&self) -> LensCycle {
        self.add_wear_entry(today())
    }

    /// Drop a wear day. Removing a day that was never logged is a no-op.
    pub fn remove_wear_entry(&self, day: NaiveDate) -> LensCycle {
        match self.wear_dates.binary_search(&day) {
            Ok(pos) => {
                let mut wear_dates = self.wear_dates.clone();
                wear_dates.remove(pos);
                LensCycle {
                    wear_dates,
                    ..self.clone()
                }
            }
            Err(_) => self.clone(),
        }
    }

    pub fn remove_wear_entry_at<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> LensCycle {
        self.remove_wear_entry(start_of_day(instant))
    }

    /// Replacement cycle of the same lens type starting today.
    ///
    /// The caller is responsible for archiving `self`.
    pub fn reset(&self) -> LensCycle {
        self.reset_on(today())
    }

    pub fn reset_on(&self, start_date: NaiveDate) -> LensCycle {
        LensCycle::new(self.lens_type, start_date)
    }

    /// Correct the start date. Identity and wear history are kept.
    pub fn update_start_date(&self, start_date: NaiveDate) -> LensCycle {
        LensCycle {
            start_date,
            ..self.clone()
        }
    }

    pub fn last_wear_date(&self) -> Option<NaiveDate> {
        self.wear_dates.last().copied()
    }
}

/// Current cycle plus the archive of every cycle it superseded, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CycleHistory {
    current_cycle: Option<LensCycle>,
    #[serde(default)]
    previous_cycles: Vec<LensCycle>,
}

impl CycleHistory {
    pub fn new(current_cycle: Option<LensCycle>, previous_cycles: Vec<LensCycle>) -> Self {
        Self {
            current_cycle,
            previous_cycles,
        }
    }

    pub fn current_cycle(&self) -> Option<&LensCycle> {
        self.current_cycle.as_ref()
    }

    pub fn previous_cycles(&self) -> &[LensCycle] {
        &self.previous_cycles
    }

    pub fn into_current_cycle(self) -> Option<LensCycle> {
        self.current_cycle
    }

    /// Archive the current cycle, if any, and install `cycle` in its place.
    pub fn archive_and_start_new(self, cycle: LensCycle) -> CycleHistory {
        let mut history = self.archive_current();
        history.current_cycle = Some(cycle);
        history
    }

    /// Move the current cycle to the archive and leave no active cycle.
    pub fn archive_current(mut self) -> CycleHistory {
        if let Some(current) = self.current_cycle.take() {
            self.previous_cycles.push(current);
        }
        self
    }

    /// Replace the current cycle without archiving the old value.
    pub fn with_current(mut self, cycle: LensCycle) -> CycleHistory {
        self.current_cycle = Some(cycle);
        self
    }

    /// Archived cycles followed by the current one.
    pub fn all_cycles(&self) -> impl Iterator<Item = &LensCycle> {
        self.previous_cycles.iter().chain(self.current_cycle.iter())
    }
}
