use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::{CycleHistory, LensCycle};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryStats {
    pub archived_cycles: usize,
    pub avg_wear_days: Option<f32>,
    pub shortest_cycle: Option<u32>,
    pub longest_cycle: Option<u32>,
    /// Archived cycles that were worn past their replacement interval.
    pub overdue_cycles: usize,
    pub last_replaced: Option<NaiveDate>,
}

/// Last day the lenses can be worn, assuming daily wear from `today` on.
///
/// Today counts as one of the remaining wear days unless it is already
/// logged, so the result is `today + days_remaining - 1` before today is
/// logged and `today + days_remaining` after. Never earlier than `today`.
pub fn projected_replacement(cycle: &LensCycle, today: NaiveDate) -> NaiveDate {
    let remaining = cycle.days_remaining().max(0);
    let remaining = if cycle.has_worn_on(today) {
        remaining
    } else {
        (remaining - 1).max(0)
    };
    today + Duration::days(remaining)
}

/// Summary of the archived cycles.
pub fn history_stats(history: &CycleHistory) -> HistoryStats {
    let archived = history.previous_cycles();
    let wear_days: Vec<u32> = archived.iter().map(LensCycle::current_day).collect();

    HistoryStats {
        archived_cycles: archived.len(),
        avg_wear_days: if wear_days.is_empty() {
            None
        } else {
            Some(wear_days.iter().sum::<u32>() as f32 / wear_days.len() as f32)
        },
        shortest_cycle: wear_days.iter().copied().min(),
        longest_cycle: wear_days.iter().copied().max(),
        overdue_cycles: archived.iter().filter(|c| c.is_overdue()).count(),
        last_replaced: history.current_cycle().map(LensCycle::start_date),
    }
}
