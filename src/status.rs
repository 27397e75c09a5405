use serde::{Deserialize, Serialize};

/// Lower bound of the caution bucket, as a fraction of the replacement interval.
pub const CAUTION_THRESHOLD: f64 = 0.67;
/// Lower bound of the warning bucket.
pub const WARNING_THRESHOLD: f64 = 0.81;

/// Where a cycle stands relative to its replacement interval.
///
/// Both the status message and the status color derive from this value, so
/// the thresholds above are the only place bucket boundaries live.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum CycleStatus {
    Healthy,
    Caution,
    Warning,
    /// Worn exactly the maximum number of days.
    DueToday,
    Overdue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum StatusColor {
    Healthy,
    Caution,
    Warning,
    Critical,
}

impl CycleStatus {
    pub fn from_progress(current_day: u32, max_days: u32) -> CycleStatus {
        if max_days == 0 || current_day > max_days {
            return CycleStatus::Overdue;
        }
        if current_day == max_days {
            return CycleStatus::DueToday;
        }
        Self::from_ratio(f64::from(current_day) / f64::from(max_days))
    }

    /// Bucket for a raw `current_day / max_days` ratio.
    pub fn from_ratio(ratio: f64) -> CycleStatus {
        if ratio > 1.0 {
            CycleStatus::Overdue
        } else if ratio >= 1.0 {
            CycleStatus::DueToday
        } else if ratio >= WARNING_THRESHOLD {
            CycleStatus::Warning
        } else if ratio >= CAUTION_THRESHOLD {
            CycleStatus::Caution
        } else {
            CycleStatus::Healthy
        }
    }

    pub fn color(self) -> StatusColor {
        match self {
            CycleStatus::Healthy => StatusColor::Healthy,
            CycleStatus::Caution => StatusColor::Caution,
            CycleStatus::Warning => StatusColor::Warning,
            CycleStatus::DueToday | CycleStatus::Overdue => StatusColor::Critical,
        }
    }

    pub fn message(self, days_remaining: i64) -> String {
        match self {
            CycleStatus::Healthy => format!("{} left, lenses are fresh", plural_days(days_remaining)),
            CycleStatus::Caution => format!("{} left, plan a replacement", plural_days(days_remaining)),
            CycleStatus::Warning => format!("Only {} left, replace soon", plural_days(days_remaining)),
            CycleStatus::DueToday => "Replace your lenses today".to_string(),
            CycleStatus::Overdue => format!(
                "Overdue by {}, replace now",
                plural_days(days_remaining.saturating_abs())
            ),
        }
    }
}

fn plural_days(days: i64) -> String {
    if days == 1 {
        "1 day".to_string()
    } else {
        format!("{days} days")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 14, CycleStatus::Healthy)]
    #[case(9, 14, CycleStatus::Healthy)]
    #[case(10, 14, CycleStatus::Caution)]
    #[case(11, 14, CycleStatus::Caution)]
    #[case(12, 14, CycleStatus::Warning)]
    #[case(13, 14, CycleStatus::Warning)]
    #[case(14, 14, CycleStatus::DueToday)]
    #[case(15, 14, CycleStatus::Overdue)]
    #[case(0, 1, CycleStatus::Healthy)]
    #[case(1, 1, CycleStatus::DueToday)]
    #[case(2, 1, CycleStatus::Overdue)]
    #[case(21, 30, CycleStatus::Caution)]
    #[case(25, 30, CycleStatus::Warning)]
    fn buckets(#[case] current_day: u32, #[case] max_days: u32, #[case] expected: CycleStatus) {
        assert_eq!(CycleStatus::from_progress(current_day, max_days), expected);
    }

    #[rstest]
    #[case(CAUTION_THRESHOLD, CycleStatus::Caution, StatusColor::Caution)]
    #[case(WARNING_THRESHOLD, CycleStatus::Warning, StatusColor::Warning)]
    #[case(0.6699, CycleStatus::Healthy, StatusColor::Healthy)]
    #[case(0.8099, CycleStatus::Caution, StatusColor::Caution)]
    fn boundaries_agree_between_message_and_color(
        #[case] ratio: f64,
        #[case] status: CycleStatus,
        #[case] color: StatusColor,
    ) {
        for _ in 0..3 {
            let bucket = CycleStatus::from_ratio(ratio);
            assert_eq!(bucket, status);
            assert_eq!(bucket.color(), color);
        }
    }

    #[test]
    fn due_and_overdue_share_critical_color() {
        assert_eq!(CycleStatus::DueToday.color(), StatusColor::Critical);
        assert_eq!(CycleStatus::Overdue.color(), StatusColor::Critical);
        assert_ne!(
            CycleStatus::DueToday.message(0),
            CycleStatus::Overdue.message(-1)
        );
    }

    #[test]
    fn messages() {
        assert_eq!(CycleStatus::Warning.message(1), "Only 1 day left, replace soon");
        assert_eq!(CycleStatus::Overdue.message(-2), "Overdue by 2 days, replace now");
    }
}
