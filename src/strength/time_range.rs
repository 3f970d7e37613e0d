use super::StrengthError;
use crate::analytics_store::TimeWindow;
use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lookback window a strength score is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "1y")]
    OneYear,
    #[serde(rename = "all")]
    AllTime,
}

impl TimeRange {
    pub const ALL: [TimeRange; 7] = [
        TimeRange::TwentyFourHours,
        TimeRange::SevenDays,
        TimeRange::ThirtyDays,
        TimeRange::NinetyDays,
        TimeRange::ThreeMonths,
        TimeRange::OneYear,
        TimeRange::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::TwentyFourHours => "24h",
            TimeRange::SevenDays => "7d",
            TimeRange::ThirtyDays => "30d",
            TimeRange::NinetyDays => "90d",
            TimeRange::ThreeMonths => "3m",
            TimeRange::OneYear => "1y",
            TimeRange::AllTime => "all",
        }
    }

    /// Divisor used to turn total plays into plays per day.
    pub fn days_in_range(&self) -> u32 {
        match self {
            TimeRange::TwentyFourHours => 1,
            TimeRange::SevenDays => 7,
            TimeRange::ThirtyDays => 30,
            TimeRange::NinetyDays => 90,
            TimeRange::ThreeMonths => 90,
            TimeRange::OneYear => 365,
            TimeRange::AllTime => 365,
        }
    }

    /// The window ending at `now`. Month-based ranges step back calendar
    /// months; `all` starts at the epoch.
    pub fn window(&self, now: DateTime<Utc>) -> TimeWindow {
        let start = match self {
            TimeRange::TwentyFourHours => now - Duration::days(1),
            TimeRange::SevenDays => now - Duration::days(7),
            TimeRange::ThirtyDays => now - Duration::days(30),
            TimeRange::NinetyDays => now - Duration::days(90),
            TimeRange::ThreeMonths => now
                .checked_sub_months(Months::new(3))
                .unwrap_or(DateTime::UNIX_EPOCH),
            TimeRange::OneYear => now
                .checked_sub_months(Months::new(12))
                .unwrap_or(DateTime::UNIX_EPOCH),
            TimeRange::AllTime => DateTime::UNIX_EPOCH,
        };
        TimeWindow::new(start.timestamp_millis(), now.timestamp_millis())
    }
}

impl FromStr for TimeRange {
    type Err = StrengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeRange::ALL
            .into_iter()
            .find(|range| range.as_str() == s)
            .ok_or_else(|| StrengthError::InvalidTimeRange(s.to_string()))
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
