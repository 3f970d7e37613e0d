//! Calendar helpers shared by the aggregators.
//!
//! Dates are stored as `YYYYMMDD` integers; days are local to a fixed UTC
//! offset and map to half-open millisecond windows.

use super::AggregationError;
use crate::analytics_store::{Granularity, TimeWindow};
use chrono::{Datelike, Duration, FixedOffset, NaiveDate, NaiveTime};

pub fn date_to_key(date: NaiveDate) -> u32 {
    date.year() as u32 * 10000 + date.month() * 100 + date.day()
}

pub fn key_to_date(key: u32) -> Result<NaiveDate, AggregationError> {
    NaiveDate::from_ymd_opt((key / 10000) as i32, (key / 100) % 100, key % 100)
        .ok_or_else(|| AggregationError::InvalidDate(key.to_string()))
}

/// Parses `YYYY-MM-DD` or `YYYYMMDD`.
pub fn parse_date(s: &str) -> Result<NaiveDate, AggregationError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| AggregationError::InvalidDate(s.to_string()))
}

/// ISO week start (Monday).
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month_start(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn previous_month_start(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 1 {
        (date.year() - 1, 12)
    } else {
        (date.year(), date.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn is_week_boundary(date: NaiveDate) -> bool {
    week_start(date) == date
}

pub fn is_month_boundary(date: NaiveDate) -> bool {
    date.day() == 1
}

pub fn is_year_boundary(date: NaiveDate) -> bool {
    date.month() == 1 && date.day() == 1
}

/// Start of the period containing `date`, as the key stored in that
/// granularity's table.
pub fn period_key(granularity: Granularity, date: NaiveDate) -> u32 {
    match granularity {
        Granularity::Daily => date_to_key(date),
        Granularity::Weekly => date_to_key(week_start(date)),
        Granularity::Monthly => date_to_key(month_start(date)),
        Granularity::Yearly => date.year() as u32,
    }
}

/// Range `[from, to)` of finer-table keys that roll up into the period
/// starting at `period_start` of `granularity`.
pub fn child_key_range(granularity: Granularity, period_start: NaiveDate) -> (u32, u32) {
    match granularity {
        Granularity::Daily => {
            let key = date_to_key(period_start);
            (key, key + 1)
        }
        Granularity::Weekly => (
            date_to_key(period_start),
            date_to_key(period_start + Duration::days(7)),
        ),
        Granularity::Monthly => (
            date_to_key(period_start),
            date_to_key(next_month_start(period_start)),
        ),
        Granularity::Yearly => (
            date_to_key(period_start),
            period_start.year() as u32 * 10000 + 10000 + 101,
        ),
    }
}

/// The UTC offset local days are computed in.
pub fn offset_from_minutes(minutes: i32) -> Result<FixedOffset, AggregationError> {
    FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| AggregationError::InvalidDate(format!("UTC offset {} minutes", minutes)))
}

/// Unix millisecond of local midnight at the start of `date`.
pub fn local_midnight_ms(date: NaiveDate, offset: FixedOffset) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
        - offset.local_minus_utc() as i64 * 1000
}

/// Local day `[00:00:00.000, next midnight)` as a millisecond window.
pub fn day_window(date: NaiveDate, offset: FixedOffset) -> TimeWindow {
    TimeWindow::new(
        local_midnight_ms(date, offset),
        local_midnight_ms(date + Duration::days(1), offset),
    )
}

/// Local calendar date containing the unix millisecond `timestamp_ms`.
pub fn local_date_of(timestamp_ms: i64, offset: FixedOffset) -> NaiveDate {
    let shifted = timestamp_ms + offset.local_minus_utc() as i64 * 1000;
    let days = shifted.div_euclid(86_400_000);
    NaiveDate::from_num_days_from_ce_opt(719_163 + days as i32).unwrap_or(NaiveDate::MIN)
}
