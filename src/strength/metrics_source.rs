use super::metrics::BaseMetrics;
use super::{StrengthError, TimeRange};
use crate::aggregation::period::{date_to_key, local_date_of, local_midnight_ms};
use crate::analytics_store::{
    AudienceStats, EventStore, Granularity, InteractionKind, StatsStore, TimeWindow,
};
use anyhow::Result;
use chrono::{Duration, FixedOffset, NaiveDate};
use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

/// Everything a strength score reads for its own window.
#[derive(Debug, Clone, Default)]
pub struct WindowMetrics {
    pub base: BaseMetrics,
    pub audience: AudienceStats,
}

/// Where the engagement metrics of a strength score are read from.
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &'static str;

    fn window_metrics(&self, track_ids: &[String], window: TimeWindow) -> Result<WindowMetrics>;

    /// Play count only, used for the preceding window of growth velocity.
    fn play_count(&self, track_ids: &[String], window: TimeWindow) -> Result<u64>;
}

/// Reads every metric from the raw event tables.
pub struct RawEventMetricsSource {
    events: Arc<dyn EventStore>,
}

impl RawEventMetricsSource {
    pub fn new(events: Arc<dyn EventStore>) -> Self {
        Self { events }
    }
}

impl MetricsSource for RawEventMetricsSource {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn window_metrics(&self, track_ids: &[String], window: TimeWindow) -> Result<WindowMetrics> {
        let summary = self.events.get_play_summary(track_ids, window)?;
        let count = |kind| self.events.count_interactions(kind, track_ids, window);
        let base = BaseMetrics::from_play_summary(
            &summary,
            count(InteractionKind::Like)?,
            count(InteractionKind::Share)?,
            count(InteractionKind::Download)?,
            count(InteractionKind::Save)?,
        );
        Ok(WindowMetrics {
            base,
            audience: self.events.get_audience_stats(track_ids, window)?,
        })
    }

    fn play_count(&self, track_ids: &[String], window: TimeWindow) -> Result<u64> {
        Ok(self.events.get_play_summary(track_ids, window)?.total_plays)
    }
}

/// Additive part of the base metrics.
#[derive(Debug, Default)]
struct Counters {
    plays: u64,
    likes: u64,
    shares: u64,
    downloads: u64,
    saves: u64,
    skipped: f64,
    replayed: f64,
}

/// A window cut at local midnights: whole days readable from
/// `daily_track_stats`, plus the partial days at either edge.
#[derive(Debug, PartialEq)]
struct SplitWindow {
    /// `[first, end)` whole days
    full_days: Option<(NaiveDate, NaiveDate)>,
    edges: Vec<TimeWindow>,
}

/// Reads counters and skip / replay rates from `daily_track_stats` for the
/// whole days of a window that have been aggregated. Partial days at the
/// edges and whole days with no daily rows at all are read from raw events.
///
/// Distinct sessions, IPs and sources and the per-sample means are not
/// additive over days; they come from the single raw audience query that
/// the raw source runs too.
pub struct AggregatedMetricsSource {
    events: Arc<dyn EventStore>,
    stats: Arc<dyn StatsStore>,
    utc_offset: FixedOffset,
}

impl AggregatedMetricsSource {
    pub fn new(
        events: Arc<dyn EventStore>,
        stats: Arc<dyn StatsStore>,
        utc_offset: FixedOffset,
    ) -> Self {
        Self {
            events,
            stats,
            utc_offset,
        }
    }

    fn midnight(&self, date: NaiveDate) -> i64 {
        local_midnight_ms(date, self.utc_offset)
    }

    fn split(&self, window: TimeWindow) -> SplitWindow {
        if window.is_empty() {
            return SplitWindow {
                full_days: None,
                edges: Vec::new(),
            };
        }

        let start_day = local_date_of(window.start, self.utc_offset);
        let first_full = if self.midnight(start_day) == window.start {
            start_day
        } else {
            start_day + Duration::days(1)
        };
        // Day containing `end`; it is never whole because `end` is exclusive
        let end_day = local_date_of(window.end, self.utc_offset);

        if first_full >= end_day {
            return SplitWindow {
                full_days: None,
                edges: vec![window],
            };
        }

        let mut edges = Vec::new();
        let full_start = self.midnight(first_full);
        let full_end = self.midnight(end_day);
        if window.start < full_start {
            edges.push(TimeWindow::new(window.start, full_start));
        }
        if full_end < window.end {
            edges.push(TimeWindow::new(full_end, window.end));
        }
        SplitWindow {
            full_days: Some((first_full, end_day)),
            edges,
        }
    }

    /// Windows covering the runs of days in `[first, end)` missing from
    /// `aggregated`.
    fn unaggregated_windows(
        &self,
        first: NaiveDate,
        end: NaiveDate,
        aggregated: &HashSet<u32>,
    ) -> Vec<TimeWindow> {
        let mut windows = Vec::new();
        let mut run_start: Option<NaiveDate> = None;
        for day in first.iter_days().take_while(|d| *d < end) {
            let missing = !aggregated.contains(&date_to_key(day));
            match (missing, run_start) {
                (true, None) => run_start = Some(day),
                (false, Some(from)) => {
                    windows.push(TimeWindow::new(self.midnight(from), self.midnight(day)));
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(from) = run_start {
            windows.push(TimeWindow::new(self.midnight(from), self.midnight(end)));
        }
        windows
    }

    fn counters(
        &self,
        track_ids: &[String],
        window: TimeWindow,
        with_interactions: bool,
    ) -> Result<Counters> {
        let mut counters = Counters::default();
        if track_ids.is_empty() {
            return Ok(counters);
        }
        let split = self.split(window);
        let mut raw_windows = split.edges;

        if let Some((first, end)) = split.full_days {
            let (from, to) = (date_to_key(first), date_to_key(end));
            let aggregated: HashSet<u32> = self
                .stats
                .get_stats_periods(Granularity::Daily, from, to)?
                .into_iter()
                .collect();
            for row in self
                .stats
                .get_track_stats(Granularity::Daily, from, to, Some(track_ids))?
            {
                counters.plays += row.total_plays;
                counters.likes += row.total_likes;
                counters.shares += row.total_shares;
                counters.downloads += row.total_downloads;
                counters.saves += row.total_saves;
                counters.skipped += row.skip_rate * row.total_plays as f64 / 100.0;
                counters.replayed += row.replay_rate * row.total_plays as f64 / 100.0;
            }
            raw_windows.extend(self.unaggregated_windows(first, end, &aggregated));
        }

        for raw in raw_windows {
            let summary = self.events.get_play_summary(track_ids, raw)?;
            counters.plays += summary.total_plays;
            counters.skipped += summary.skipped_plays as f64;
            counters.replayed += summary.replayed_plays as f64;
            if with_interactions {
                let count = |kind| self.events.count_interactions(kind, track_ids, raw);
                counters.likes += count(InteractionKind::Like)?;
                counters.shares += count(InteractionKind::Share)?;
                counters.downloads += count(InteractionKind::Download)?;
                counters.saves += count(InteractionKind::Save)?;
            }
        }
        Ok(counters)
    }
}

fn percentage(part: f64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part * 100.0 / total as f64).clamp(0.0, 100.0)
    }
}

impl MetricsSource for AggregatedMetricsSource {
    fn name(&self) -> &'static str {
        "aggregated"
    }

    fn window_metrics(&self, track_ids: &[String], window: TimeWindow) -> Result<WindowMetrics> {
        let counters = self.counters(track_ids, window, true)?;
        let audience = self.events.get_audience_stats(track_ids, window)?;
        let base = BaseMetrics {
            total_plays: counters.plays,
            unique_plays: audience.total_sessions,
            total_likes: counters.likes,
            total_shares: counters.shares,
            total_downloads: counters.downloads,
            total_saves: counters.saves,
            avg_duration: audience.avg_duration,
            avg_completion_rate: audience.avg_completion_rate,
            skip_rate: percentage(counters.skipped, counters.plays),
            replay_rate: percentage(counters.replayed, counters.plays),
        };
        Ok(WindowMetrics { base, audience })
    }

    fn play_count(&self, track_ids: &[String], window: TimeWindow) -> Result<u64> {
        Ok(self.counters(track_ids, window, false)?.plays)
    }
}

/// Which [`MetricsSource`] a time range is scored with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsSourcePolicy {
    Raw,
    Aggregated,
    /// Aggregated for ranges of at least `aggregated_min_days`, raw otherwise
    Auto { aggregated_min_days: u32 },
}

impl MetricsSourcePolicy {
    pub fn uses_aggregated(&self, time_range: TimeRange) -> bool {
        match self {
            MetricsSourcePolicy::Raw => false,
            MetricsSourcePolicy::Aggregated => true,
            MetricsSourcePolicy::Auto {
                aggregated_min_days,
            } => time_range.days_in_range() >= *aggregated_min_days,
        }
    }

    /// Builds a policy from its config name; `aggregated_min_days` only
    /// applies to `auto`.
    pub fn from_name(name: &str, aggregated_min_days: u32) -> Result<Self, StrengthError> {
        match name {
            "raw" => Ok(MetricsSourcePolicy::Raw),
            "aggregated" => Ok(MetricsSourcePolicy::Aggregated),
            "auto" => Ok(MetricsSourcePolicy::Auto {
                aggregated_min_days,
            }),
            other => Err(StrengthError::InvalidMetricsSource(other.to_string())),
        }
    }
}

impl FromStr for MetricsSourcePolicy {
    type Err = StrengthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s, 30)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::period::day_window;
    use crate::analytics_store::{InteractionEvent, PlayEvent, SqliteAnalyticsStore};
    use crate::aggregation::StatsAggregator;
    use tempfile::TempDir;

    const HOUR: i64 = 3_600_000;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn source_for(store: &Arc<SqliteAnalyticsStore>) -> AggregatedMetricsSource {
        AggregatedMetricsSource::new(store.clone(), store.clone(), utc())
    }

    #[test]
    fn test_split_window_at_midnights() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteAnalyticsStore::new(temp_dir.path().join("a.db")).unwrap());
        let source = source_for(&store);

        let day2 = day_window(d(1970, 1, 2), utc()).start;
        let day5 = day_window(d(1970, 1, 5), utc()).start;

        // 12:00 on day 1 to 06:00 on day 5
        let split = source.split(TimeWindow::new(day2 - 12 * HOUR, day5 + 6 * HOUR));
        assert_eq!(split.full_days, Some((d(1970, 1, 2), d(1970, 1, 5))));
        assert_eq!(
            split.edges,
            vec![
                TimeWindow::new(day2 - 12 * HOUR, day2),
                TimeWindow::new(day5, day5 + 6 * HOUR)
            ]
        );

        // Aligned on midnights: no edges
        let split = source.split(TimeWindow::new(day2, day5));
        assert_eq!(split.full_days, Some((d(1970, 1, 2), d(1970, 1, 5))));
        assert!(split.edges.is_empty());

        // Shorter than a day: everything raw
        let split = source.split(TimeWindow::new(day2 + HOUR, day2 + 2 * HOUR));
        assert_eq!(split.full_days, None);
        assert_eq!(split.edges.len(), 1);
    }

    #[test]
    fn test_policy_selection() {
        let auto = MetricsSourcePolicy::from_name("auto", 30).unwrap();
        assert!(!auto.uses_aggregated(TimeRange::SevenDays));
        assert!(auto.uses_aggregated(TimeRange::ThirtyDays));
        assert!(auto.uses_aggregated(TimeRange::AllTime));
        assert!(!MetricsSourcePolicy::Raw.uses_aggregated(TimeRange::OneYear));
        assert!(MetricsSourcePolicy::Aggregated.uses_aggregated(TimeRange::TwentyFourHours));
        assert!(matches!(
            "hybrid".parse::<MetricsSourcePolicy>(),
            Err(StrengthError::InvalidMetricsSource(_))
        ));
    }

    fn insert_plays(store: &SqliteAnalyticsStore, day: NaiveDate, count: i64) {
        let start = day_window(day, utc()).start;
        for j in 0..count {
            store
                .insert_play_event(&PlayEvent {
                    track_id: "t1".to_string(),
                    session_id: format!("s{}", j % 2),
                    timestamp: start + j * HOUR,
                    duration: if j == 2 { None } else { Some(100.0 + j as f64) },
                    completion_rate: Some(50.0),
                    skipped: j == 0,
                    replayed: j == 1,
                    source: "web".to_string(),
                    ip: Some(format!("10.0.0.{}", j)),
                })
                .unwrap();
        }
        store
            .insert_interaction_event(&InteractionEvent {
                kind: InteractionKind::Save,
                track_id: "t1".to_string(),
                session_id: "s0".to_string(),
                timestamp: start + 5 * HOUR,
                action: Some("save".to_string()),
            })
            .unwrap();
    }

    fn assert_sources_agree(store: &Arc<SqliteAnalyticsStore>, window: TimeWindow) -> BaseMetrics {
        let tracks = vec!["t1".to_string()];
        let raw = RawEventMetricsSource::new(store.clone());
        let aggregated = source_for(store);

        let from_raw = raw.window_metrics(&tracks, window).unwrap();
        let from_aggregated = aggregated.window_metrics(&tracks, window).unwrap();
        let (r, a) = (&from_raw.base, &from_aggregated.base);
        assert_eq!(a.total_plays, r.total_plays);
        assert_eq!(a.unique_plays, r.unique_plays);
        assert_eq!(a.total_saves, r.total_saves);
        assert!((a.skip_rate - r.skip_rate).abs() < 1e-9);
        assert!((a.replay_rate - r.replay_rate).abs() < 1e-9);
        assert!((a.avg_duration - r.avg_duration).abs() < 1e-9);
        assert!((a.avg_completion_rate - r.avg_completion_rate).abs() < 1e-9);
        assert_eq!(from_aggregated.audience, from_raw.audience);
        assert_eq!(
            aggregated.play_count(&tracks, window).unwrap(),
            raw.play_count(&tracks, window).unwrap()
        );
        from_raw.base
    }

    #[test]
    fn test_aggregated_matches_raw_for_aggregated_days() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteAnalyticsStore::new(temp_dir.path().join("a.db")).unwrap());

        let days = [d(2024, 4, 1), d(2024, 4, 2), d(2024, 4, 3)];
        for (i, day) in days.iter().enumerate() {
            insert_plays(&store, *day, i as i64 + 2);
        }
        let aggregator = StatsAggregator::new(store.clone(), store.clone(), 1, utc()).unwrap();
        for day in days {
            aggregator.aggregate_daily(day).unwrap();
        }

        let window = TimeWindow::new(
            day_window(days[0], utc()).start,
            day_window(days[2], utc()).end,
        );
        let base = assert_sources_agree(&store, window);
        assert_eq!(base.total_plays, 9);
        assert_eq!(base.total_saves, 3);
    }

    #[test]
    fn test_unaggregated_days_fall_back_to_raw_events() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteAnalyticsStore::new(temp_dir.path().join("a.db")).unwrap());

        // Only the middle day is aggregated
        let days = [d(2024, 4, 1), d(2024, 4, 2), d(2024, 4, 3)];
        for day in days {
            insert_plays(&store, day, 3);
        }
        let aggregator = StatsAggregator::new(store.clone(), store.clone(), 1, utc()).unwrap();
        aggregator.aggregate_daily(days[1]).unwrap();

        // Starts mid-day so the first day is also a partial edge
        let window = TimeWindow::new(
            day_window(days[0], utc()).start + HOUR,
            day_window(days[2], utc()).end + 2 * HOUR,
        );
        let base = assert_sources_agree(&store, window);
        assert_eq!(base.total_plays, 8);
        assert_eq!(base.total_saves, 3);
    }

    #[test]
    fn test_never_aggregated_window_matches_raw() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteAnalyticsStore::new(temp_dir.path().join("a.db")).unwrap());
        insert_plays(&store, d(2024, 4, 10), 5);

        let window = TimeWindow::new(
            day_window(d(2024, 3, 20), utc()).start,
            day_window(d(2024, 4, 20), utc()).start + 3 * HOUR,
        );
        let base = assert_sources_agree(&store, window);
        assert_eq!(base.total_plays, 5);
        assert_eq!(base.unique_plays, 2);
    }

    #[test]
    fn test_unaggregated_windows_merge_consecutive_days() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteAnalyticsStore::new(temp_dir.path().join("a.db")).unwrap());
        let source = source_for(&store);

        let aggregated: HashSet<u32> = [19700103].into_iter().collect();
        let windows = source.unaggregated_windows(d(1970, 1, 1), d(1970, 1, 6), &aggregated);
        let midnight = |day| day_window(day, utc()).start;
        assert_eq!(
            windows,
            vec![
                TimeWindow::new(midnight(d(1970, 1, 1)), midnight(d(1970, 1, 3))),
                TimeWindow::new(midnight(d(1970, 1, 4)), midnight(d(1970, 1, 6))),
            ]
        );
    }
}
