use super::period::{
    child_key_range, date_to_key, day_window, is_month_boundary, is_week_boundary,
    is_year_boundary, key_to_date, local_date_of, month_start, period_key, previous_month_start,
    week_start,
};
use super::{fold_daily_rows, fold_rollup_rows, AggregationError, AggregationReport};
use crate::analytics_store::{EventStore, Granularity, InteractionKind, StatsStore};
use crate::server::metrics;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Most days a single catch-up run aggregates.
pub const MAX_CATCH_UP_DAYS: i64 = 31;

/// Runs the daily aggregator and the weekly / monthly / yearly rollups.
pub struct StatsAggregator {
    events: Arc<dyn EventStore>,
    stats: Arc<dyn StatsStore>,
    utc_offset: FixedOffset,
    pool: rayon::ThreadPool,
}

impl StatsAggregator {
    pub fn new(
        events: Arc<dyn EventStore>,
        stats: Arc<dyn StatsStore>,
        worker_threads: usize,
        utc_offset: FixedOffset,
    ) -> Result<Self, AggregationError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("aggregation-{}", i))
            .build()
            .map_err(|e| AggregationError::WorkerPool(e.to_string()))?;
        Ok(Self {
            events,
            stats,
            utc_offset,
            pool,
        })
    }

    /// The most recent local day that has fully elapsed at `now`.
    pub fn last_completed_day(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = local_date_of(now.timestamp_millis(), self.utc_offset);
        today.pred_opt().unwrap_or(today)
    }

    /// Folds one local day of raw events into `daily_track_stats`.
    pub fn aggregate_daily(&self, date: NaiveDate) -> Result<AggregationReport, AggregationError> {
        self.run_tier(Granularity::Daily, date, || {
            let window = day_window(date, self.utc_offset);
            let active = self.events.get_active_track_ids(window)?;
            if active.is_empty() {
                debug!("No active tracks on {}", date);
                return Ok((0, 0));
            }

            let plays = self.events.get_play_summaries_by_track(window)?;
            let mut interactions = HashMap::new();
            for kind in InteractionKind::ALL {
                interactions.insert(kind, self.events.get_interaction_counts_by_track(kind, window)?);
            }

            let rows = self
                .pool
                .install(|| fold_daily_rows(date_to_key(date), &active, plays, &interactions));
            let written = self.stats.upsert_track_stats(&rows)?;
            Ok((active.len(), written))
        })
    }

    /// Rolls the daily rows of the ISO week containing `date` into
    /// `weekly_track_stats`.
    pub fn aggregate_weekly(&self, date: NaiveDate) -> Result<AggregationReport, AggregationError> {
        self.rollup(Granularity::Weekly, week_start(date))
    }

    /// Rolls the weekly rows starting in the month of `date` into
    /// `monthly_track_stats`.
    pub fn aggregate_monthly(&self, date: NaiveDate) -> Result<AggregationReport, AggregationError> {
        self.rollup(Granularity::Monthly, month_start(date))
    }

    /// Rolls the monthly rows of `year` into `yearly_track_stats`.
    pub fn aggregate_yearly(&self, year: i32) -> Result<AggregationReport, AggregationError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AggregationError::InvalidDate(year.to_string()))?;
        self.rollup(Granularity::Yearly, start)
    }

    /// Runs daily for `date`, then every coarser tier whose period ended the
    /// day before. The first failing tier aborts the rest.
    ///
    /// A week that started in an earlier month is only rolled after that
    /// month's own monthly run, so its month (and year, across a new year)
    /// is rolled up again right after the week.
    pub fn run_all_aggregations(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<AggregationReport>, AggregationError> {
        info!("Running aggregations for {}", date);
        let mut reports = vec![self.aggregate_daily(date)?];

        if is_week_boundary(date) {
            let week = date - Duration::days(7);
            reports.push(self.aggregate_weekly(week)?);
            if !is_month_boundary(date) && month_start(week) != month_start(date) {
                reports.push(self.aggregate_monthly(week)?);
                if week.year() != date.year() {
                    reports.push(self.aggregate_yearly(week.year())?);
                }
            }
        }
        if is_month_boundary(date) {
            reports.push(self.aggregate_monthly(previous_month_start(date))?);
        }
        if is_year_boundary(date) {
            reports.push(self.aggregate_yearly(date.year() - 1)?);
        }

        Ok(reports)
    }

    /// Runs [`Self::run_all_aggregations`] for every date in `[from, to]`,
    /// oldest first. Stops at the first failing date.
    pub fn backfill(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AggregationReport>, AggregationError> {
        self.backfill_until(from, to, &|| false)
    }

    /// [`Self::backfill`] that checks `is_cancelled` before each date. A date
    /// is never left with only some of its tiers run.
    pub fn backfill_until(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<Vec<AggregationReport>, AggregationError> {
        if from > to {
            return Err(AggregationError::InvalidRange { from, to });
        }

        info!("Backfilling aggregations from {} to {}", from, to);
        let mut reports = Vec::new();
        for date in from.iter_days().take_while(|d| *d <= to) {
            if is_cancelled() {
                info!("Aggregation cancelled before {}", date);
                return Err(AggregationError::Cancelled);
            }
            let day_reports =
                self.run_all_aggregations(date)
                    .map_err(|e| AggregationError::DateFailed {
                        date,
                        source: Box::new(e),
                    })?;
            reports.extend(day_reports);
        }
        info!(
            "Backfill complete: {} aggregator runs, {} rows written",
            reports.len(),
            reports.iter().map(|r| r.rows_written).sum::<usize>()
        );
        Ok(reports)
    }

    /// Aggregates every day after the latest daily row up to the last
    /// completed day at `now`, so a late or missed run never skips a day or
    /// the rollups it closes. With no daily rows yet only the last completed
    /// day runs. At most [`MAX_CATCH_UP_DAYS`] days run at once.
    pub fn catch_up(
        &self,
        now: DateTime<Utc>,
        is_cancelled: &dyn Fn() -> bool,
    ) -> Result<Vec<AggregationReport>, AggregationError> {
        let until = self.last_completed_day(now);
        let from = match self.stats.get_latest_stats_period(Granularity::Daily)? {
            Some(key) => key_to_date(key)? + Duration::days(1),
            None => until,
        };
        if from > until {
            debug!("Daily stats are up to date through {}", until);
            return Ok(Vec::new());
        }

        let earliest = until - Duration::days(MAX_CATCH_UP_DAYS - 1);
        let from = if from < earliest {
            warn!(
                "Daily stats end {} days before {}, catching up from {} only",
                (until - from).num_days(),
                until,
                earliest
            );
            earliest
        } else {
            from
        };
        self.backfill_until(from, until, is_cancelled)
    }

    fn rollup(
        &self,
        granularity: Granularity,
        period_start: NaiveDate,
    ) -> Result<AggregationReport, AggregationError> {
        let Some(finer) = granularity.finer() else {
            return self.aggregate_daily(period_start);
        };

        self.run_tier(granularity, period_start, || {
            let (from, to) = child_key_range(granularity, period_start);
            let children = self.stats.get_track_stats(finer, from, to, None)?;
            if children.is_empty() {
                debug!("No {} rows in [{}, {})", finer, from, to);
                return Ok((0, 0));
            }

            let key = period_key(granularity, period_start);
            let rows = self
                .pool
                .install(|| fold_rollup_rows(granularity, key, children));
            let written = self.stats.upsert_track_stats(&rows)?;
            Ok((rows.len(), written))
        })
    }

    /// Times one tier, then logs and records its outcome.
    fn run_tier<F>(
        &self,
        granularity: Granularity,
        period_start: NaiveDate,
        work: F,
    ) -> Result<AggregationReport, AggregationError>
    where
        F: FnOnce() -> Result<(usize, usize), AggregationError>,
    {
        let start = Instant::now();
        match work() {
            Ok((tracks_processed, rows_written)) => {
                let report = AggregationReport {
                    granularity,
                    period_start,
                    tracks_processed,
                    rows_written,
                    duration: start.elapsed(),
                };
                metrics::record_aggregation_success(
                    granularity.as_str(),
                    rows_written,
                    report.duration,
                );
                info!(
                    "{} aggregation for {}: {} tracks, {} rows in {:?}",
                    granularity, period_start, tracks_processed, rows_written, report.duration
                );
                Ok(report)
            }
            Err(e) => {
                metrics::record_aggregation_failure(granularity.as_str());
                error!(
                    "{} aggregation for {} failed: {}",
                    granularity, period_start, e
                );
                Err(e)
            }
        }
    }
}
