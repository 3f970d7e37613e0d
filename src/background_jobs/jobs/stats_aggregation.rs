//! Nightly stats aggregation job.
//!
//! Aggregates every local day that completed since the latest daily stats,
//! plus whichever weekly, monthly and yearly rollups those days close. On
//! success it fires [`HookEvent::OnAggregationComplete`] so score batches run
//! on fresh stats.

use crate::aggregation::AggregationError;
use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::config::AggregationSettings;
use chrono::Utc;
use std::time::Duration;
use tracing::info;

pub struct StatsAggregationJob {
    /// Interval in hours between runs
    interval_hours: u64,
}

impl StatsAggregationJob {
    pub fn from_settings(settings: &AggregationSettings) -> Self {
        Self {
            interval_hours: settings.interval_hours,
        }
    }
}

impl Default for StatsAggregationJob {
    fn default() -> Self {
        Self::from_settings(&AggregationSettings::default())
    }
}

impl BackgroundJob for StatsAggregationJob {
    fn id(&self) -> &'static str {
        "stats_aggregation"
    }

    fn name(&self) -> &'static str {
        "Stats Aggregation"
    }

    fn description(&self) -> &'static str {
        "Fold raw engagement events into daily, weekly, monthly and yearly track stats"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Interval(Duration::from_secs(self.interval_hours * 60 * 60))
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::WaitForCompletion
    }

    fn completion_hook(&self) -> Option<HookEvent> {
        Some(HookEvent::OnAggregationComplete)
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let reports = ctx
            .aggregator
            .catch_up(Utc::now(), &|| ctx.is_cancelled())
            .map_err(|e| match e {
                AggregationError::Cancelled => JobError::Cancelled,
                other => JobError::ExecutionFailed(other.to_string()),
            })?;

        let rows: usize = reports.iter().map(|r| r.rows_written).sum();
        info!(
            "Stats aggregation finished: {} aggregator runs, {} rows written",
            reports.len(),
            rows
        );
        Ok(())
    }
}
