//! Artist strength score batch job.
//!
//! Scores every active artist for each configured time range. Runs on its own
//! interval and again whenever a stats aggregation completes.

use crate::background_jobs::{
    context::JobContext,
    job::{BackgroundJob, HookEvent, JobError, JobSchedule, ShutdownBehavior},
};
use crate::config::StrengthSettings;
use crate::strength::{StrengthError, TimeRange};
use std::time::Duration;
use tracing::{info, warn};

pub struct ArtistStrengthJob {
    interval_hours: u64,
    time_ranges: Vec<TimeRange>,
}

impl ArtistStrengthJob {
    pub fn from_settings(settings: &StrengthSettings) -> Self {
        Self {
            interval_hours: settings.interval_hours,
            time_ranges: settings.time_ranges.clone(),
        }
    }

    fn score_ranges(&self, ctx: &JobContext, ranges: &[TimeRange]) -> Result<(), JobError> {
        let mut failed_artists = 0;
        for &time_range in ranges {
            if ctx.is_cancelled() {
                info!("Artist strength job cancelled before {}", time_range);
                return Err(JobError::Cancelled);
            }

            let report = ctx
                .calculator
                .batch_calculate_scores_until(time_range, &|| ctx.is_cancelled())
                .map_err(|e| match e {
                    StrengthError::Cancelled => JobError::Cancelled,
                    other => JobError::ExecutionFailed(other.to_string()),
                })?;
            failed_artists += report.failed.len();
        }

        if failed_artists > 0 {
            warn!(
                "Artist strength job finished with {} per-artist failures",
                failed_artists
            );
        }
        Ok(())
    }
}

impl Default for ArtistStrengthJob {
    fn default() -> Self {
        Self::from_settings(&StrengthSettings::default())
    }
}

impl BackgroundJob for ArtistStrengthJob {
    fn id(&self) -> &'static str {
        "artist_strength"
    }

    fn name(&self) -> &'static str {
        "Artist Strength"
    }

    fn description(&self) -> &'static str {
        "Compute strength scores for every active artist"
    }

    fn schedule(&self) -> JobSchedule {
        JobSchedule::Combined {
            interval: Some(Duration::from_secs(self.interval_hours * 60 * 60)),
            hooks: vec![HookEvent::OnAggregationComplete],
        }
    }

    fn shutdown_behavior(&self) -> ShutdownBehavior {
        ShutdownBehavior::Cancellable
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        self.score_ranges(ctx, &self.time_ranges)
    }
}
