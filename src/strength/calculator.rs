use super::metrics::{BaseMetrics, DerivedMetrics};
use super::metrics_source::{
    AggregatedMetricsSource, MetricsSource, MetricsSourcePolicy, RawEventMetricsSource,
    WindowMetrics,
};
use super::potential::{PotentialInputs, PotentialModel};
use super::scoring;
use super::{StrengthError, TimeRange};
use crate::analytics_store::{
    AnalyticsStore, ArtistRegistry, ArtistStrengthScore, RankedArtist, ScoreStore, TimeWindow,
};
use crate::server::metrics;
use chrono::{DateTime, FixedOffset, Utc};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a score was computed from.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub metrics_source: &'static str,
    pub window: TimeWindow,
    pub track_count: usize,
    pub base: BaseMetrics,
    pub derived: DerivedMetrics,
    pub potential_inputs: PotentialInputs,
}

/// Result of a single strength calculation.
#[derive(Debug, Clone, Serialize)]
pub struct StrengthScore {
    pub artist_id: String,
    pub time_range: TimeRange,
    pub engagement_score: f64,
    pub growth_score: f64,
    pub quality_score: f64,
    pub potential_score: f64,
    pub overall_score: f64,
    pub updated_at: DateTime<Utc>,
    pub breakdown: ScoreBreakdown,
}

impl StrengthScore {
    fn to_record(&self) -> ArtistStrengthScore {
        ArtistStrengthScore {
            artist_id: self.artist_id.clone(),
            time_range: self.time_range,
            engagement_score: self.engagement_score,
            growth_score: self.growth_score,
            quality_score: self.quality_score,
            potential_score: self.potential_score,
            overall_score: self.overall_score,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub time_range: TimeRange,
    pub scored: usize,
    /// `(artist_id, error)` for every artist that could not be scored
    pub failed: Vec<(String, String)>,
}

/// Computes, persists and ranks artist strength scores.
pub struct ArtistStrengthCalculator {
    registry: Arc<dyn ArtistRegistry>,
    scores: Arc<dyn ScoreStore>,
    raw_source: Arc<dyn MetricsSource>,
    aggregated_source: Arc<dyn MetricsSource>,
    policy: MetricsSourcePolicy,
    potential: Arc<dyn PotentialModel>,
    pool: rayon::ThreadPool,
}

impl ArtistStrengthCalculator {
    pub fn new(
        registry: Arc<dyn ArtistRegistry>,
        scores: Arc<dyn ScoreStore>,
        raw_source: Arc<dyn MetricsSource>,
        aggregated_source: Arc<dyn MetricsSource>,
        policy: MetricsSourcePolicy,
        potential: Arc<dyn PotentialModel>,
        worker_threads: usize,
    ) -> Result<Self, StrengthError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("strength-{}", i))
            .build()
            .map_err(|e| StrengthError::WorkerPool(e.to_string()))?;
        Ok(Self {
            registry,
            scores,
            raw_source,
            aggregated_source,
            policy,
            potential,
            pool,
        })
    }

    /// Wires every dependency to one store.
    pub fn from_store<S: AnalyticsStore + 'static>(
        store: Arc<S>,
        policy: MetricsSourcePolicy,
        potential: Arc<dyn PotentialModel>,
        worker_threads: usize,
        utc_offset: FixedOffset,
    ) -> Result<Self, StrengthError> {
        let raw_source = Arc::new(RawEventMetricsSource::new(store.clone()));
        let aggregated_source = Arc::new(AggregatedMetricsSource::new(
            store.clone(),
            store.clone(),
            utc_offset,
        ));
        Self::new(
            store.clone(),
            store,
            raw_source,
            aggregated_source,
            policy,
            potential,
            worker_threads,
        )
    }

    fn source_for(&self, time_range: TimeRange) -> &Arc<dyn MetricsSource> {
        if self.policy.uses_aggregated(time_range) {
            &self.aggregated_source
        } else {
            &self.raw_source
        }
    }

    /// Computes and persists the score of one artist over the window ending now.
    pub fn calculate_artist_strength_score(
        &self,
        artist_id: &str,
        time_range: TimeRange,
    ) -> Result<StrengthScore, StrengthError> {
        self.calculate_artist_strength_score_at(artist_id, time_range, Utc::now())
    }

    /// Same as [`Self::calculate_artist_strength_score`] with an explicit
    /// window end.
    pub fn calculate_artist_strength_score_at(
        &self,
        artist_id: &str,
        time_range: TimeRange,
        now: DateTime<Utc>,
    ) -> Result<StrengthScore, StrengthError> {
        let score = match self.compute(artist_id, time_range, now) {
            Ok(score) => score,
            Err(e) => {
                metrics::record_strength_score_failed(time_range.as_str());
                return Err(e);
            }
        };
        if let Err(e) = self.scores.upsert_strength_score(&score.to_record()) {
            metrics::record_strength_score_failed(time_range.as_str());
            return Err(e.into());
        }
        metrics::record_strength_score_computed(time_range.as_str());
        Ok(score)
    }

    fn compute(
        &self,
        artist_id: &str,
        time_range: TimeRange,
        now: DateTime<Utc>,
    ) -> Result<StrengthScore, StrengthError> {
        // Unknown artists resolve to no tracks and score only the placeholders
        let track_ids = self.registry.get_artist_track_ids(artist_id)?;
        let window = time_range.window(now);
        let source = self.source_for(time_range);

        let WindowMetrics { base, audience } = source.window_metrics(&track_ids, window)?;
        let previous_plays = source.play_count(&track_ids, window.preceding())?;
        let derived = DerivedMetrics::compute(&base, previous_plays, &audience);
        let inputs = self.potential.inputs(artist_id).clamped();

        let engagement_score = scoring::engagement_score(&base);
        let growth_score = scoring::growth_score(&base, &derived, time_range.days_in_range());
        let quality_score = scoring::quality_score(&base, &derived, &inputs);
        let potential_score = scoring::potential_score(&derived, &inputs);
        let overall_score =
            scoring::overall_score(engagement_score, growth_score, quality_score, potential_score);

        debug!(
            "Artist {} ({}): engagement {:.1}, growth {:.1}, quality {:.1}, potential {:.1}, overall {:.1}",
            artist_id,
            time_range,
            engagement_score,
            growth_score,
            quality_score,
            potential_score,
            overall_score
        );

        Ok(StrengthScore {
            artist_id: artist_id.to_string(),
            time_range,
            engagement_score,
            growth_score,
            quality_score,
            potential_score,
            overall_score,
            updated_at: now,
            breakdown: ScoreBreakdown {
                metrics_source: source.name(),
                window,
                track_count: track_ids.len(),
                base,
                derived,
                potential_inputs: inputs,
            },
        })
    }

    /// Scores every active artist. Per-artist failures are logged and
    /// reported; only a failure to list the artists fails the batch.
    pub fn batch_calculate_scores(&self, time_range: TimeRange) -> Result<BatchReport, StrengthError> {
        self.batch_calculate_scores_until(time_range, &|| false)
    }

    /// Batch that stops picking up new artists once `is_cancelled` is true.
    pub fn batch_calculate_scores_until(
        &self,
        time_range: TimeRange,
        is_cancelled: &(dyn Fn() -> bool + Sync),
    ) -> Result<BatchReport, StrengthError> {
        let start = Instant::now();
        let artists = self.registry.get_active_artists()?;
        let now = Utc::now();
        info!(
            "Scoring {} active artists for time range {}",
            artists.len(),
            time_range
        );

        let results: Vec<(String, Option<Result<(), StrengthError>>)> = self.pool.install(|| {
            artists
                .par_iter()
                .map(|artist| {
                    if is_cancelled() {
                        return (artist.id.clone(), None);
                    }
                    let result = self
                        .calculate_artist_strength_score_at(&artist.id, time_range, now)
                        .map(|_| ());
                    (artist.id.clone(), Some(result))
                })
                .collect()
        });

        let mut report = BatchReport {
            time_range,
            scored: 0,
            failed: Vec::new(),
        };
        let mut skipped = 0;
        for (artist_id, result) in results {
            match result {
                Some(Ok(())) => report.scored += 1,
                Some(Err(e)) => {
                    warn!("Failed to score artist {} ({}): {}", artist_id, time_range, e);
                    report.failed.push((artist_id, e.to_string()));
                }
                None => skipped += 1,
            }
        }

        let elapsed = start.elapsed();
        metrics::record_strength_batch(time_range.as_str(), elapsed);
        if skipped > 0 {
            info!(
                "Strength batch {} cancelled: {} scored, {} skipped",
                time_range, report.scored, skipped
            );
            return Err(StrengthError::Cancelled);
        }
        info!(
            "Strength batch {} complete: {} scored, {} failed in {:?}",
            time_range,
            report.scored,
            report.failed.len(),
            elapsed
        );
        Ok(report)
    }

    /// Stored scores for `time_range`, best first, at most `limit` rows.
    pub fn get_top_artists(
        &self,
        time_range: TimeRange,
        limit: usize,
    ) -> Result<Vec<RankedArtist>, StrengthError> {
        Ok(self.scores.get_top_strength_scores(time_range, limit)?)
    }
}
