mod models;
mod schema;
mod sqlite_analytics_store;

pub use models::*;
pub use schema::ANALYTICS_VERSIONED_SCHEMAS;
pub use sqlite_analytics_store::SqliteAnalyticsStore;

use crate::strength::TimeRange;
use anyhow::Result;
use std::collections::HashMap;

/// Read access to raw engagement events.
///
/// All windows are half-open `[start, end)` in unix milliseconds. Every method
/// pushes the counting into the store so callers never load raw rows.
pub trait EventStore: Send + Sync {
    /// Distinct track ids with at least one event of any kind in the window.
    fn get_active_track_ids(&self, window: TimeWindow) -> Result<Vec<String>>;

    /// Play summaries grouped by track, for every track played in the window.
    fn get_play_summaries_by_track(&self, window: TimeWindow) -> Result<Vec<TrackPlaySummary>>;

    /// Interaction counts grouped by track. Likes and saves only count their
    /// positive action.
    fn get_interaction_counts_by_track(
        &self,
        kind: InteractionKind,
        window: TimeWindow,
    ) -> Result<HashMap<String, u64>>;

    /// One play summary across a set of tracks. Sessions are distinct across
    /// the whole set.
    fn get_play_summary(&self, track_ids: &[String], window: TimeWindow) -> Result<PlaySummary>;

    /// Interaction total across a set of tracks.
    fn count_interactions(
        &self,
        kind: InteractionKind,
        track_ids: &[String],
        window: TimeWindow,
    ) -> Result<u64>;

    fn get_audience_stats(&self, track_ids: &[String], window: TimeWindow)
        -> Result<AudienceStats>;
}

/// Read access to the artist/track registry.
pub trait ArtistRegistry: Send + Sync {
    fn get_artist_track_ids(&self, artist_id: &str) -> Result<Vec<String>>;

    /// Active artists with their display names, ordered by id.
    fn get_active_artists(&self) -> Result<Vec<ArtistSummary>>;
}

/// Derived per-track stats tables.
pub trait StatsStore: Send + Sync {
    /// Inserts or overwrites rows by `(track_id, period)`. All rows are written
    /// in one transaction. Returns the number of rows written.
    fn upsert_track_stats(&self, rows: &[TrackStats]) -> Result<usize>;

    /// Rows of one granularity with `from <= period < to`, optionally limited
    /// to a set of tracks. Ordered by track id, then period.
    fn get_track_stats(
        &self,
        granularity: Granularity,
        from: u32,
        to: u32,
        track_ids: Option<&[String]>,
    ) -> Result<Vec<TrackStats>>;

    /// Distinct periods in `[from, to)` that have at least one row, ascending.
    fn get_stats_periods(&self, granularity: Granularity, from: u32, to: u32) -> Result<Vec<u32>>;

    /// Most recent period with at least one row.
    fn get_latest_stats_period(&self, granularity: Granularity) -> Result<Option<u32>>;
}

/// Persisted artist strength scores.
pub trait ScoreStore: Send + Sync {
    fn upsert_strength_score(&self, score: &ArtistStrengthScore) -> Result<()>;

    fn get_strength_score(
        &self,
        artist_id: &str,
        time_range: TimeRange,
    ) -> Result<Option<ArtistStrengthScore>>;

    /// Stored scores for a time range joined with artist names, best first.
    fn get_top_strength_scores(&self, time_range: TimeRange, limit: usize)
        -> Result<Vec<RankedArtist>>;
}

/// Combined trait for everything the analytics services need from storage
pub trait AnalyticsStore: EventStore + ArtistRegistry + StatsStore + ScoreStore {}

// Blanket implementation for any type implementing all the store traits
impl<T: EventStore + ArtistRegistry + StatsStore + ScoreStore> AnalyticsStore for T {}
