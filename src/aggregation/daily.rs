use crate::analytics_store::{
    Granularity, InteractionKind, PlaySummary, TrackPlaySummary, TrackStats,
};
use rayon::prelude::*;
use std::collections::HashMap;

/// Folds one day's grouped query results into one row per active track.
///
/// `active_track_ids` decides which rows exist: a track with only an
/// "unlike" still gets a row, with zero counters. Tracks missing from
/// `active_track_ids` get no row even if they appear in the summaries.
pub fn fold_daily_rows(
    date_key: u32,
    active_track_ids: &[String],
    play_summaries: Vec<TrackPlaySummary>,
    interactions: &HashMap<InteractionKind, HashMap<String, u64>>,
) -> Vec<TrackStats> {
    let plays: HashMap<String, PlaySummary> = play_summaries
        .into_iter()
        .map(|s| (s.track_id, s.summary))
        .collect();

    let count = |kind: InteractionKind, track_id: &str| -> u64 {
        interactions
            .get(&kind)
            .and_then(|counts| counts.get(track_id))
            .copied()
            .unwrap_or(0)
    };

    active_track_ids
        .par_iter()
        .map(|track_id| {
            let summary = plays.get(track_id).cloned().unwrap_or_default();
            TrackStats {
                granularity: Granularity::Daily,
                track_id: track_id.clone(),
                period: date_key,
                total_plays: summary.total_plays,
                unique_plays: summary.unique_sessions,
                total_likes: count(InteractionKind::Like, track_id),
                total_shares: count(InteractionKind::Share, track_id),
                total_downloads: count(InteractionKind::Download, track_id),
                total_saves: count(InteractionKind::Save, track_id),
                avg_duration: summary.avg_duration(),
                avg_completion_rate: summary.avg_completion_rate(),
                skip_rate: summary.skip_rate(),
                replay_rate: summary.replay_rate(),
            }
        })
        .collect()
}
