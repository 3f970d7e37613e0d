use crate::analytics_store::{Granularity, TrackStats};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// `Σ(value × weight) / Σ(weight)`, or 0 when the weights sum to 0.
pub fn weighted_average<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, u64)>,
{
    let (weighted_sum, total_weight) = pairs
        .into_iter()
        .fold((0.0, 0u64), |(sum, total), (value, weight)| {
            (sum + value * weight as f64, total + weight)
        });
    if total_weight == 0 {
        0.0
    } else {
        weighted_sum / total_weight as f64
    }
}

/// Folds finer-grained rows into one `granularity` row per track.
///
/// Counters are summed. Averages and rates are play-weighted, so a child
/// with no plays contributes nothing to them.
pub fn fold_rollup_rows(
    granularity: Granularity,
    period_key: u32,
    children: Vec<TrackStats>,
) -> Vec<TrackStats> {
    let mut by_track: BTreeMap<String, Vec<TrackStats>> = BTreeMap::new();
    for row in children {
        by_track.entry(row.track_id.clone()).or_default().push(row);
    }

    by_track
        .into_par_iter()
        .map(|(track_id, rows)| {
            let weighted = |rate: fn(&TrackStats) -> f64| {
                weighted_average(rows.iter().map(|r| (rate(r), r.total_plays)))
            };
            TrackStats {
                granularity,
                period: period_key,
                total_plays: rows.iter().map(|r| r.total_plays).sum(),
                unique_plays: rows.iter().map(|r| r.unique_plays).sum(),
                total_likes: rows.iter().map(|r| r.total_likes).sum(),
                total_shares: rows.iter().map(|r| r.total_shares).sum(),
                total_downloads: rows.iter().map(|r| r.total_downloads).sum(),
                total_saves: rows.iter().map(|r| r.total_saves).sum(),
                avg_duration: weighted(|r| r.avg_duration),
                avg_completion_rate: weighted(|r| r.avg_completion_rate),
                skip_rate: weighted(|r| r.skip_rate),
                replay_rate: weighted(|r| r.replay_rate),
                track_id,
            }
        })
        .collect()
}
